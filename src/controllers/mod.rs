pub mod health;
pub mod listings;
pub mod payments;
pub mod pricing;
pub mod valuation;

use actix_web::HttpResponse;

use crate::x402::{PaymentError, PriceTier, X_PAYMENT_REQUIRED_HEADER};
use crate::AppState;

/// Build the 402 response for a tier: fresh challenge in the
/// X-PAYMENT-REQUIRED header plus a JSON body explaining the rejection.
pub(crate) fn payment_required_response(
    state: &AppState,
    tier: PriceTier,
    error: &PaymentError,
) -> HttpResponse {
    let challenge = state.verifier.challenge().build_rejection(tier, error);
    let header = match challenge.to_base64() {
        Ok(encoded) => encoded,
        Err(e) => {
            log::error!("[X402] Failed to encode challenge: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to build payment challenge"
            }));
        }
    };

    let mut body = serde_json::json!({
        "error": "Payment Required",
        "reason": error.reason(),
        "details": error.to_string(),
    });
    if let PaymentError::SettlementTimeout { tx_hash } = error {
        // The caller must not retry with a fresh signature before checking
        // this transaction: the transfer may still confirm
        body["tx_hash"] = serde_json::json!(tx_hash);
    }

    HttpResponse::PaymentRequired()
        .insert_header((X_PAYMENT_REQUIRED_HEADER, header))
        .json(body)
}
