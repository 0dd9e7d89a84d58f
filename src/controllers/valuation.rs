//! Tier 2: paid property valuation

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::valuation;
use crate::x402::{PriceTier, X_PAYMENT_HEADER};
use crate::AppState;

use super::payment_required_response;

#[derive(Debug, Deserialize)]
struct ValuationQuery {
    address: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/v1/valuation").route(web::get().to(get_valuation)));
}

async fn get_valuation(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ValuationQuery>,
) -> impl Responder {
    let tier = PriceTier::Valuation;
    let header = req
        .headers()
        .get(X_PAYMENT_HEADER)
        .and_then(|v| v.to_str().ok());

    let settlement = match state.verifier.verify_and_settle(header, tier).await {
        Ok(record) => record,
        Err(e) => return payment_required_response(&state, tier, &e),
    };

    match valuation::estimate(&state.db, &query.address) {
        Ok(Some(valuation)) => HttpResponse::Ok().json(serde_json::json!({
            "tier": tier.number(),
            "price_paid_usd": tier.price_usd(),
            "payment_uuid": settlement.uuid,
            "tx_hash": settlement.tx_hash,
            "valuation": valuation,
        })),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "No valuation available",
            "details": format!(
                "Unknown address or too few comparable listings: {}",
                query.address
            ),
            "payment_uuid": settlement.uuid,
        })),
        Err(e) => {
            log::error!("[Valuation] Estimate failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Valuation failed"
            }))
        }
    }
}
