//! HTTP client that pays x402 challenges automatically.
//!
//! Wraps a reqwest client and a payment signer. On a 402 response it decodes
//! the challenge, signs one fresh authorization for the first accepted
//! requirement and retries the request exactly once with the X-PAYMENT
//! header attached. Any other status passes through untouched.

use std::sync::Arc;

use super::signer::X402Signer;
use super::types::PaymentRequired;
use super::{X_PAYMENT_HEADER, X_PAYMENT_REQUIRED_HEADER};

pub struct X402Client {
    http: reqwest::Client,
    signer: Arc<X402Signer>,
}

impl X402Client {
    pub fn new(private_key: &str, chain_id: u64) -> Result<Self, String> {
        Ok(Self {
            http: reqwest::Client::new(),
            signer: Arc::new(X402Signer::new(private_key, chain_id)?),
        })
    }

    pub fn wallet_address(&self) -> String {
        self.signer.address_string()
    }

    /// GET a resource, paying the challenge if one comes back. The final
    /// response is returned as-is; a second 402 means the payment was
    /// rejected and the caller can inspect the body for the reason.
    pub async fn get_with_payment(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, String> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if response.status() != reqwest::StatusCode::PAYMENT_REQUIRED {
            return Ok(response);
        }

        let challenge_header = response
            .headers()
            .get(X_PAYMENT_REQUIRED_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| "402 response without payment requirements header".to_string())?
            .to_string();

        let required = PaymentRequired::from_base64(&challenge_header)?;
        let requirements = required
            .accepts
            .first()
            .ok_or_else(|| "Challenge accepts no payment scheme".to_string())?;

        log::info!(
            "[X402] Paying {} minor units of {} to {} for {}",
            requirements.max_amount_required,
            requirements.asset,
            requirements.pay_to,
            requirements.resource
        );

        let envelope = self.signer.sign_payment(requirements)?.to_base64()?;

        // One retry only; a fresh 402 at this point is a final rejection
        self.http
            .get(url)
            .query(query)
            .header(X_PAYMENT_HEADER, envelope)
            .send()
            .await
            .map_err(|e| format!("Paid request failed: {}", e))
    }
}
