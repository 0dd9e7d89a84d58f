//! Tier 1: paid listings queries

use actix_web::{web, HttpRequest, HttpResponse, Responder};

use crate::models::ListingFilter;
use crate::x402::{PriceTier, X_PAYMENT_HEADER};
use crate::AppState;

use super::payment_required_response;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/v1/listings").route(web::get().to(query_listings)));
}

async fn query_listings(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListingFilter>,
) -> impl Responder {
    let tier = PriceTier::Listings;
    let header = req
        .headers()
        .get(X_PAYMENT_HEADER)
        .and_then(|v| v.to_str().ok());

    let settlement = match state.verifier.verify_and_settle(header, tier).await {
        Ok(record) => record,
        Err(e) => return payment_required_response(&state, tier, &e),
    };

    let filter = query.into_inner();
    let listings = match state.db.query_listings(&filter) {
        Ok(listings) => listings,
        Err(e) => {
            log::error!("[Listings] Query failed: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Listing query failed"
            }));
        }
    };

    HttpResponse::Ok().json(serde_json::json!({
        "tier": tier.number(),
        "price_paid_usd": tier.price_usd(),
        "payment_uuid": settlement.uuid,
        "tx_hash": settlement.tx_hash,
        "result_count": listings.len(),
        "listings": listings,
        "note": format!("Results are capped at {} per query", filter.effective_limit()),
    }))
}
