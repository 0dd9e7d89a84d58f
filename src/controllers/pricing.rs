//! Unpaid discovery endpoints: what this API sells and for how much

use actix_web::{web, HttpResponse, Responder};
use ethers::utils::to_checksum;

use crate::x402::PriceTier;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)));
    cfg.service(web::resource("/pricing").route(web::get().to(pricing)));
}

async fn index(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "Estate402 Property Data API",
        "protocol": "x402",
        "network": state.config.payment.network,
        "payment_asset": to_checksum(&state.config.payment.asset, None),
        "endpoints": {
            "/pricing": "Price schedule (free)",
            "/api/health": "Health check (free)",
            "/api/v1/listings": "Listings queries (paid, tier 1)",
            "/api/v1/valuation": "Property valuation (paid, tier 2)",
            "/api/payments": "Settlement history (free)"
        }
    }))
}

async fn pricing(state: web::Data<AppState>) -> impl Responder {
    let tiers: Vec<serde_json::Value> = PriceTier::ALL
        .iter()
        .map(|tier| {
            serde_json::json!({
                "tier": tier.number(),
                "resource": tier.resource(),
                "price_usd": tier.price_usd(),
                "price_minor_units": tier.price(),
                "description": tier.description(),
            })
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "asset": to_checksum(&state.config.payment.asset, None),
        "network": state.config.payment.network,
        "pay_to": to_checksum(&state.config.payment.pay_to, None),
        "tiers": tiers,
    }))
}
