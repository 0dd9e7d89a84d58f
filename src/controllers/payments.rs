//! Settlement history endpoints

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    limit: Option<i64>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/payments")
            .route("", web::get().to(list_payments))
            .route("/{uuid}", web::get().to(get_payment)),
    );
}

async fn list_payments(
    state: web::Data<AppState>,
    query: web::Query<PaymentListQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    match state.db.list_settlements(limit) {
        Ok(payments) => HttpResponse::Ok().json(serde_json::json!({
            "total": payments.len(),
            "payments": payments,
        })),
        Err(e) => {
            log::error!("[Payments] List failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to list payments"
            }))
        }
    }
}

async fn get_payment(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let uuid = path.into_inner();
    match state.db.get_settlement(&uuid) {
        Ok(Some(payment)) => HttpResponse::Ok().json(payment),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Payment not found",
            "uuid": uuid,
        })),
        Err(e) => {
            log::error!("[Payments] Lookup failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to fetch payment"
            }))
        }
    }
}
