use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use estate402::config::Config;
use estate402::db::Database;
use estate402::x402::{EvmLedger, PaymentVerifier};
use estate402::{controllers, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let db = match Database::new(&config.database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            log::error!("Database error: {}", e);
            std::process::exit(1);
        }
    };
    match db.seed_listings_if_empty() {
        Ok(0) => {}
        Ok(n) => log::info!("Seeded {} sample listings", n),
        Err(e) => {
            log::error!("Failed to seed listings: {}", e);
            std::process::exit(1);
        }
    }

    let ledger = match EvmLedger::new(
        &config.payment.rpc_url,
        config.payment.chain_id,
        config.payment.asset,
        &config.payment.relayer_private_key,
    ) {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => {
            log::error!("Ledger error: {}", e);
            std::process::exit(1);
        }
    };

    let verifier = Arc::new(PaymentVerifier::new(
        &config.payment,
        ledger,
        Some(db.clone()),
    ));

    let port = config.port;
    log::info!(
        "Starting Estate402 server on port {} (network {})",
        port,
        config.payment.network
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_headers(["X-PAYMENT-REQUIRED"])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                db: Arc::clone(&db),
                config: config.clone(),
                verifier: Arc::clone(&verifier),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::pricing::config)
            .configure(controllers::listings::config)
            .configure(controllers::valuation::config)
            .configure(controllers::payments::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
