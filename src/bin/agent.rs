//! Demo buyer agent.
//!
//! Walks the full x402 flow against a running server: queries listings
//! (tier 1), then buys a valuation for the first result (tier 2). The
//! agent only ever signs; the server's relayer pays all gas.

use estate402::x402::X402Client;

#[tokio::main]
async fn main() -> Result<(), String> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let private_key = std::env::var("AGENT_PRIVATE_KEY")
        .map_err(|_| "AGENT_PRIVATE_KEY must be set".to_string())?;
    let base_url =
        std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let chain_id: u64 = std::env::var("CHAIN_ID")
        .unwrap_or_else(|_| "84532".to_string())
        .parse()
        .map_err(|_| "CHAIN_ID must be a number".to_string())?;

    let client = X402Client::new(&private_key, chain_id)?;
    log::info!("Agent wallet: {}", client.wallet_address());

    // Tier 1: listings in one neighborhood
    let response = client
        .get_with_payment(
            &format!("{}/api/v1/listings", base_url),
            &[
                ("neighborhood", "Mission".to_string()),
                ("property_type", "condo".to_string()),
            ],
        )
        .await?;
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| format!("Bad listings response: {}", e))?;
    if !status.is_success() {
        return Err(format!("Listings request failed ({}): {}", status, body));
    }
    log::info!(
        "Bought {} listings for ${}",
        body["result_count"],
        body["price_paid_usd"]
    );

    let first_address = body["listings"][0]["address"]
        .as_str()
        .ok_or_else(|| "No listings returned".to_string())?
        .to_string();

    // Tier 2: valuation of the first result
    let response = client
        .get_with_payment(
            &format!("{}/api/v1/valuation", base_url),
            &[("address", first_address.clone())],
        )
        .await?;
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| format!("Bad valuation response: {}", e))?;
    if !status.is_success() {
        return Err(format!("Valuation request failed ({}): {}", status, body));
    }

    let valuation = &body["valuation"];
    log::info!(
        "Valuation for {}: listed {} / estimated {} ({}, confidence {})",
        first_address,
        valuation["listed_price"],
        valuation["estimated_value"],
        valuation["pricing_assessment"],
        valuation["confidence"]
    );

    println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    Ok(())
}
