//! Price schedule for the gated endpoints.
//!
//! Tiers are static: each one binds a price in USDC minor units (6 decimals)
//! to exactly one resource path. Because the schedule is an enum there is no
//! such thing as an unconfigured tier at request time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    /// Tier 1: listings queries
    Listings,
    /// Tier 2: proprietary valuation
    Valuation,
}

impl PriceTier {
    pub const ALL: [PriceTier; 2] = [PriceTier::Listings, PriceTier::Valuation];

    pub fn number(&self) -> u8 {
        match self {
            PriceTier::Listings => 1,
            PriceTier::Valuation => 2,
        }
    }

    /// Exact price in USDC minor units
    pub fn price(&self) -> u64 {
        match self {
            PriceTier::Listings => 10_000,   // $0.01
            PriceTier::Valuation => 100_000, // $0.10
        }
    }

    pub fn price_usd(&self) -> f64 {
        self.price() as f64 / 1_000_000.0
    }

    /// The resource path this tier gates
    pub fn resource(&self) -> &'static str {
        match self {
            PriceTier::Listings => "/api/v1/listings",
            PriceTier::Valuation => "/api/v1/valuation",
        }
    }

    pub fn description(&self) -> String {
        format!(
            "Pay ${} USDC for Tier {} access",
            self.price_usd(),
            self.number()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prices() {
        assert_eq!(PriceTier::Listings.price(), 10_000);
        assert_eq!(PriceTier::Valuation.price(), 100_000);
    }

    #[test]
    fn test_resources_are_distinct() {
        assert_ne!(PriceTier::Listings.resource(), PriceTier::Valuation.resource());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(PriceTier::Listings.number(), 1);
        assert_eq!(PriceTier::Valuation.number(), 2);
    }
}
