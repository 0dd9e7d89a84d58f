//! Real estate listing data types

use serde::{Deserialize, Serialize};

/// A property listing row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub address: String,
    pub neighborhood: String,
    pub property_type: String,
    pub bedrooms: i64,
    pub sqm: i64,
    pub price: i64,
    pub days_on_market: i64,
    pub listed_date: String,
}

impl Listing {
    pub fn price_per_sqm(&self) -> f64 {
        self.price as f64 / self.sqm as f64
    }
}

/// Listing query filter. Queries are scoped: callers must narrow by
/// criteria and results are capped, so a single paid query can never dump
/// the whole dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    pub neighborhood: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub bedrooms: Option<i64>,
    pub limit: Option<i64>,
}

/// Hard cap on results per paid query
pub const MAX_LISTINGS_PER_QUERY: i64 = 20;

impl ListingFilter {
    /// Effective limit, clamped to the per-query cap
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(10)
            .clamp(1, MAX_LISTINGS_PER_QUERY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped() {
        let filter = ListingFilter {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), MAX_LISTINGS_PER_QUERY);

        let filter = ListingFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 1);

        let filter = ListingFilter::default();
        assert_eq!(filter.effective_limit(), 10);
    }
}
