//! Comparables-based property valuation
//!
//! The tier-2 product. Estimates a property's value from recently listed
//! comparable properties in the same neighborhood, with a market-velocity
//! adjustment and a confidence grade.

use serde::Serialize;

use crate::db::Database;
use crate::models::Listing;

/// Minimum comparables needed to produce an estimate at all
const MIN_COMPARABLES: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct ComparableSummary {
    pub address: String,
    pub sqm: i64,
    pub price: i64,
    pub price_per_sqm: f64,
    pub days_on_market: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketMetrics {
    pub avg_price_per_sqm: f64,
    pub avg_days_on_market: f64,
    pub market_adjustment: f64,
    pub comparables_used: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Valuation {
    pub address: String,
    pub neighborhood: String,
    pub property_type: String,
    pub sqm: i64,
    pub listed_price: i64,
    pub estimated_value: i64,
    pub pricing_assessment: String,
    pub confidence: String,
    pub comparables: Vec<ComparableSummary>,
    pub market_metrics: MarketMetrics,
}

/// Estimate the value of the listing at `address`. Returns None when the
/// address is unknown or there are too few comparables to say anything.
pub fn estimate(db: &Database, address: &str) -> Result<Option<Valuation>, String> {
    let subject = match db.get_listing_by_address(address)? {
        Some(listing) => listing,
        None => return Ok(None),
    };

    let comps = db.get_comparables(
        &subject.neighborhood,
        &subject.property_type,
        subject.sqm,
        &subject.address,
    )?;

    if comps.len() < MIN_COMPARABLES {
        return Ok(None);
    }

    let per_sqm: Vec<f64> = comps.iter().map(Listing::price_per_sqm).collect();
    let avg_price_per_sqm = per_sqm.iter().sum::<f64>() / per_sqm.len() as f64;
    let avg_days_on_market =
        comps.iter().map(|c| c.days_on_market as f64).sum::<f64>() / comps.len() as f64;

    // Slow neighborhoods price down, hot ones price up
    let market_adjustment = if avg_days_on_market > 90.0 {
        0.95
    } else if avg_days_on_market < 30.0 {
        1.02
    } else {
        1.0
    };

    let estimated_value =
        (avg_price_per_sqm * subject.sqm as f64 * market_adjustment).round() as i64;

    let pricing_assessment = assess_pricing(subject.price, estimated_value);
    let confidence = grade_confidence(&per_sqm, avg_price_per_sqm);

    let comparables = comps
        .iter()
        .take(3)
        .map(|c| ComparableSummary {
            address: c.address.clone(),
            sqm: c.sqm,
            price: c.price,
            price_per_sqm: (c.price_per_sqm() * 100.0).round() / 100.0,
            days_on_market: c.days_on_market,
        })
        .collect();

    Ok(Some(Valuation {
        address: subject.address,
        neighborhood: subject.neighborhood,
        property_type: subject.property_type,
        sqm: subject.sqm,
        listed_price: subject.price,
        estimated_value,
        pricing_assessment,
        confidence,
        comparables,
        market_metrics: MarketMetrics {
            avg_price_per_sqm: (avg_price_per_sqm * 100.0).round() / 100.0,
            avg_days_on_market,
            market_adjustment,
            comparables_used: comps.len(),
        },
    }))
}

fn assess_pricing(listed_price: i64, estimated_value: i64) -> String {
    let ratio = listed_price as f64 / estimated_value as f64;
    if ratio > 1.10 {
        "overpriced".to_string()
    } else if ratio < 0.90 {
        "underpriced".to_string()
    } else {
        "fairly priced".to_string()
    }
}

/// Confidence from comparable count and price dispersion
fn grade_confidence(per_sqm: &[f64], avg: f64) -> String {
    let variance =
        per_sqm.iter().map(|p| (p - avg).powi(2)).sum::<f64>() / per_sqm.len() as f64;
    let relative_spread = variance.sqrt() / avg;

    if per_sqm.len() >= 4 && relative_spread < 0.15 {
        "high".to_string()
    } else if per_sqm.len() >= 3 && relative_spread < 0.25 {
        "medium".to_string()
    } else {
        "low".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valuation.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        db.seed_listings_if_empty().unwrap();
        (dir, db)
    }

    #[test]
    fn test_unknown_address_is_none() {
        let (_dir, db) = seeded_db();
        assert!(estimate(&db, "1 Nowhere Ln").unwrap().is_none());
    }

    #[test]
    fn test_mission_condo_valuation() {
        let (_dir, db) = seeded_db();
        let valuation = estimate(&db, "845 Valencia St #12").unwrap().unwrap();

        assert_eq!(valuation.neighborhood, "Mission");
        assert!(valuation.estimated_value > 0);
        assert!(valuation.market_metrics.comparables_used >= MIN_COMPARABLES);
        assert!(valuation.comparables.len() <= 3);
        assert!(["high", "medium", "low"].contains(&valuation.confidence.as_str()));
        assert!(["overpriced", "underpriced", "fairly priced"]
            .contains(&valuation.pricing_assessment.as_str()));
    }

    #[test]
    fn test_too_few_comparables_is_none() {
        let (_dir, db) = seeded_db();
        // The only Richmond listing has no comparables in its segment
        assert!(estimate(&db, "655 Divisadero St #2").unwrap().is_none());
    }

    #[test]
    fn test_pricing_assessment_bands() {
        assert_eq!(assess_pricing(1_200_000, 1_000_000), "overpriced");
        assert_eq!(assess_pricing(850_000, 1_000_000), "underpriced");
        assert_eq!(assess_pricing(1_050_000, 1_000_000), "fairly priced");
    }

    #[test]
    fn test_confidence_grades() {
        // Four tight comparables
        let tight = vec![10_000.0, 10_100.0, 9_900.0, 10_050.0];
        assert_eq!(grade_confidence(&tight, 10_012.5), "high");

        // Two comparables is always low
        let few = vec![10_000.0, 10_100.0];
        assert_eq!(grade_confidence(&few, 10_050.0), "low");
    }
}
