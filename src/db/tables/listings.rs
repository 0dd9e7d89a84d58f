//! Listings table operations
//!
//! The proprietary data asset behind the tier-1 endpoint. Queries are
//! always scoped and capped; there is no "select everything" path.

use crate::models::{Listing, ListingFilter};

use super::super::Database;

fn row_to_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get(0)?,
        address: row.get(1)?,
        neighborhood: row.get(2)?,
        property_type: row.get(3)?,
        bedrooms: row.get(4)?,
        sqm: row.get(5)?,
        price: row.get(6)?,
        days_on_market: row.get(7)?,
        listed_date: row.get(8)?,
    })
}

const LISTING_COLUMNS: &str =
    "id, address, neighborhood, property_type, bedrooms, sqm, price, days_on_market, listed_date";

impl Database {
    /// Query listings with a scoped filter and capped result count
    pub fn query_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, String> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM listings WHERE 1=1", LISTING_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref neighborhood) = filter.neighborhood {
            sql.push_str(&format!(" AND neighborhood = ?{}", params.len() + 1));
            params.push(Box::new(neighborhood.clone()));
        }
        if let Some(ref property_type) = filter.property_type {
            sql.push_str(&format!(" AND property_type = ?{}", params.len() + 1));
            params.push(Box::new(property_type.clone()));
        }
        if let Some(min_price) = filter.min_price {
            sql.push_str(&format!(" AND price >= ?{}", params.len() + 1));
            params.push(Box::new(min_price));
        }
        if let Some(max_price) = filter.max_price {
            sql.push_str(&format!(" AND price <= ?{}", params.len() + 1));
            params.push(Box::new(max_price));
        }
        if let Some(bedrooms) = filter.bedrooms {
            sql.push_str(&format!(" AND bedrooms = ?{}", params.len() + 1));
            params.push(Box::new(bedrooms));
        }

        sql.push_str(&format!(" LIMIT {}", filter.effective_limit()));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| format!("Listing query failed: {}", e))?;
        let rows = stmt
            .query_map(params_refs.as_slice(), row_to_listing)
            .map_err(|e| format!("Listing query failed: {}", e))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Look up a single listing by its exact address
    pub fn get_listing_by_address(&self, address: &str) -> Result<Option<Listing>, String> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM listings WHERE address = ?1",
                LISTING_COLUMNS
            ))
            .map_err(|e| format!("Listing lookup failed: {}", e))?;
        Ok(stmt.query_row([address], row_to_listing).ok())
    }

    /// Comparable properties: same neighborhood and type, similar size,
    /// closest size first
    pub fn get_comparables(
        &self,
        neighborhood: &str,
        property_type: &str,
        sqm: i64,
        exclude_address: &str,
    ) -> Result<Vec<Listing>, String> {
        let conn = self.conn()?;
        let sqm_low = (sqm as f64 * 0.8) as i64;
        let sqm_high = (sqm as f64 * 1.2) as i64;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM listings
                 WHERE neighborhood = ?1 AND property_type = ?2
                   AND sqm BETWEEN ?3 AND ?4 AND address != ?5
                 ORDER BY ABS(sqm - ?6) ASC
                 LIMIT 5",
                LISTING_COLUMNS
            ))
            .map_err(|e| format!("Comparables query failed: {}", e))?;
        let rows = stmt
            .query_map(
                rusqlite::params![
                    neighborhood,
                    property_type,
                    sqm_low,
                    sqm_high,
                    exclude_address,
                    sqm
                ],
                row_to_listing,
            )
            .map_err(|e| format!("Comparables query failed: {}", e))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn count_listings(&self) -> Result<i64, String> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))
            .map_err(|e| format!("Listing count failed: {}", e))
    }

    /// Seed the sample dataset on first start so the demo endpoints have
    /// something to sell
    pub fn seed_listings_if_empty(&self) -> Result<usize, String> {
        if self.count_listings()? > 0 {
            return Ok(0);
        }

        let conn = self.conn()?;
        let mut inserted = 0;
        for (address, neighborhood, property_type, bedrooms, sqm, price, days_on_market) in
            SEED_LISTINGS
        {
            conn.execute(
                "INSERT INTO listings
                 (address, neighborhood, property_type, bedrooms, sqm, price, days_on_market, listed_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    address,
                    neighborhood,
                    property_type,
                    bedrooms,
                    sqm,
                    price,
                    days_on_market,
                    (chrono::Utc::now() - chrono::Duration::days(*days_on_market))
                        .format("%Y-%m-%d")
                        .to_string(),
                ],
            )
            .map_err(|e| format!("Failed to seed listing '{}': {}", address, e))?;
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// Sample San Francisco dataset:
/// (address, neighborhood, property_type, bedrooms, sqm, price, days_on_market)
pub const SEED_LISTINGS: &[(&str, &str, &str, i64, i64, i64, i64)] = &[
    ("845 Valencia St #12", "Mission", "condo", 2, 88, 1195000, 21),
    ("2210 Mission St #5", "Mission", "condo", 2, 92, 1240000, 44),
    ("633 Guerrero St #3", "Mission", "condo", 1, 71, 980000, 17),
    ("1189 Dolores St #7", "Mission", "condo", 2, 95, 1310000, 102),
    ("312 24th St #2", "Mission", "condo", 2, 84, 1150000, 63),
    ("78 18th St", "Mission", "apartment", 1, 58, 842000, 35),
    ("455 Folsom St #1808", "SOMA", "condo", 1, 66, 955000, 12),
    ("888 Howard St #903", "SOMA", "condo", 2, 89, 1188000, 29),
    ("355 Folsom St #402", "SOMA", "condo", 2, 94, 1252000, 97),
    ("199 Market St #1104", "SOMA", "loft", 1, 78, 1015000, 51),
    ("145 Howard St #16", "SOMA", "loft", 2, 101, 1330000, 26),
    ("3320 Chestnut St", "Marina", "condo", 2, 98, 1545000, 19),
    ("2155 Union St #4", "Marina", "condo", 2, 104, 1610000, 41),
    ("3655 Lombard St #2", "Marina", "condo", 1, 72, 1190000, 88),
    ("2820 Green St", "Marina", "house", 3, 168, 2890000, 54),
    ("4120 Castro St #6", "Castro", "condo", 2, 86, 1205000, 33),
    ("560 Noe St", "Castro", "house", 3, 152, 2310000, 71),
    ("388 Sanchez St #2", "Castro", "apartment", 1, 61, 870000, 24),
    ("510 Hayes St #9", "Hayes Valley", "condo", 2, 90, 1265000, 16),
    ("724 Hayes St #3", "Hayes Valley", "condo", 1, 68, 942000, 47),
    ("311 Fillmore St #5", "Hayes Valley", "apartment", 2, 82, 1098000, 92),
    ("1480 Church St", "Noe Valley", "house", 4, 195, 3120000, 38),
    ("1251 Sanchez St #2", "Noe Valley", "condo", 2, 93, 1480000, 22),
    ("980 Dolores St #4", "Noe Valley", "condo", 2, 97, 1532000, 59),
    ("2390 Divisadero St", "Pacific Heights", "house", 4, 210, 4250000, 64),
    ("2744 Fillmore St #3", "Pacific Heights", "condo", 2, 110, 2180000, 31),
    ("1842 Market St #908", "Sunset", "condo", 2, 85, 905000, 49),
    ("2218 Valencia St #1", "Sunset", "apartment", 1, 57, 698000, 77),
    ("655 Divisadero St #2", "Richmond", "condo", 2, 88, 948000, 42),
];
