//! Settled payments table operations
//!
//! Every on-chain settlement attempt is recorded here, pending rows
//! included, so an operator can reconcile indeterminate outcomes against
//! the chain later.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::super::Database;

/// Lifecycle of a settlement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Submitted, confirmation outcome not yet known
    Pending,
    /// Confirmed on-chain
    Confirmed,
    /// Reverted on-chain
    Failed,
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementStatus::Pending => write!(f, "pending"),
            SettlementStatus::Confirmed => write!(f, "confirmed"),
            SettlementStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SettlementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SettlementStatus::Pending),
            "confirmed" => Ok(SettlementStatus::Confirmed),
            "failed" => Ok(SettlementStatus::Failed),
            other => Err(format!("Unknown settlement status: {}", other)),
        }
    }
}

/// One settlement attempt, as stored and as returned by the payments API
#[derive(Debug, Clone, Serialize)]
pub struct SettlementRecord {
    pub uuid: String,
    pub payer: String,
    pub pay_to: String,
    pub value: String,
    pub nonce: String,
    pub tier: u8,
    pub resource: String,
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SettlementRecord> {
    let status_str: String = row.get(9)?;
    let created_str: String = row.get(10)?;
    Ok(SettlementRecord {
        uuid: row.get(0)?,
        payer: row.get(1)?,
        pay_to: row.get(2)?,
        value: row.get(3)?,
        nonce: row.get(4)?,
        tier: row.get::<_, i64>(5)? as u8,
        resource: row.get(6)?,
        tx_hash: row.get(7)?,
        block_number: row.get::<_, Option<i64>>(8)?.map(|n| n as u64),
        status: status_str.parse().unwrap_or(SettlementStatus::Pending),
        created_at: created_str
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now()),
    })
}

const PAYMENT_COLUMNS: &str =
    "uuid, payer, pay_to, value, nonce, tier, resource, tx_hash, block_number, status, created_at";

impl Database {
    pub fn insert_settlement(&self, record: &SettlementRecord) -> Result<(), String> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO payments
             (uuid, payer, pay_to, value, nonce, tier, resource, tx_hash, block_number, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                record.uuid,
                record.payer,
                record.pay_to,
                record.value,
                record.nonce,
                record.tier as i64,
                record.resource,
                record.tx_hash,
                record.block_number.map(|n| n as i64),
                record.status.to_string(),
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("Failed to insert settlement: {}", e))?;
        Ok(())
    }

    pub fn update_settlement_status(
        &self,
        uuid: &str,
        status: SettlementStatus,
        block_number: Option<u64>,
    ) -> Result<(), String> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE payments SET status = ?1, block_number = ?2 WHERE uuid = ?3",
            rusqlite::params![status.to_string(), block_number.map(|n| n as i64), uuid],
        )
        .map_err(|e| format!("Failed to update settlement: {}", e))?;
        Ok(())
    }

    pub fn get_settlement(&self, uuid: &str) -> Result<Option<SettlementRecord>, String> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM payments WHERE uuid = ?1",
                PAYMENT_COLUMNS
            ))
            .map_err(|e| format!("Settlement lookup failed: {}", e))?;
        Ok(stmt.query_row([uuid], row_to_record).ok())
    }

    /// Most recent settlements first
    pub fn list_settlements(&self, limit: i64) -> Result<Vec<SettlementRecord>, String> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM payments ORDER BY id DESC LIMIT ?1",
                PAYMENT_COLUMNS
            ))
            .map_err(|e| format!("Settlement list failed: {}", e))?;
        let rows = stmt
            .query_map([limit], row_to_record)
            .map_err(|e| format!("Settlement list failed: {}", e))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}
