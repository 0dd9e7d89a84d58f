pub mod sqlite;
pub mod tables;

pub use sqlite::{Database, DbConn};
pub use tables::payments::{SettlementRecord, SettlementStatus};
