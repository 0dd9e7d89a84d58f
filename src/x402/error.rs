//! Payment verification and settlement error taxonomy.
//!
//! Every way a payment attempt can fail maps to exactly one variant here,
//! and every variant carries a stable machine-readable reason code that is
//! returned to callers alongside a fresh challenge. `SettlementTimeout` is
//! the one indeterminate outcome: the transfer may still confirm later, so
//! it carries the submitted transaction hash for reconciliation.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// No envelope was presented; a challenge is the normal response
    ChallengeRequired,
    /// The envelope failed structural decoding
    FormatInvalid(String),
    /// The authorization pays someone other than the configured payee
    RecipientMismatch,
    /// The authorized value is below the tier price
    AmountInsufficient,
    /// The current time is outside [validAfter, validBefore]
    TimeWindowInvalid,
    /// The (payer, nonce) pair has already been consumed
    NonceReused,
    /// The payer's on-chain balance cannot cover the authorized value
    BalanceInsufficient,
    /// Settlement was submitted but confirmation did not arrive in time.
    /// Indeterminate: the transfer may still confirm later.
    SettlementTimeout { tx_hash: String },
    /// The ledger definitively rejected the settlement
    SettlementReverted(String),
}

impl PaymentError {
    /// Stable machine-readable reason code
    pub fn reason(&self) -> &'static str {
        match self {
            PaymentError::ChallengeRequired => "payment_required",
            PaymentError::FormatInvalid(_) => "format_invalid",
            PaymentError::RecipientMismatch => "recipient_mismatch",
            PaymentError::AmountInsufficient => "amount_insufficient",
            PaymentError::TimeWindowInvalid => "time_window_invalid",
            PaymentError::NonceReused => "nonce_reused",
            PaymentError::BalanceInsufficient => "balance_insufficient",
            PaymentError::SettlementTimeout { .. } => "settlement_timeout",
            PaymentError::SettlementReverted(_) => "settlement_reverted",
        }
    }

    /// True when the outcome does not prove the transfer failed. Callers
    /// must not treat an indeterminate outcome as "no value moved".
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, PaymentError::SettlementTimeout { .. })
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::ChallengeRequired => write!(f, "Payment required"),
            PaymentError::FormatInvalid(detail) => write!(f, "Malformed payment envelope: {}", detail),
            PaymentError::RecipientMismatch => write!(f, "Authorization pays the wrong recipient"),
            PaymentError::AmountInsufficient => write!(f, "Authorized value is below the required price"),
            PaymentError::TimeWindowInvalid => write!(f, "Authorization validity window does not cover the current time"),
            PaymentError::NonceReused => write!(f, "Authorization nonce has already been used"),
            PaymentError::BalanceInsufficient => write!(f, "Payer balance cannot cover the authorized value"),
            PaymentError::SettlementTimeout { tx_hash } => write!(
                f,
                "Settlement not confirmed in time (tx {}); outcome indeterminate",
                tx_hash
            ),
            PaymentError::SettlementReverted(detail) => write!(f, "Settlement reverted: {}", detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_distinct() {
        let all = [
            PaymentError::ChallengeRequired,
            PaymentError::FormatInvalid("x".into()),
            PaymentError::RecipientMismatch,
            PaymentError::AmountInsufficient,
            PaymentError::TimeWindowInvalid,
            PaymentError::NonceReused,
            PaymentError::BalanceInsufficient,
            PaymentError::SettlementTimeout { tx_hash: "0x0".into() },
            PaymentError::SettlementReverted("x".into()),
        ];
        let mut reasons: Vec<&str> = all.iter().map(|e| e.reason()).collect();
        reasons.sort();
        reasons.dedup();
        assert_eq!(reasons.len(), all.len());
    }

    #[test]
    fn test_only_timeout_is_indeterminate() {
        assert!(PaymentError::SettlementTimeout { tx_hash: "0x0".into() }.is_indeterminate());
        assert!(!PaymentError::SettlementReverted("boom".into()).is_indeterminate());
        assert!(!PaymentError::NonceReused.is_indeterminate());
    }
}
