use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("genesis error: {0}")]
    GenesisError(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("database error: {0}")]
    DatabaseError(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("serialization error: {0}")]
    SerializationError(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An account's smoothed usage would exceed its entitlement for `resource`.
    #[error("account {account} has insufficient {resource} resources: used {used}, limit {limit}")]
    TxResourceExhausted {
        account: String,
        resource: String,
        used: u64,
        limit: u64,
    },
    /// The running block total for `resource` would exceed the hard ceiling.
    #[error("block has insufficient {resource} resources: pending {pending}, max {max}")]
    BlockResourceExhausted {
        resource: String,
        pending: u64,
        max: u64,
    },
    #[error("account {account} ram limit of {limit} bytes is below committed usage of {usage} bytes")]
    RamLimitUnderflow {
        account: String,
        limit: u64,
        usage: u64,
    },
}

impl ChainError {
    pub fn is_tx_resource_exhausted(&self) -> bool {
        matches!(self, ChainError::TxResourceExhausted { .. })
    }

    pub fn is_block_resource_exhausted(&self) -> bool {
        matches!(self, ChainError::BlockResourceExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_kinds() {
        let account = ChainError::TxResourceExhausted {
            account: "alice".to_owned(),
            resource: "cpu".to_owned(),
            used: 11,
            limit: 10,
        };
        assert!(account.is_tx_resource_exhausted());
        assert!(!account.is_block_resource_exhausted());
        assert_eq!(
            account.to_string(),
            "account alice has insufficient cpu resources: used 11, limit 10"
        );

        let block = ChainError::BlockResourceExhausted {
            resource: "net".to_owned(),
            pending: 1_049_000,
            max: 1_048_576,
        };
        assert!(block.is_block_resource_exhausted());
        assert!(!block.is_tx_resource_exhausted());
    }

    #[test]
    fn test_non_resource_errors() {
        let underflow = ChainError::RamLimitUnderflow {
            account: "bob".to_owned(),
            limit: 538,
            usage: 600,
        };
        assert!(!underflow.is_tx_resource_exhausted());
        assert_eq!(
            underflow.to_string(),
            "account bob ram limit of 538 bytes is below committed usage of 600 bytes"
        );

        let invariant = ChainError::InvariantViolation("state missing".to_owned());
        assert!(!invariant.is_block_resource_exhausted());
        assert_eq!(invariant.to_string(), "invariant violation: state missing");
    }
}
