use serde::Serialize;

use crate::chain::resource::Limit;

/// Extended view of one account's elastic entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountResourceLimit {
    /// Usage counted against the entitlement at the last update.
    pub used: u64,
    /// Headroom left, or unbounded.
    pub available: Limit,
    pub max: Limit,
    pub last_usage_update_slot: u32,
}
