use serde::Serialize;
use tally_chainbase::ChainbaseObject;
use tally_proc_macros::{NumBytes, Read, Write};

use crate::chain::{
    name::Name,
    resource::{Limit, ResourceKind},
};

/// Configured limits of one account.
///
/// Every account has an active record (`pending == false`). Changes are
/// staged in a second record with `pending == true` until the next
/// [`commit_pending_limit_changes`](crate::chain::resource_limits::ResourceLimitsManager::commit_pending_limit_changes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Read, Write, NumBytes)]
pub struct ResourceLimits {
    pub owner: Name,
    pub pending: bool,
    pub net_weight: Limit,
    pub cpu_weight: Limit,
    pub ram_bytes: Limit,
}

impl ResourceLimits {
    pub fn new(
        owner: Name,
        pending: bool,
        net_weight: Limit,
        cpu_weight: Limit,
        ram_bytes: Limit,
    ) -> Self {
        ResourceLimits {
            owner,
            pending,
            net_weight,
            cpu_weight,
            ram_bytes,
        }
    }

    pub fn weight(&self, kind: ResourceKind) -> Limit {
        match kind {
            ResourceKind::Cpu => self.cpu_weight,
            ResourceKind::Net => self.net_weight,
        }
    }

    /// Key range covering every staged record.
    pub fn pending_key_range() -> (Vec<u8>, Vec<u8>) {
        (vec![1], vec![2])
    }
}

impl ChainbaseObject for ResourceLimits {
    type PrimaryKey = (bool, Name);

    fn primary_key(&self) -> Vec<u8> {
        ResourceLimits::primary_key_to_bytes((self.pending, self.owner))
    }

    // pending flag first so staged records form one contiguous range
    fn primary_key_to_bytes(key: Self::PrimaryKey) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(9);
        bytes.push(key.0 as u8);
        bytes.extend_from_slice(&key.1.as_u64().to_be_bytes());
        bytes
    }

    fn table_name() -> &'static str {
        "resource_limits"
    }
}

/// Limits as seen by the account owner, staged changes included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountLimits {
    pub ram_bytes: Limit,
    pub net_weight: Limit,
    pub cpu_weight: Limit,
}

impl From<&ResourceLimits> for AccountLimits {
    fn from(limits: &ResourceLimits) -> Self {
        AccountLimits {
            ram_bytes: limits.ram_bytes,
            net_weight: limits.net_weight,
            cpu_weight: limits.cpu_weight,
        }
    }
}
