use tally_chainbase::ChainbaseObject;
use tally_proc_macros::{NumBytes, Read, Write};

use crate::chain::{name::Name, resource::ResourceKind, utils::UsageAccumulator};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Read, Write, NumBytes)]
pub struct ResourceUsage {
    pub owner: Name,

    pub cpu_usage: UsageAccumulator,
    pub net_usage: UsageAccumulator,

    pub ram_usage: u64,
    /// Uncommitted RAM delta, folded into `ram_usage` on synchronization.
    pub pending_ram_delta: i64,
}

impl ResourceUsage {
    pub fn new(owner: Name) -> Self {
        ResourceUsage {
            owner,
            ..Default::default()
        }
    }

    pub fn usage(&self, kind: ResourceKind) -> &UsageAccumulator {
        match kind {
            ResourceKind::Cpu => &self.cpu_usage,
            ResourceKind::Net => &self.net_usage,
        }
    }

    pub fn usage_mut(&mut self, kind: ResourceKind) -> &mut UsageAccumulator {
        match kind {
            ResourceKind::Cpu => &mut self.cpu_usage,
            ResourceKind::Net => &mut self.net_usage,
        }
    }
}

impl ChainbaseObject for ResourceUsage {
    type PrimaryKey = Name;

    fn primary_key(&self) -> Vec<u8> {
        ResourceUsage::primary_key_to_bytes(self.owner)
    }

    fn primary_key_to_bytes(key: Self::PrimaryKey) -> Vec<u8> {
        key.as_u64().to_be_bytes().to_vec()
    }

    fn table_name() -> &'static str {
        "resource_usage"
    }
}
