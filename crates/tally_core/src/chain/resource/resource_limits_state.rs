use tally_chainbase::ChainbaseObject;
use tally_proc_macros::{NumBytes, Read, Write};

use crate::chain::{resource::ResourceKind, utils::UsageAccumulator};

/// Chain-wide accounting state. Exactly one instance exists once the chain
/// has been initialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Read, Write, NumBytes)]
pub struct ResourceLimitsState {
    pub average_block_net_usage: UsageAccumulator,
    pub average_block_cpu_usage: UsageAccumulator,

    pub pending_net_usage: u64,
    pub pending_cpu_usage: u64,

    pub total_net_weight: u64,
    pub total_cpu_weight: u64,
    pub total_ram_bytes: u64,

    pub virtual_net_limit: u64,
    pub virtual_cpu_limit: u64,
}

impl ResourceLimitsState {
    pub fn average_block_usage(&self, kind: ResourceKind) -> &UsageAccumulator {
        match kind {
            ResourceKind::Cpu => &self.average_block_cpu_usage,
            ResourceKind::Net => &self.average_block_net_usage,
        }
    }

    pub fn pending_usage(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Cpu => self.pending_cpu_usage,
            ResourceKind::Net => self.pending_net_usage,
        }
    }

    pub fn pending_usage_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Cpu => &mut self.pending_cpu_usage,
            ResourceKind::Net => &mut self.pending_net_usage,
        }
    }

    pub fn total_weight(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Cpu => self.total_cpu_weight,
            ResourceKind::Net => self.total_net_weight,
        }
    }

    pub fn total_weight_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Cpu => &mut self.total_cpu_weight,
            ResourceKind::Net => &mut self.total_net_weight,
        }
    }

    pub fn virtual_limit(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Cpu => self.virtual_cpu_limit,
            ResourceKind::Net => self.virtual_net_limit,
        }
    }

    /// Split borrow of the block average and virtual limit for one resource.
    pub fn elastic_mut(&mut self, kind: ResourceKind) -> (&mut UsageAccumulator, &mut u64) {
        match kind {
            ResourceKind::Cpu => (&mut self.average_block_cpu_usage, &mut self.virtual_cpu_limit),
            ResourceKind::Net => (&mut self.average_block_net_usage, &mut self.virtual_net_limit),
        }
    }
}

impl ChainbaseObject for ResourceLimitsState {
    type PrimaryKey = u64;

    fn primary_key(&self) -> Vec<u8> {
        ResourceLimitsState::primary_key_to_bytes(0)
    }

    fn primary_key_to_bytes(key: Self::PrimaryKey) -> Vec<u8> {
        key.to_be_bytes().to_vec()
    }

    fn table_name() -> &'static str {
        "resource_limits_state"
    }
}
