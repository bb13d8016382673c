use serde::{Deserialize, Serialize};
use tally_chainbase::ChainbaseObject;
use tally_error::ChainError;
use tally_proc_macros::{NumBytes, Read, Write};

use crate::chain::{
    config::GenesisResourceConfig,
    resource::{ElasticLimitParameters, ResourceKind},
    utils::chain_assert,
};

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Read, Write, NumBytes, Serialize, Deserialize,
)]
pub struct ResourceLimitsConfig {
    pub cpu_limit_parameters: ElasticLimitParameters,
    pub net_limit_parameters: ElasticLimitParameters,

    pub account_cpu_usage_average_window: u32,
    pub account_net_usage_average_window: u32,
}

impl ResourceLimitsConfig {
    pub fn limit_parameters(&self, kind: ResourceKind) -> &ElasticLimitParameters {
        match kind {
            ResourceKind::Cpu => &self.cpu_limit_parameters,
            ResourceKind::Net => &self.net_limit_parameters,
        }
    }

    pub fn account_usage_average_window(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Cpu => self.account_cpu_usage_average_window,
            ResourceKind::Net => self.account_net_usage_average_window,
        }
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        self.cpu_limit_parameters.validate()?;
        self.net_limit_parameters.validate()?;
        chain_assert(
            self.account_cpu_usage_average_window > 0 && self.account_net_usage_average_window > 0,
            ChainError::InvalidArgument("account usage average window cannot be zero".to_owned()),
        )
    }
}

/// The genesis defaults converted to slots.
impl Default for ResourceLimitsConfig {
    fn default() -> Self {
        GenesisResourceConfig::default().build()
    }
}

impl ChainbaseObject for ResourceLimitsConfig {
    type PrimaryKey = u64;

    fn primary_key(&self) -> Vec<u8> {
        ResourceLimitsConfig::primary_key_to_bytes(0)
    }

    fn primary_key_to_bytes(key: Self::PrimaryKey) -> Vec<u8> {
        key.to_be_bytes().to_vec()
    }

    fn table_name() -> &'static str {
        "resource_limits_config"
    }
}

#[cfg(test)]
mod tests {
    use tally_serialization::{Read, Write};

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResourceLimitsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cpu_limit_parameters.max, 200_000);
        assert_eq!(config.cpu_limit_parameters.target, 20_000);
        assert_eq!(config.cpu_limit_parameters.periods, 120);
        assert_eq!(config.net_limit_parameters.target, 104_857);
        assert_eq!(config.account_usage_average_window(ResourceKind::Cpu), 172_800);
        assert_eq!(config.account_usage_average_window(ResourceKind::Net), 172_800);
        assert_eq!(config.limit_parameters(ResourceKind::Net).max, 1024 * 1024);
    }

    #[test]
    fn test_config_record_codec() {
        let config = ResourceLimitsConfig::default();
        let packed = config.pack().unwrap();
        assert_eq!(ResourceLimitsConfig::unpack(&packed).unwrap(), config);
    }
}
