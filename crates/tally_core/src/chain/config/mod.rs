use core::str;

use serde::{Deserialize, Deserializer, Serialize};
use tally_constants::{
    ACCOUNT_CPU_USAGE_AVERAGE_WINDOW_MS, ACCOUNT_NET_USAGE_AVERAGE_WINDOW_MS,
    BLOCK_CPU_USAGE_AVERAGE_WINDOW_MS, BLOCK_INTERVAL_MS, BLOCK_SIZE_AVERAGE_WINDOW_MS,
    DEFAULT_CONTRACT_RATE, DEFAULT_EXPAND_RATE, DEFAULT_MAX_BLOCK_CPU_USAGE,
    DEFAULT_MAX_BLOCK_NET_USAGE, DEFAULT_TARGET_BLOCK_CPU_USAGE_PCT,
    DEFAULT_TARGET_BLOCK_NET_USAGE_PCT, MAXIMUM_ELASTIC_RESOURCE_MULTIPLIER, PERCENT_100,
};
use tally_error::ChainError;

use crate::chain::{
    resource::{ElasticLimitParameters, ResourceLimitsConfig},
    utils::{Ratio, chain_assert, make_ratio},
};

/// `value * percentage / 100`, saturating at `u64::MAX`.
pub const fn percent_of(value: u64, percentage: u32) -> u64 {
    let scaled = value as u128 * percentage as u128 / PERCENT_100 as u128;
    if scaled > u64::MAX as u128 {
        u64::MAX
    } else {
        scaled as u64
    }
}

/// Operator-facing tuning of one elastic resource.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ElasticResourceConfig {
    pub max_usage: u64,
    pub target_usage_pct: u32,
    pub average_window_ms: u32,
    pub max_multiplier: u32,
    pub contract_rate: Ratio<u64>,
    pub expand_rate: Ratio<u64>,
}

impl ElasticResourceConfig {
    fn with_chain_rates(max_usage: u64, target_usage_pct: u32, average_window_ms: u32) -> Self {
        let (contract_num, contract_den) = DEFAULT_CONTRACT_RATE;
        let (expand_num, expand_den) = DEFAULT_EXPAND_RATE;
        ElasticResourceConfig {
            max_usage,
            target_usage_pct,
            average_window_ms,
            max_multiplier: MAXIMUM_ELASTIC_RESOURCE_MULTIPLIER,
            contract_rate: make_ratio(contract_num, contract_den),
            expand_rate: make_ratio(expand_num, expand_den),
        }
    }

    pub fn cpu_defaults() -> Self {
        Self::with_chain_rates(
            DEFAULT_MAX_BLOCK_CPU_USAGE,
            DEFAULT_TARGET_BLOCK_CPU_USAGE_PCT,
            BLOCK_CPU_USAGE_AVERAGE_WINDOW_MS,
        )
    }

    pub fn net_defaults() -> Self {
        Self::with_chain_rates(
            DEFAULT_MAX_BLOCK_NET_USAGE,
            DEFAULT_TARGET_BLOCK_NET_USAGE_PCT,
            BLOCK_SIZE_AVERAGE_WINDOW_MS,
        )
    }

    /// Unvalidated conversion; a window shorter than one block yields zero periods.
    fn parameters(&self, block_interval_ms: u32) -> ElasticLimitParameters {
        ElasticLimitParameters::new(
            percent_of(self.max_usage, self.target_usage_pct),
            self.max_usage,
            slots(self.average_window_ms, block_interval_ms),
            self.max_multiplier,
            self.contract_rate,
            self.expand_rate,
        )
    }

    fn check(&self, resource: &str, block_interval_ms: u32) -> Result<(), ChainError> {
        chain_assert(
            self.target_usage_pct <= PERCENT_100,
            ChainError::GenesisError(format!(
                "{} target usage of {}% is above 100%",
                resource, self.target_usage_pct
            )),
        )?;
        check_window(resource, self.average_window_ms, block_interval_ms)
    }
}

/// A partially specified resource section, merged field by field over the
/// defaults of the resource it configures.
#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ElasticResourceOverrides {
    max_usage: Option<u64>,
    target_usage_pct: Option<u32>,
    average_window_ms: Option<u32>,
    max_multiplier: Option<u32>,
    contract_rate: Option<Ratio<u64>>,
    expand_rate: Option<Ratio<u64>>,
}

impl ElasticResourceOverrides {
    fn merge_over(self, defaults: ElasticResourceConfig) -> ElasticResourceConfig {
        ElasticResourceConfig {
            max_usage: self.max_usage.unwrap_or(defaults.max_usage),
            target_usage_pct: self.target_usage_pct.unwrap_or(defaults.target_usage_pct),
            average_window_ms: self.average_window_ms.unwrap_or(defaults.average_window_ms),
            max_multiplier: self.max_multiplier.unwrap_or(defaults.max_multiplier),
            contract_rate: self.contract_rate.unwrap_or(defaults.contract_rate),
            expand_rate: self.expand_rate.unwrap_or(defaults.expand_rate),
        }
    }
}

fn deserialize_cpu<'de, D>(deserializer: D) -> Result<ElasticResourceConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ElasticResourceOverrides::deserialize(deserializer)?
        .merge_over(ElasticResourceConfig::cpu_defaults()))
}

fn deserialize_net<'de, D>(deserializer: D) -> Result<ElasticResourceConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ElasticResourceOverrides::deserialize(deserializer)?
        .merge_over(ElasticResourceConfig::net_defaults()))
}

/// Resource accounting section of a genesis file. Missing fields, including
/// single fields of the `cpu` and `net` sections, fall back to the chain
/// defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GenesisResourceConfig {
    pub block_interval_ms: u32,
    #[serde(deserialize_with = "deserialize_cpu")]
    pub cpu: ElasticResourceConfig,
    #[serde(deserialize_with = "deserialize_net")]
    pub net: ElasticResourceConfig,
    pub account_cpu_usage_average_window_ms: u32,
    pub account_net_usage_average_window_ms: u32,
}

impl Default for GenesisResourceConfig {
    fn default() -> Self {
        GenesisResourceConfig {
            block_interval_ms: BLOCK_INTERVAL_MS,
            cpu: ElasticResourceConfig::cpu_defaults(),
            net: ElasticResourceConfig::net_defaults(),
            account_cpu_usage_average_window_ms: ACCOUNT_CPU_USAGE_AVERAGE_WINDOW_MS,
            account_net_usage_average_window_ms: ACCOUNT_NET_USAGE_AVERAGE_WINDOW_MS,
        }
    }
}

impl GenesisResourceConfig {
    pub fn parse(bytes: &[u8]) -> Result<Self, ChainError> {
        let genesis = str::from_utf8(bytes)
            .map_err(|_| ChainError::GenesisError("invalid UTF-8".to_string()))?;
        let genesis: GenesisResourceConfig = serde_json::from_str(genesis)
            .map_err(|e| ChainError::GenesisError(format!("{}", e)))?;
        Ok(genesis)
    }

    /// Converts millisecond windows into slot counts without validating.
    pub(crate) fn build(&self) -> ResourceLimitsConfig {
        ResourceLimitsConfig {
            cpu_limit_parameters: self.cpu.parameters(self.block_interval_ms),
            net_limit_parameters: self.net.parameters(self.block_interval_ms),
            account_cpu_usage_average_window: slots(
                self.account_cpu_usage_average_window_ms,
                self.block_interval_ms,
            ),
            account_net_usage_average_window: slots(
                self.account_net_usage_average_window_ms,
                self.block_interval_ms,
            ),
        }
    }

    /// Converts millisecond windows into slot counts and validates the result.
    pub fn to_resource_limits_config(&self) -> Result<ResourceLimitsConfig, ChainError> {
        chain_assert(
            self.block_interval_ms > 0,
            ChainError::GenesisError("block interval cannot be zero".to_owned()),
        )?;
        self.cpu.check("cpu", self.block_interval_ms)?;
        self.net.check("net", self.block_interval_ms)?;
        check_window(
            "account cpu",
            self.account_cpu_usage_average_window_ms,
            self.block_interval_ms,
        )?;
        check_window(
            "account net",
            self.account_net_usage_average_window_ms,
            self.block_interval_ms,
        )?;

        let config = self.build();
        config
            .validate()
            .map_err(|e| ChainError::GenesisError(format!("invalid resource config: {}", e)))?;
        Ok(config)
    }
}

fn slots(window_ms: u32, block_interval_ms: u32) -> u32 {
    window_ms.checked_div(block_interval_ms).unwrap_or(0)
}

fn check_window(what: &str, window_ms: u32, block_interval_ms: u32) -> Result<(), ChainError> {
    chain_assert(
        slots(window_ms, block_interval_ms) > 0,
        ChainError::GenesisError(format!(
            "{} window of {}ms is shorter than one {}ms block",
            what, window_ms, block_interval_ms
        )),
    )
}
