//! Chain-wide defaults for resource accounting. Every validator must agree on
//! these, so they only change together with a network upgrade.

pub const BLOCK_INTERVAL_MS: u32 = 500;

pub const PERCENT_100: u32 = 100;

pub const ACCOUNT_CPU_USAGE_AVERAGE_WINDOW_MS: u32 = 24 * 60 * 60 * 1000;
pub const ACCOUNT_NET_USAGE_AVERAGE_WINDOW_MS: u32 = 24 * 60 * 60 * 1000;
pub const BLOCK_CPU_USAGE_AVERAGE_WINDOW_MS: u32 = 60 * 1000;
pub const BLOCK_SIZE_AVERAGE_WINDOW_MS: u32 = 60 * 1000;

pub const MAXIMUM_ELASTIC_RESOURCE_MULTIPLIER: u32 = 1000;

pub const DEFAULT_MAX_BLOCK_NET_USAGE: u64 = 1024 * 1024;
pub const DEFAULT_TARGET_BLOCK_NET_USAGE_PCT: u32 = 10;

pub const DEFAULT_MAX_BLOCK_CPU_USAGE: u64 = 200_000;
pub const DEFAULT_TARGET_BLOCK_CPU_USAGE_PCT: u32 = 10;

pub const DEFAULT_CONTRACT_RATE: (u64, u64) = (99, 100);
pub const DEFAULT_EXPAND_RATE: (u64, u64) = (1000, 999);
