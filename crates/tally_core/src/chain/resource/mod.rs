mod account_resource_limit;
pub use account_resource_limit::AccountResourceLimit;

mod elastic_limit_parameters;
pub use elastic_limit_parameters::ElasticLimitParameters;

mod limit;
pub use limit::Limit;

mod resource_kind;
pub use resource_kind::ResourceKind;

mod resource_limits;
pub use resource_limits::{AccountLimits, ResourceLimits};

mod resource_limits_config;
pub use resource_limits_config::ResourceLimitsConfig;

mod resource_limits_state;
pub use resource_limits_state::ResourceLimitsState;

mod resource_usage;
pub use resource_usage::ResourceUsage;
