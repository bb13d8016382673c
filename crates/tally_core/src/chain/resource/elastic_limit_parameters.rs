use serde::{Deserialize, Serialize};
use tally_error::ChainError;
use tally_proc_macros::{NumBytes, Read, Write};

use crate::chain::utils::{Ratio, UsageAccumulator, chain_assert};

/// Tuning of one elastic block-wide resource.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Read, Write, NumBytes, Serialize, Deserialize,
)]
pub struct ElasticLimitParameters {
    /// Block average at or above which the resource counts as congested.
    pub target: u64,
    /// Hard per-block ceiling, and the floor of the virtual limit.
    pub max: u64,
    /// Window of the block usage average, in slots.
    pub periods: u32,
    pub max_multiplier: u32,
    pub contract_rate: Ratio<u64>,
    pub expand_rate: Ratio<u64>,
}

impl ElasticLimitParameters {
    pub fn new(
        target: u64,
        max: u64,
        periods: u32,
        max_multiplier: u32,
        contract_rate: Ratio<u64>,
        expand_rate: Ratio<u64>,
    ) -> Self {
        ElasticLimitParameters {
            target,
            max,
            periods,
            max_multiplier,
            contract_rate,
            expand_rate,
        }
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        chain_assert(
            self.periods > 0,
            ChainError::InvalidArgument(
                "elastic limit parameter 'periods' cannot be zero".to_owned(),
            ),
        )?;
        chain_assert(
            self.contract_rate.denominator > 0,
            ChainError::InvalidArgument(
                "elastic limit parameter 'contract_rate' is not a well-defined ratio".to_owned(),
            ),
        )?;
        chain_assert(
            self.expand_rate.denominator > 0,
            ChainError::InvalidArgument(
                "elastic limit parameter 'expand_rate' is not a well-defined ratio".to_owned(),
            ),
        )?;
        chain_assert(
            self.max_multiplier > 0,
            ChainError::InvalidArgument(
                "elastic limit parameter 'max_multiplier' cannot be zero".to_owned(),
            ),
        )?;
        chain_assert(
            self.target <= self.max,
            ChainError::InvalidArgument(format!(
                "elastic limit target {} exceeds max {}",
                self.target, self.max
            )),
        )?;
        self.ceiling().map(|_| ())
    }

    /// Upper bound of the virtual limit.
    pub fn ceiling(&self) -> Result<u64, ChainError> {
        self.max
            .checked_mul(self.max_multiplier as u64)
            .ok_or_else(|| {
                ChainError::InvalidArgument(format!(
                    "elastic limit ceiling {} * {} overflows",
                    self.max, self.max_multiplier
                ))
            })
    }

    /// Next virtual limit given the current block average.
    pub fn update_elastic_limit(&self, current_limit: u64, average_usage: u64) -> Result<u64, ChainError> {
        if average_usage >= self.target {
            Ok((current_limit * self.contract_rate)?.max(self.max))
        } else {
            Ok((current_limit * self.expand_rate)?.min(self.ceiling()?))
        }
    }

    /// Feeds one block's usage into the block average and moves the virtual
    /// limit accordingly. Returns the new virtual limit.
    pub fn advance(
        &self,
        average: &mut UsageAccumulator,
        virtual_limit: u64,
        block_usage: u64,
        slot: u32,
    ) -> Result<u64, ChainError> {
        let average_usage = average.add(block_usage, slot, self.periods)?;
        self.update_elastic_limit(virtual_limit, average_usage)
    }

    pub fn is_congested(&self, average_usage: u64) -> bool {
        average_usage >= self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::utils::make_ratio;

    fn params() -> ElasticLimitParameters {
        ElasticLimitParameters::new(
            100,
            1000,
            10,
            1000,
            make_ratio(99, 100),
            make_ratio(1000, 999),
        )
    }

    #[test]
    fn test_validate() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.periods = 0;
        assert!(matches!(p.validate(), Err(ChainError::InvalidArgument(_))));

        let mut p = params();
        p.contract_rate = make_ratio(99, 0);
        assert!(p.validate().is_err());

        let mut p = params();
        p.expand_rate = make_ratio(1000, 0);
        assert!(p.validate().is_err());

        let mut p = params();
        p.max_multiplier = 0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.target = 1001;
        assert!(p.validate().is_err());

        let mut p = params();
        p.max = u64::MAX;
        p.target = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_relax_is_capped() {
        let p = params();
        assert_eq!(p.update_elastic_limit(1000, 0).unwrap(), 1001);
        assert_eq!(p.update_elastic_limit(999_999, 99).unwrap(), 1_000_000);
        assert_eq!(p.update_elastic_limit(1_000_000, 0).unwrap(), 1_000_000);
    }

    #[test]
    fn test_contract_is_floored() {
        let p = params();
        assert_eq!(p.update_elastic_limit(2000, 100).unwrap(), 1980);
        assert_eq!(p.update_elastic_limit(1005, 500).unwrap(), 1000);
        assert_eq!(p.update_elastic_limit(1000, 100).unwrap(), 1000);
    }

    #[test]
    fn test_advance_feeds_average() {
        let p = params();
        let mut average = UsageAccumulator::default();
        let limit = p.advance(&mut average, 1000, 0, 1).unwrap();
        assert_eq!(limit, 1001);
        assert_eq!(average.average(), 0);

        // 1000 / 10 lands exactly on the target
        let limit = p.advance(&mut average, limit, 1000, 2).unwrap();
        assert_eq!(average.average(), 100);
        assert!(p.is_congested(average.average()));
        assert_eq!(limit, 1000);
    }
}
