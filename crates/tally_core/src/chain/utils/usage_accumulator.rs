use std::ops::{Add, Div, Mul, Rem};

use serde::{Deserialize, Serialize};
use tally_error::ChainError;
use tally_proc_macros::{NumBytes, Read, Write};

use crate::chain::utils::chain_assert;

#[derive(
    Debug, Clone, Copy, PartialEq, Read, Write, NumBytes, Default, Eq, Hash, Serialize, Deserialize,
)]
pub struct Ratio<T> {
    pub numerator: T,
    pub denominator: T,
}

pub fn make_ratio<T>(n: T, d: T) -> Ratio<T> {
    Ratio {
        numerator: n,
        denominator: d,
    }
}

/// `self * numerator / denominator`, truncating, with the product taken in
/// 128 bits so only the final quotient has to fit.
impl Mul<Ratio<u64>> for u64 {
    type Output = Result<u64, ChainError>;

    fn mul(self, r: Ratio<u64>) -> Self::Output {
        chain_assert(
            r.denominator > 0,
            ChainError::InvalidArgument("ratio denominator cannot be zero".to_owned()),
        )?;
        let product = self as u128 * r.numerator as u128 / r.denominator as u128;
        u64::try_from(product).map_err(|_| {
            ChainError::InvalidArgument(format!(
                "{} * {}/{} does not fit in 64 bits",
                self, r.numerator, r.denominator
            ))
        })
    }
}

/// Exponential moving average over discrete slots.
///
/// Each elapsed slot applies `avg = avg * (window - 1) / window` with
/// truncation; units charged in a slot contribute `units / window`.
#[derive(Debug, Clone, Copy, NumBytes, Read, Write, Default, PartialEq, Eq, Hash)]
pub struct UsageAccumulator {
    pub last_ordinal: u32, //< The slot of the last period which has contributed to the average
    pub value: u64,        //< The current average
    pub consumed: u64,     //< The average carried into `last_ordinal` plus everything charged during it
}

impl UsageAccumulator {
    pub fn average(&self) -> u64 {
        self.value
    }

    /// Folds `units` into the average at `ordinal` and returns the new average.
    pub fn add(&mut self, units: u64, ordinal: u32, window_size: u32) -> Result<u64, ChainError> {
        // check for numerical limits before doing any state mutations
        chain_assert(
            window_size > 0,
            ChainError::InvalidArgument("usage average window cannot be zero".to_owned()),
        )?;
        chain_assert(
            ordinal >= self.last_ordinal,
            ChainError::InvariantViolation(format!(
                "new ordinal {} cannot be less than the previous ordinal {}",
                ordinal, self.last_ordinal
            )),
        )?;

        let (mut value, mut consumed) = (self.value, self.consumed);
        if ordinal > self.last_ordinal {
            value = decay(value, (ordinal - self.last_ordinal) as u64, window_size as u64);
            consumed = value;
        }

        let consumed = consumed.checked_add(units).ok_or_else(|| {
            ChainError::InvalidArgument("overflow in tracked usage when adding usage".to_owned())
        })?;
        let value = value
            .checked_add(units / window_size as u64)
            .ok_or_else(|| {
                ChainError::InvalidArgument(
                    "overflow in accumulated value when adding usage".to_owned(),
                )
            })?;

        self.last_ordinal = ordinal;
        self.value = value;
        self.consumed = consumed;
        Ok(value)
    }
}

/// Applies `periods` idle decay steps of `value * (window - 1) / window`.
///
/// One step subtracts `ceil(value / window)`. That amount stays fixed while
/// `value` remains above `(step - 1) * window`, so each such run is applied
/// with a single multiplication. The result is identical to iterating the
/// one-period formula `periods` times.
pub fn decay(mut value: u64, mut periods: u64, window: u64) -> u64 {
    if window <= 1 {
        return if periods > 0 { 0 } else { value };
    }
    while periods > 0 && value > 0 {
        let step = integer_divide_ceil(value, window);
        let floor = (step - 1) * window;
        let run = integer_divide_ceil(value - floor, step).min(periods);
        value -= run * step;
        periods -= run;
    }
    value
}

pub fn integer_divide_ceil<T>(num: T, den: T) -> T
where
    T: Copy + PartialOrd + Div<Output = T> + Rem<Output = T> + Add<Output = T> + From<u8>,
{
    let div = num / den;
    let rem = num % den;
    if rem > T::from(0) {
        div + T::from(1)
    } else {
        div
    }
}
