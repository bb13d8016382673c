mod usage_accumulator;
pub use usage_accumulator::*;

#[inline]
pub fn chain_assert<T>(condition: bool, error: T) -> Result<(), T> {
    if condition { Ok(()) } else { Err(error) }
}
