//! Conversions between `f64` scores and the `NUMERIC` columns that hold them.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::DbError;

/// Scores are stored with four decimal places.
const SCORE_SCALE: u32 = 4;

pub(crate) fn to_decimal(value: f64) -> Result<Decimal, DbError> {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(SCORE_SCALE))
        .ok_or(DbError::InvalidScore(value))
}

pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
