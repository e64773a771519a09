use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "AUD";
pub const DEFAULT_CURRENCY_CODE_LOWER: &str = "aud";

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount in integer cents. All invoice arithmetic happens in cents so that totals are exact;
/// conversion to a decimal string only happens at display time.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(pairwise Money: Add::add, Sub::sub);
op!(assign Money: SubAssign::sub_assign);
op!(scalar Money, i64: Mul::mul);
op!(negate Money);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}${}.{:02}", cents / 100, cents % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    /// Returns the given basis-point fraction of this amount, rounded half-up to the nearest cent.
    /// Used for percentage-based processing fee estimates.
    pub fn basis_points(&self, bps: i64) -> Self {
        let numerator = self.0 * bps;
        Self((numerator + 5_000 * numerator.signum()) / 10_000)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_money() {
        assert_eq!(Money::from_cents(123456).to_string(), "$1234.56");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-$2.50");
    }

    #[test]
    fn basis_point_rounding() {
        // 2.9% of $100.00 = $2.90
        assert_eq!(Money::from_cents(10_000).basis_points(290), Money::from_cents(290));
        // 2.6% of $33.33 = 86.658c, rounds to 87c
        assert_eq!(Money::from_cents(3_333).basis_points(260), Money::from_cents(87));
        // 2.9% of $0.17 = 0.493c, rounds to 0c
        assert_eq!(Money::from_cents(17).basis_points(290), Money::from_cents(0));
    }

    #[test]
    fn sums() {
        let total: Money = [100, 250, 399].into_iter().map(Money::from_cents).sum();
        assert_eq!(total, Money::from_cents(749));
    }
}
