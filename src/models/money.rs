use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A non-negative amount of money stored as integer cents.
///
/// Serialized as a decimal string with exactly two fraction digits (`"100.00"`),
/// the form licenses are priced in by operators. Parsing goes through
/// `rust_decimal` and rejects anything above [`Money::MAX_PRICE`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyParseError {
    #[error("price is empty")]
    Empty,
    #[error("price must be a non-negative decimal number")]
    NotANumber,
    #[error("price may have at most 2 fraction digits")]
    TooPrecise,
    #[error("price may not exceed {}", Money::MAX_PRICE)]
    TooLarge,
}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest unit price accepted from input: 1,000,000.00.
    pub const MAX_PRICE: Money = Money(100_000_000);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_mul(self, rhs: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(rhs)).map(Money)
    }

    pub fn saturating_add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_mul(self, rhs: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(rhs)))
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let amount = Decimal::from_str(s).map_err(|_| MoneyParseError::NotANumber)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyParseError::NotANumber);
        }
        if amount.normalize().scale() > 2 {
            return Err(MoneyParseError::TooPrecise);
        }
        if amount > Money::MAX_PRICE.to_decimal() {
            return Err(MoneyParseError::TooLarge);
        }

        (amount * Decimal::ONE_HUNDRED)
            .to_i64()
            .map(Money)
            .ok_or(MoneyParseError::TooLarge)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Saturates rather than wrapping; a cart total can't overflow into a panic.
impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Money)
    }
}
