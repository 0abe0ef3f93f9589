//! Value Objects for the storefront core

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_CURRENCY: &str = "BRL";

/// Brazilian postal code (CEP), always stored as exactly 8 digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cep(String);

impl Cep {
    /// Strips punctuation ("74110-100" -> "74110100") and requires 8 digits.
    pub fn new(value: impl AsRef<str>) -> Result<Self, CepError> {
        let digits: String = value.as_ref().chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 8 { return Err(CepError::WrongLength(digits.len())); }
        Ok(Self(digits))
    }
    pub fn as_str(&self) -> &str { &self.0 }

    /// "74110100" -> "74110-100"
    pub fn formatted(&self) -> String { format!("{}-{}", &self.0[..5], &self.0[5..]) }
}

impl fmt::Display for Cep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CepError {
    #[error("postal code must have 8 digits, got {0}")]
    WrongLength(usize),
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn brl(amount: Decimal) -> Self { Self::new(amount, DEFAULT_CURRENCY) }
    /// Whole reais, e.g. `Money::reais(2599)`.
    pub fn reais(amount: i64) -> Self { Self::brl(Decimal::from(amount)) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_positive(&self) -> bool { self.amount > Decimal::ZERO }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() });
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Scales by `rate` and rounds half away from zero to cents.
    pub fn scale(&self, rate: Decimal) -> Money {
        let scaled = (self.amount * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Money::new(scaled, &self.currency)
    }

    pub fn sum<'a>(currency: &str, items: impl IntoIterator<Item = &'a Money>) -> Result<Money, MoneyError> {
        items.into_iter().try_fold(Money::zero(currency), |acc, m| acc.add(m))
    }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.currency.as_str() {
            "BRL" => write!(f, "R$ {:.2}", self.amount),
            other => write!(f, "{other} {:.2}", self.amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

/// Line quantity, between 1 and [`Quantity::MAX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);
    pub const MAX: Quantity = Quantity(99);

    /// Clamps into `1..=MAX`; negatives become 1.
    pub fn clamped(requested: i64) -> Self {
        Self(u32::try_from(requested.clamp(1, i64::from(Self::MAX.0))).unwrap_or(Self::MAX.0))
    }
    pub fn value(&self) -> u32 { self.0 }
    /// Stops at `MAX`.
    pub fn increment(&self) -> Self { Self((self.0 + 1).min(Self::MAX.0)) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Err(QuantityError::Zero),
            v if v > Self::MAX.0 => Err(QuantityError::TooLarge(v)),
            v => Ok(Self(v)),
        }
    }
}

impl From<Quantity> for u32 { fn from(q: Quantity) -> u32 { q.0 } }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity must be at least 1")]
    Zero,
    #[error("quantity {0} exceeds the per-line limit")]
    TooLarge(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cep() {
        let cep = Cep::new("74110-100").unwrap();
        assert_eq!(cep.as_str(), "74110100");
        assert_eq!(cep.formatted(), "74110-100");
        assert_eq!(Cep::new("7411"), Err(CepError::WrongLength(4)));
    }

    #[test]
    fn test_money_add() {
        let a = Money::reais(100);
        let b = Money::reais(50);
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::new(Decimal::ONE, "USD")).is_err());
    }

    #[test]
    fn test_money_scale_rounds_to_cents() {
        let m = Money::brl(Decimal::new(99999, 2)); // 999.99
        assert_eq!(m.scale(Decimal::new(95, 2)).amount(), Decimal::new(94999, 2));
        assert_eq!(Money::reais(1000).scale(Decimal::new(95, 2)).amount(), Decimal::new(95000, 2));
    }

    #[test]
    fn test_quantity_clamps() {
        assert_eq!(Quantity::clamped(0).value(), 1);
        assert_eq!(Quantity::clamped(-7).value(), 1);
        assert_eq!(Quantity::clamped(3).value(), 3);
        assert!(Quantity::try_from(0).is_err());
        assert_eq!(Quantity::clamped(99_999_999_999), Quantity::MAX);
        assert_eq!(Quantity::MAX.increment(), Quantity::MAX);
        assert_eq!(Quantity::try_from(100), Err(QuantityError::TooLarge(100)));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::reais(2599).to_string(), "R$ 2599.00");
    }
}
