//! Type-safe price representation using decimal arithmetic.
//!
//! Monetary amounts are carried as [`rust_decimal::Decimal`] in the
//! currency's smallest accounted unit (whole dong for VND). All rounding is
//! owned by the remote API; this type only combines amounts it was given.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's smallest accounted unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A price of zero in the given currency.
    #[must_use]
    pub fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// A whole-dong VND price.
    #[must_use]
    pub fn vnd(amount: i64) -> Self {
        Self::new(Decimal::from(amount), CurrencyCode::VND)
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Multiply by a quantity (line total = unit price × quantity).
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Add another price. Amounts are assumed to share a currency; the
    /// left-hand currency is kept.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        debug_assert_eq!(self.currency_code, other.currency_code);
        Self::new(self.amount + other.amount, self.currency_code)
    }

    /// Subtract another price. Amounts are assumed to share a currency; the
    /// left-hand currency is kept.
    #[must_use]
    pub fn minus(self, other: Self) -> Self {
        debug_assert_eq!(self.currency_code, other.currency_code);
        Self::new(self.amount - other.amount, self.currency_code)
    }

    /// The given percentage of this price (e.g. a voucher discount).
    #[must_use]
    pub fn percent(self, pct: Decimal) -> Self {
        Self::new(self.amount * pct / Decimal::from(100), self.currency_code)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency_code.code())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    VND,
    USD,
    EUR,
}

impl CurrencyCode {
    /// The ISO 4217 code as a string.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::VND => "VND",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let unit = Price::vnd(50_000);
        assert_eq!(unit.times(3), Price::vnd(150_000));
    }

    #[test]
    fn test_percent_discount() {
        let subtotal = Price::vnd(200_000);
        assert_eq!(subtotal.percent(Decimal::from(10)), Price::vnd(20_000));
    }

    #[test]
    fn test_plus_minus() {
        let total = Price::vnd(200_000)
            .plus(Price::vnd(30_000))
            .minus(Price::vnd(20_000));
        assert_eq!(total, Price::vnd(210_000));
    }

    #[test]
    fn test_zero() {
        assert!(Price::zero(CurrencyCode::VND).is_zero());
        assert!(!Price::vnd(1).is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::vnd(30_000).to_string(), "30000 VND");
    }
}
