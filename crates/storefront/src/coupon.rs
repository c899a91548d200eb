//! Coupon evaluation.
//!
//! A pure lookup: no store access, no side effects. An unknown code is not
//! an error, it simply grants no discount.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::{Result, ValidationError};

/// The coupon rule table.
///
/// Codes compare case-insensitively with surrounding whitespace ignored.
/// The table can grow to any number of codes and tiers without changing the
/// caller contract.
#[derive(Debug, Clone)]
pub struct CouponBook {
    /// Keyed by uppercased code.
    rates: HashMap<String, Decimal>,
}

impl CouponBook {
    /// Create an empty table (every code evaluates to zero).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    /// Build a table from `(code, rate)` rules, e.g. the configured
    /// `coupon_rules`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any rate is outside `[0, 1)`.
    pub fn from_rules<I, S>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let mut book = Self::empty();
        for (code, rate) in rules {
            book.insert(code.as_ref(), rate)?;
        }
        Ok(book)
    }

    /// Add or replace one rule.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the rate is outside `[0, 1)`.
    pub fn insert(&mut self, code: &str, rate: Decimal) -> Result<()> {
        if rate.is_sign_negative() || rate >= Decimal::ONE {
            return Err(ValidationError::InvalidCouponRate.into());
        }
        self.rates
            .insert(code.trim().to_uppercase(), rate);
        Ok(())
    }

    /// The discount rate for a code: trimmed, case-insensitive, zero for
    /// anything the table does not know.
    #[must_use]
    pub fn evaluate(&self, code: &str) -> Decimal {
        self.rates
            .get(&code.trim().to_uppercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for CouponBook {
    /// The standard table: `SAVE10` grants 10% off.
    fn default() -> Self {
        let mut book = Self::empty();
        // Rate is statically in range
        let _ = book.insert("SAVE10", Decimal::new(10, 2));
        book
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_known_code() {
        let book = CouponBook::default();
        assert_eq!(book.evaluate("SAVE10"), dec!(0.10));
    }

    #[test]
    fn test_unknown_code_is_zero_not_error() {
        let book = CouponBook::default();
        assert_eq!(book.evaluate("bogus"), Decimal::ZERO);
        assert_eq!(book.evaluate(""), Decimal::ZERO);
    }

    #[test]
    fn test_trim_and_case_insensitive() {
        let book = CouponBook::default();
        assert_eq!(book.evaluate(" save10 "), dec!(0.10));
        assert_eq!(book.evaluate("Save10"), dec!(0.10));
    }

    #[test]
    fn test_evaluate_is_pure() {
        let book = CouponBook::default();
        assert_eq!(book.evaluate("SAVE10"), book.evaluate("SAVE10"));
        assert_eq!(book.evaluate("bogus"), book.evaluate("bogus"));
    }

    #[test]
    fn test_table_is_extensible() {
        let book = CouponBook::from_rules(vec![
            ("SAVE10".to_owned(), dec!(0.10)),
            ("WELCOME5".to_owned(), dec!(0.05)),
        ])
        .unwrap();
        assert_eq!(book.evaluate("welcome5"), dec!(0.05));
        assert_eq!(book.evaluate("SAVE10"), dec!(0.10));
    }

    #[test]
    fn test_insert_rejects_out_of_range_rate() {
        let mut book = CouponBook::empty();
        assert!(book.insert("FREE", dec!(1)).is_err());
        assert!(book.insert("NEG", dec!(-0.1)).is_err());
        assert!(book.insert("OK", dec!(0)).is_ok());
    }
}
