//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In binary floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  An invoice with dozens of line items accumulates that error.       │
//! │                                                                     │
//! │  OUR SOLUTION: Integer Cents                                        │
//! │    €10.00 is 1000 cents. Addition is exact, always.                 │
//! │    Rounding happens in exactly one place (per-line VAT), and it     │
//! │    is explicit.                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use factuur_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // €10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;                     // €21.98
//! let total = price + Money::from_cents(500);  // €15.99
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::VatRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in euro cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: leaves room for corrections/credit amounts
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use factuur_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // €10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (euros) portion.
    #[inline]
    pub const fn euros(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parses a lenient user-supplied amount into Money.
    ///
    /// Form fields arrive as free text; the calculator treats anything
    /// unparseable (or empty) as zero rather than failing the whole invoice.
    /// Both `.` and `,` are accepted as the decimal separator; at most two
    /// fraction digits are significant.
    ///
    /// ## Example
    /// ```rust
    /// use factuur_core::money::Money;
    ///
    /// assert_eq!(Money::parse_lenient("12.50").cents(), 1250);
    /// assert_eq!(Money::parse_lenient("12,5").cents(), 1250);
    /// assert_eq!(Money::parse_lenient("80").cents(), 8000);
    /// assert_eq!(Money::parse_lenient("").cents(), 0);
    /// assert_eq!(Money::parse_lenient("abc").cents(), 0);
    /// ```
    pub fn parse_lenient(text: &str) -> Money {
        let cleaned = text.trim().replace(',', ".");
        if cleaned.is_empty() {
            return Money::zero();
        }

        let (negative, unsigned) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };

        let mut parts = unsigned.splitn(2, '.');
        let major_str = parts.next().unwrap_or("");
        let fraction_str = parts.next().unwrap_or("");

        let major: i64 = if major_str.is_empty() {
            0
        } else {
            match major_str.parse() {
                Ok(v) => v,
                Err(_) => return Money::zero(),
            }
        };

        // Normalize the fraction to exactly two digits: "5" -> 50, "505" -> 50.
        let mut fraction: i64 = 0;
        if !fraction_str.is_empty() {
            let digits: String = fraction_str.chars().take(2).collect();
            if !digits.chars().all(|c| c.is_ascii_digit()) {
                return Money::zero();
            }
            fraction = digits.parse().unwrap_or(0);
            if digits.len() == 1 {
                fraction *= 10;
            }
        }

        let cents = major.saturating_mul(100).saturating_add(fraction);
        Money(if negative { cents.saturating_neg() } else { cents })
    }

    /// Formats the amount with exactly two decimal places and no symbol.
    ///
    /// This rendering is part of the EPC payment payload contract and must
    /// stay bit-exact (`123.40`, never `123.4`).
    ///
    /// ## Example
    /// ```rust
    /// use factuur_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(12340).format_plain(), "123.40");
    /// assert_eq!(Money::from_cents(-550).format_plain(), "-5.50");
    /// ```
    pub fn format_plain(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.euros().abs(), self.cents_part())
    }

    /// Calculates the VAT amount for this value at the given rate.
    ///
    /// Uses integer math with round-half-up on the final division:
    /// `(cents * pct + 50) / 100`, widened to i128 so large invoices
    /// cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use factuur_core::money::Money;
    /// use factuur_core::types::VatRate;
    ///
    /// let line = Money::from_cents(10000); // €100.00
    /// assert_eq!(line.vat(VatRate::Standard).cents(), 2100); // 21%
    /// assert_eq!(line.vat(VatRate::Reduced).cents(), 900);   // 9%
    /// assert_eq!(line.vat(VatRate::Exempt).cents(), 0);
    /// ```
    pub fn vat(&self, rate: VatRate) -> Money {
        let vat_cents = (self.0 as i128 * rate.percent() as i128 + 50) / 100;
        Money::from_cents(clamp_cents(vat_cents))
    }

    /// Multiplies money by a quantity.
    ///
    /// The product is computed in i128 and clamped to the i64 range, so an
    /// absurd quantity saturates instead of wrapping or panicking.
    ///
    /// ## Example
    /// ```rust
    /// use factuur_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(8500); // one tire, €85.00
    /// assert_eq!(unit_price.multiply_quantity(4).cents(), 34000);
    /// assert_eq!(
    ///     Money::from_cents(10000).multiply_quantity(i64::MAX).cents(),
    ///     i64::MAX
    /// );
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(clamp_cents(self.0 as i128 * qty as i128))
    }
}

/// Clamps a widened intermediate back into the i64 cent range.
const fn clamp_cents(wide: i128) -> i64 {
    if wide > i64::MAX as i128 {
        i64::MAX
    } else if wide < i64::MIN as i128 {
        i64::MIN
    } else {
        wide as i64
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with the euro sign, for logs and debugging.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}€{}.{:02}", sign, self.euros().abs(), self.cents_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// All arithmetic saturates at the i64 bounds. Totals fed from user input
// must never panic or wrap, whatever the quantities are.

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
