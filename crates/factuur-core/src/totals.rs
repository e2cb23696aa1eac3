//! # Money/VAT Calculator
//!
//! Turns the raw line items of an invoice form into line totals, the
//! invoice subtotal, the VAT amount, and the grand total.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  per line:   total  = quantity × unit price                         │
//! │              vat    = round(total × rate / 100)                     │
//! │                                                                     │
//! │  invoice:    subtotal = Σ line totals                               │
//! │              vat      = Σ line vat                                  │
//! │              total    = subtotal + vat                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantity and unit price may arrive as JSON numbers *or* free text;
//! anything unparseable counts as zero. All accumulation is on integer
//! cents, so totals can never drift across many line items.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::VatRate;

// =============================================================================
// Raw Input
// =============================================================================

/// A numeric form value that may arrive as a JSON number or as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Interprets the value as a euro amount in cents. Invalid input is zero.
    pub fn as_cents(&self) -> i64 {
        match self {
            RawNumber::Number(n) if n.is_finite() => (n * 100.0).round() as i64,
            RawNumber::Number(_) => 0,
            RawNumber::Text(s) => Money::parse_lenient(s).cents(),
        }
    }

    /// Interprets the value as a non-negative whole quantity. Invalid or
    /// negative input is zero.
    pub fn as_quantity(&self) -> i64 {
        match self {
            RawNumber::Number(n) if n.is_finite() && *n >= 0.0 => n.trunc() as i64,
            RawNumber::Number(_) => 0,
            RawNumber::Text(s) => s.trim().parse::<i64>().ok().filter(|q| *q >= 0).unwrap_or(0),
        }
    }
}

impl Default for RawNumber {
    fn default() -> Self {
        RawNumber::Number(0.0)
    }
}

/// One line of an invoice create/update request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub description: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub quantity: RawNumber,
    #[serde(default)]
    pub unit_price: RawNumber,
    #[serde(default)]
    pub vat_rate: VatRate,
}

impl ItemInput {
    /// The parsed quantity (invalid input resolves to zero).
    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity.as_quantity()
    }

    /// The parsed unit price (invalid input resolves to zero).
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price.as_cents())
    }

    /// Line total: quantity × unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity())
    }

    /// VAT for this line at its own rate.
    #[inline]
    pub fn line_vat(&self) -> Money {
        self.line_total().vat(self.vat_rate)
    }
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Computed invoice totals, all in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal_cents: i64,
    pub vat_cents: i64,
    pub total_cents: i64,
}

impl InvoiceTotals {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn vat(&self) -> Money {
        Money::from_cents(self.vat_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Computes invoice totals from an ordered list of line items.
///
/// ## Example
/// ```rust
/// use factuur_core::totals::{invoice_totals, ItemInput, RawNumber};
/// use factuur_core::types::VatRate;
///
/// let items = vec![ItemInput {
///     description: "205/55 R16 winter tire".into(),
///     size: Some("205/55 R16".into()),
///     quantity: RawNumber::Number(4.0),
///     unit_price: RawNumber::Text("85.00".into()),
///     vat_rate: VatRate::Standard,
/// }];
///
/// let totals = invoice_totals(&items);
/// assert_eq!(totals.subtotal_cents, 34000); // 4 × €85.00
/// assert_eq!(totals.vat_cents, 7140);       // 21%
/// assert_eq!(totals.total_cents, 41140);
/// ```
pub fn invoice_totals(items: &[ItemInput]) -> InvoiceTotals {
    let subtotal: Money = items.iter().map(|i| i.line_total()).sum();
    let vat: Money = items.iter().map(|i| i.line_vat()).sum();

    InvoiceTotals {
        subtotal_cents: subtotal.cents(),
        vat_cents: vat.cents(),
        total_cents: (subtotal + vat).cents(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
