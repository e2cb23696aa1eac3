//! # Domain Types
//!
//! Core domain types used throughout Factuur.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐      │
//! │  │   Customer     │   │    Invoice     │   │    Payment     │      │
//! │  │  ────────────  │   │  ────────────  │   │  ────────────  │      │
//! │  │  id (UUID)     │◄──│  customer_id   │──►│  id (UUID)     │      │
//! │  │  type          │   │  payment_id    │   │  method        │      │
//! │  │  name, email   │   │  invoice_number│   │  amount_cents  │      │
//! │  │  vat_number    │   │  totals, status│   │  status        │      │
//! │  └────────────────┘   └───────┬────────┘   └────────────────┘      │
//! │                               │ 1..n                                │
//! │                       ┌───────┴────────┐                            │
//! │                       │  InvoiceItem   │                            │
//! │                       │  description   │                            │
//! │                       │  size, qty     │                            │
//! │                       │  price, VAT    │                            │
//! │                       └────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (`invoice_number`) - human-readable, unique
//!
//! Enum values serialize as uppercase text both in JSON and in SQLite,
//! matching the persisted shape (`PRIVATE`, `CASH`, `PAID`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate as a percentage, restricted to the Dutch/Belgian fixed set.
///
/// The set {0, 9, 21} is canonical; freeform rates are rejected at
/// deserialization so an invalid rate can never reach a calculation.
///
/// ## Example
/// ```rust
/// use factuur_core::types::VatRate;
///
/// assert_eq!(VatRate::Standard.percent(), 21);
/// assert_eq!(VatRate::try_from(9u8).unwrap(), VatRate::Reduced);
/// assert!(VatRate::try_from(19u8).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[serde(try_from = "u8", into = "u8")]
#[repr(i32)]
pub enum VatRate {
    /// 0% - exempt.
    Exempt = 0,
    /// 9% - reduced rate.
    Reduced = 9,
    /// 21% - standard rate.
    Standard = 21,
}

impl VatRate {
    /// The rate as an integer percentage.
    #[inline]
    pub const fn percent(&self) -> i64 {
        *self as i64
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::Standard
    }
}

impl TryFrom<u8> for VatRate {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VatRate::Exempt),
            9 => Ok(VatRate::Reduced),
            21 => Ok(VatRate::Standard),
            other => Err(format!("invalid VAT rate: {other}% (allowed: 0, 9, 21)")),
        }
    }
}

impl From<VatRate> for u8 {
    fn from(rate: VatRate) -> u8 {
        rate as u8
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Customer classification; VAT numbers are only meaningful for businesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomerType {
    Private,
    Business,
}

impl Default for CustomerType {
    fn default() -> Self {
        CustomerType::Private
    }
}

/// How the invoice was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on the shop terminal.
    Pin,
    /// Bank transfer / online payment.
    Online,
}

/// Payment record status. This system only ever writes `Paid`; the other
/// variants exist because the persisted shape allows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Failed,
}

/// Whether the invoice has been settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer. Created on the first invoice for a new email address, or
/// reused by lookup; shared across that customer's invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// PRIVATE or BUSINESS.
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub customer_type: CustomerType,

    /// Display name shown on the invoice.
    pub name: String,

    /// Optional email, used for invoice delivery and form prefill.
    pub email: Option<String>,

    /// Optional postal address.
    pub address: Option<String>,

    /// VAT number; only stored for BUSINESS customers.
    pub vat_number: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment record, one-to-one with an invoice.
///
/// The payment row is created *before* its invoice so the invoice can
/// reference it; a failed invoice creation must delete it again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub customer_id: String,
    /// Amount settled, in cents.
    pub amount_total_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the settled amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_total_cents)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An issued invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,

    /// Business identifier, format `INV-YYYYMM-NNNN`, unique, immutable.
    pub invoice_number: String,

    pub customer_id: String,
    pub payment_id: String,

    /// Vehicle metadata (domain-specific optional fields).
    pub license_plate: Option<String>,
    pub mileage: Option<i64>,
    pub vehicle_model: Option<String>,

    /// Sum of line totals, in cents.
    pub subtotal_cents: i64,
    /// Sum of per-line VAT, in cents.
    pub vat_cents: i64,
    /// subtotal + VAT, in cents.
    pub total_cents: i64,

    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn vat_amount(&self) -> Money {
        Money::from_cents(self.vat_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Invoice Item
// =============================================================================

/// A line on an invoice. Owned exclusively by one invoice; replaced
/// wholesale on every update and deleted with the invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    /// Free text, e.g. "Montage" or a tire brand/model.
    pub description: String,
    /// Free text tire dimension, e.g. "205/55 R16".
    pub size: Option<String>,
    /// Non-negative quantity.
    pub quantity: i64,
    /// Unit price in cents.
    pub unit_price_cents: i64,
    pub vat_rate: VatRate,
    /// quantity × unit price, in cents.
    pub total_cents: i64,
    /// Insertion order, relevant for display.
    pub position: i64,
}

impl InvoiceItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Invoice With Relations
// =============================================================================

/// A fully-populated invoice: the projection returned by create/get/list
/// and consumed by the PDF and email renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceWithRelations {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub customer: Customer,
    pub payment: Payment,
    /// Ordered by insertion position.
    pub items: Vec<InvoiceItem>,
}

impl InvoiceWithRelations {
    /// How this invoice was settled.
    #[inline]
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment.method
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vat_rate_fixed_set() {
        assert_eq!(VatRate::try_from(0u8).unwrap(), VatRate::Exempt);
        assert_eq!(VatRate::try_from(9u8).unwrap(), VatRate::Reduced);
        assert_eq!(VatRate::try_from(21u8).unwrap(), VatRate::Standard);
        assert!(VatRate::try_from(19u8).is_err());
        assert!(VatRate::try_from(6u8).is_err());
    }

    #[test]
    fn test_vat_rate_serde_as_number() {
        let json = serde_json::to_string(&VatRate::Standard).unwrap();
        assert_eq!(json, "21");

        let rate: VatRate = serde_json::from_str("9").unwrap();
        assert_eq!(rate, VatRate::Reduced);

        assert!(serde_json::from_str::<VatRate>("15").is_err());
    }

    #[test]
    fn test_enums_serialize_uppercase() {
        assert_eq!(
            serde_json::to_string(&CustomerType::Business).unwrap(),
            "\"BUSINESS\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Pin).unwrap(),
            "\"PIN\""
        );
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Unpaid).unwrap(),
            "\"UNPAID\""
        );
    }
}
