//! Request and response bodies of the HTTP API.
//!
//! Everything is camelCase on the wire. The invoice create and update
//! requests share one shape; the update handler simply ignores `customerId`
//! in favor of the invoice's existing customer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use factuur_core::report::{PeriodWindow, ReportStats, SizeCount};
use factuur_core::totals::ItemInput;
use factuur_core::types::{
    Customer, CustomerType, InvoiceStatus, InvoiceWithRelations, PaymentMethod,
};

// =============================================================================
// Invoices
// =============================================================================

/// Body of `POST /api/invoices` and `PUT /api/invoices/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInput {
    /// Reuse an existing customer instead of creating one.
    #[serde(default)]
    pub customer_id: Option<String>,

    #[serde(default)]
    pub customer_type: CustomerType,
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    /// Only stored for BUSINESS customers.
    #[serde(default)]
    pub customer_vat_number: Option<String>,

    pub payment_method: PaymentMethod,
    pub status: InvoiceStatus,

    pub items: Vec<ItemInput>,

    #[serde(default)]
    pub license_plate: Option<String>,
    #[serde(default)]
    pub mileage: Option<i64>,
    #[serde(default)]
    pub vehicle_model: Option<String>,
}

/// Body of `DELETE /api/invoices/{id}`; `deleted: false` means not found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

// =============================================================================
// Email
// =============================================================================

/// Body of `POST /api/invoices/{id}/email`. Both fields default: the
/// recipient to the invoice's customer email, the subject to
/// `Factuur <number>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailResponse {
    pub success: bool,
    pub message_id: String,
}

// =============================================================================
// Customers
// =============================================================================

/// Result of `GET /api/customers/lookup?email=`: the matched customer plus
/// vehicle metadata from their most recent invoice, for form prefill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLookup {
    pub customer: Customer,
    pub license_plate: Option<String>,
    pub mileage: Option<i64>,
    pub vehicle_model: Option<String>,
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ReportQuery {
    pub period: String,
    /// Anchor date `YYYY-MM-DD`; defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Result of `GET /api/reports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(flatten)]
    pub window: PeriodWindow,
    pub stats: ReportStats,
    pub invoices: Vec<InvoiceWithRelations>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopSizesQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopSizesResponse {
    pub sizes: Vec<SizeCount>,
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub timestamp: DateTime<Utc>,
}
