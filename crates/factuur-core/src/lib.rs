//! # factuur-core: Pure Business Logic for Factuur
//!
//! This crate is the **heart** of Factuur. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Factuur Architecture                          │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (axum)                          │   │
//! │  │   invoice CRUD ── PDF download ── email ── reports          │   │
//! │  └───────────────────────────┬─────────────────────────────────┘   │
//! │                              │                                       │
//! │  ┌───────────────────────────▼─────────────────────────────────┐   │
//! │  │              ★ factuur-core (THIS CRATE) ★                  │   │
//! │  │                                                             │   │
//! │  │  ┌────────┐ ┌────────┐ ┌──────────┐ ┌─────┐ ┌──────────┐  │   │
//! │  │  │ money  │ │ totals │ │numbering │ │ epc │ │  report  │  │   │
//! │  │  │ Money  │ │VAT calc│ │INV-.. fmt│ │ QR  │ │ windows, │  │   │
//! │  │  │ VatRate│ │subtotal│ │ sequence │ │text │ │  folds   │  │   │
//! │  │  └────────┘ └────────┘ └──────────┘ └─────┘ └──────────┘  │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │   │
//! │  └───────────────────────────┬─────────────────────────────────┘   │
//! │                              │                                       │
//! │  ┌───────────────────────────▼─────────────────────────────────┐   │
//! │  │                factuur-db (Database Layer)                   │   │
//! │  │          SQLite queries, migrations, repositories            │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Invoice, Payment, InvoiceItem)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`totals`] - Invoice subtotal/VAT/total calculator
//! - [`numbering`] - `INV-YYYYMM-NNNN` invoice number helpers
//! - [`epc`] - EPC QR payment payload encoder
//! - [`report`] - Report period math and statistics folds
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic - same input = same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are euro cents (i64) to avoid float errors
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod epc;
pub mod error;
pub mod money;
pub mod numbering;
pub mod report;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use factuur_core::Money` instead of
// `use factuur_core::money::Money`.

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use totals::{invoice_totals, InvoiceTotals, ItemInput, RawNumber};
pub use types::*;
