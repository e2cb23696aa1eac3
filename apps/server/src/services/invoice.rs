//! Invoice lifecycle orchestration.
//!
//! ## Create Flow
//! ```text
//! validate ──► totals ──► resolve/create customer ──► create payment
//!                                                          │
//!                       ┌──────────────────────────────────┘
//!                       ▼
//!              allocate number + insert (≤ 3 attempts, jittered)
//!                       │
//!            success ───┴─── failure of any kind
//!               │                    │
//!               ▼                    ▼
//!        return invoice     delete the payment, surface the error
//! ```
//!
//! The number allocator reads the month's latest persisted number, computes
//! latest+1 and attempts the insert. Two concurrent creations can race for
//! the same number; only a unique violation on `invoices.invoice_number` is
//! retried, everything else fails immediately.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use factuur_core::numbering::{self, MAX_ALLOCATION_ATTEMPTS};
use factuur_core::totals::{invoice_totals, InvoiceTotals};
use factuur_core::types::{
    Customer, CustomerType, Invoice, InvoiceItem, InvoiceWithRelations, Payment, PaymentStatus,
};
use factuur_core::{validation, CoreError};
use factuur_db::Database;

use crate::dto::{CustomerLookup, InvoiceInput};
use crate::error::{ApiError, ApiResult};

/// Orchestrates invoice create/update/delete/list/get and customer lookup.
#[derive(Debug, Clone)]
pub struct InvoiceService {
    db: Database,
}

impl InvoiceService {
    pub fn new(db: Database) -> Self {
        InvoiceService { db }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates an invoice: validates, computes totals, resolves the customer,
    /// pre-creates the payment and allocates a unique invoice number with
    /// bounded retry. Any failure after the payment was written deletes it
    /// again so no orphaned payment survives.
    pub async fn create(&self, input: InvoiceInput) -> ApiResult<InvoiceWithRelations> {
        validation::validate_customer_name(&input.customer_name).map_err(CoreError::from)?;
        validation::validate_items(&input.items).map_err(CoreError::from)?;

        let totals = invoice_totals(&input.items);
        let now = Utc::now();

        let customer = self.resolve_customer(&input, now).await?;

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            amount_total_cents: totals.total_cents,
            method: input.payment_method,
            status: PaymentStatus::Paid,
            paid_at: now,
            created_at: now,
        };
        self.db.invoices().insert_payment(&payment).await?;

        match self
            .insert_numbered(&input, &totals, &customer, &payment, now)
            .await
        {
            Ok(full) => {
                info!(
                    number = %full.invoice.invoice_number,
                    total_cents = full.invoice.total_cents,
                    "Invoice created"
                );
                Ok(full)
            }
            Err(err) => {
                self.rollback_payment(&payment.id).await;
                Err(err)
            }
        }
    }

    /// The allocation/insert loop. Re-reads the month's latest number on
    /// every attempt so a retry picks up the competitor's insert.
    async fn insert_numbered(
        &self,
        input: &InvoiceInput,
        totals: &InvoiceTotals,
        customer: &Customer,
        payment: &Payment,
        now: DateTime<Utc>,
    ) -> ApiResult<InvoiceWithRelations> {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let prefix = numbering::month_prefix(now);
            let latest = self.db.invoices().latest_number_with_prefix(&prefix).await?;
            let number = numbering::next_number(&prefix, latest.as_deref());

            let invoice_id = Uuid::new_v4().to_string();
            let invoice = Invoice {
                id: invoice_id.clone(),
                invoice_number: number.clone(),
                customer_id: customer.id.clone(),
                payment_id: payment.id.clone(),
                license_plate: input.license_plate.clone(),
                mileage: input.mileage,
                vehicle_model: input.vehicle_model.clone(),
                subtotal_cents: totals.subtotal_cents,
                vat_cents: totals.vat_cents,
                total_cents: totals.total_cents,
                status: input.status,
                issued_at: now,
                paid_at: now,
                created_at: now,
            };
            let items = build_items(&invoice_id, input);

            match self.db.invoices().insert_with_items(&invoice, &items).await {
                Ok(()) => {
                    return self
                        .db
                        .invoices()
                        .get_with_relations(&invoice_id)
                        .await?
                        .ok_or_else(|| ApiError::internal("created invoice vanished"));
                }
                Err(err) if err.is_unique_violation_on("invoices.invoice_number") => {
                    warn!(attempt, number = %number, "Invoice number taken, retrying");
                    if attempt < MAX_ALLOCATION_ATTEMPTS {
                        // Small random backoff to de-correlate the retries.
                        let jitter: u64 = rand::thread_rng().gen_range(10..=50);
                        tokio::time::sleep(Duration::from_millis(jitter)).await;
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(CoreError::NumberAllocationExhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        }
        .into())
    }

    /// Reuses the customer named by `customerId`, or creates a new one.
    async fn resolve_customer(
        &self,
        input: &InvoiceInput,
        now: DateTime<Utc>,
    ) -> ApiResult<Customer> {
        if let Some(id) = &input.customer_id {
            return self
                .db
                .customers()
                .get_by_id(id)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(id.clone()).into());
        }

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            customer_type: input.customer_type,
            name: input.customer_name.trim().to_string(),
            email: clean_optional(&input.customer_email),
            address: clean_optional(&input.customer_address),
            vat_number: vat_number_for(input),
            created_at: now,
        };
        self.db.customers().insert(&customer).await?;
        debug!(id = %customer.id, "Customer created");

        Ok(customer)
    }

    /// Compensating deletion of the pre-created payment. The original error
    /// is what the caller sees; a failing rollback is only logged.
    async fn rollback_payment(&self, payment_id: &str) {
        if let Err(err) = self.db.invoices().delete_payment(payment_id).await {
            error!(payment_id, %err, "Failed to roll back orphaned payment");
        }
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Updates an invoice: overwrites customer fields and payment
    /// amount/method, replaces the items wholesale and recomputes totals.
    /// The invoice number never changes.
    pub async fn update(&self, id: &str, input: InvoiceInput) -> ApiResult<InvoiceWithRelations> {
        let existing = self
            .db
            .invoices()
            .get_with_relations(id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

        validation::validate_customer_name(&input.customer_name).map_err(CoreError::from)?;
        validation::validate_items(&input.items).map_err(CoreError::from)?;

        let totals = invoice_totals(&input.items);

        let customer = Customer {
            customer_type: input.customer_type,
            name: input.customer_name.trim().to_string(),
            email: clean_optional(&input.customer_email),
            address: clean_optional(&input.customer_address),
            vat_number: vat_number_for(&input),
            ..existing.customer
        };
        self.db.customers().update(&customer).await?;

        let payment = Payment {
            amount_total_cents: totals.total_cents,
            method: input.payment_method,
            ..existing.payment
        };
        self.db.invoices().update_payment(&payment).await?;

        let invoice = Invoice {
            license_plate: input.license_plate.clone(),
            mileage: input.mileage,
            vehicle_model: input.vehicle_model.clone(),
            subtotal_cents: totals.subtotal_cents,
            vat_cents: totals.vat_cents,
            total_cents: totals.total_cents,
            status: input.status,
            ..existing.invoice
        };
        self.db.invoices().update(&invoice).await?;
        self.db
            .invoices()
            .replace_items(id, &build_items(id, &input))
            .await?;

        info!(number = %invoice.invoice_number, "Invoice updated");

        self.db
            .invoices()
            .get_with_relations(id)
            .await?
            .ok_or_else(|| ApiError::internal("updated invoice vanished"))
    }

    // =========================================================================
    // Delete / Read
    // =========================================================================

    /// Deletes an invoice, its items and its payment. Returns `false` when
    /// the invoice did not exist.
    pub async fn delete(&self, id: &str) -> ApiResult<bool> {
        let deleted = self.db.invoices().delete(id).await?;
        if deleted {
            info!(id, "Invoice deleted");
        }
        Ok(deleted)
    }

    pub async fn get(&self, id: &str) -> ApiResult<InvoiceWithRelations> {
        self.db
            .invoices()
            .get_with_relations(id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()).into())
    }

    /// All invoices, newest first.
    pub async fn list(&self) -> ApiResult<Vec<InvoiceWithRelations>> {
        Ok(self.db.invoices().list_with_relations().await?)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn list_customers(&self) -> ApiResult<Vec<Customer>> {
        Ok(self.db.customers().list().await?)
    }

    /// Case-insensitive email lookup with vehicle prefill from the customer's
    /// most recent invoice.
    pub async fn lookup_customer(&self, email: &str) -> ApiResult<Option<CustomerLookup>> {
        let Some(customer) = self.db.customers().find_by_email(email).await? else {
            return Ok(None);
        };

        let latest = self.db.customers().latest_invoice(&customer.id).await?;
        let (license_plate, mileage, vehicle_model) = match latest {
            Some(inv) => (inv.license_plate, inv.mileage, inv.vehicle_model),
            None => (None, None, None),
        };

        Ok(Some(CustomerLookup {
            customer,
            license_plate,
            mileage,
            vehicle_model,
        }))
    }
}

/// Maps the request items onto persisted rows, preserving insertion order.
fn build_items(invoice_id: &str, input: &InvoiceInput) -> Vec<InvoiceItem> {
    input
        .items
        .iter()
        .enumerate()
        .map(|(position, item)| InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            description: item.description.trim().to_string(),
            size: clean_optional(&item.size),
            quantity: item.quantity(),
            unit_price_cents: item.unit_price().cents(),
            vat_rate: item.vat_rate,
            total_cents: item.line_total().cents(),
            position: position as i64,
        })
        .collect()
}

fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// VAT numbers are only meaningful for business customers.
fn vat_number_for(input: &InvoiceInput) -> Option<String> {
    match input.customer_type {
        CustomerType::Business => clean_optional(&input.customer_vat_number),
        CustomerType::Private => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::Poll;

    use super::*;
    use crate::dto::InvoiceInput;
    use factuur_core::numbering::month_prefix;
    use factuur_core::totals::{ItemInput, RawNumber};
    use factuur_core::types::{InvoiceStatus, PaymentMethod, VatRate};
    use factuur_db::DbConfig;

    async fn service() -> InvoiceService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        InvoiceService::new(db)
    }

    /// Polls a future exactly once; `None` means it is still pending. Lets a
    /// test freeze an in-flight creation at a known point and mutate the
    /// database underneath it.
    async fn poll_once<F: Future + Unpin>(fut: &mut F) -> Option<F::Output> {
        std::future::poll_fn(|cx| match Pin::new(&mut *fut).poll(cx) {
            Poll::Ready(value) => Poll::Ready(Some(value)),
            Poll::Pending => Poll::Ready(None),
        })
        .await
    }

    async fn payment_rows(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    /// Seeds a complete customer/payment/invoice chain carrying the given
    /// invoice number, bypassing the allocator.
    async fn seed_invoice(db: &Database, number: &str) {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            customer_type: CustomerType::Private,
            name: "Piet Peeters".to_string(),
            email: None,
            address: None,
            vat_number: None,
            created_at: now,
        };
        db.customers().insert(&customer).await.unwrap();

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            amount_total_cents: 12100,
            method: PaymentMethod::Pin,
            status: PaymentStatus::Paid,
            paid_at: now,
            created_at: now,
        };
        db.invoices().insert_payment(&payment).await.unwrap();

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: number.to_string(),
            customer_id: customer.id.clone(),
            payment_id: payment.id.clone(),
            license_plate: None,
            mileage: None,
            vehicle_model: None,
            subtotal_cents: 10000,
            vat_cents: 2100,
            total_cents: 12100,
            status: InvoiceStatus::Paid,
            issued_at: now,
            paid_at: now,
            created_at: now,
        };
        db.invoices().insert_with_items(&invoice, &[]).await.unwrap();
    }

    fn tire_item(description: &str, size: &str, qty: f64, price: f64) -> ItemInput {
        ItemInput {
            description: description.to_string(),
            size: if size.is_empty() {
                None
            } else {
                Some(size.to_string())
            },
            quantity: RawNumber::Number(qty),
            unit_price: RawNumber::Number(price),
            vat_rate: VatRate::Standard,
        }
    }

    fn sample_input() -> InvoiceInput {
        InvoiceInput {
            customer_id: None,
            customer_type: CustomerType::Private,
            customer_name: "Jan Janssens".to_string(),
            customer_email: Some("jan@voorbeeld.be".to_string()),
            customer_address: Some("Dorpsstraat 1, 9000 Gent".to_string()),
            customer_vat_number: None,
            payment_method: PaymentMethod::Pin,
            status: InvoiceStatus::Paid,
            items: vec![
                tire_item("Michelin Primacy 4", "205/55 R16", 4.0, 85.0),
                tire_item("Montage", "", 4.0, 12.5),
            ],
            license_plate: Some("1-ABC-123".to_string()),
            mileage: Some(84_000),
            vehicle_model: Some("VW Golf".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_first_number_of_month() {
        let svc = service().await;
        let created = svc.create(sample_input()).await.unwrap();

        let expected = format!("{}-0001", month_prefix(Utc::now()));
        assert_eq!(created.invoice.invoice_number, expected);
        assert_eq!(created.items.len(), 2);
        // 4 × €85 + 4 × €12.50 = €390; 21% VAT = €81.90
        assert_eq!(created.invoice.subtotal_cents, 39000);
        assert_eq!(created.invoice.vat_cents, 8190);
        assert_eq!(
            created.invoice.total_cents,
            created.invoice.subtotal_cents + created.invoice.vat_cents
        );
        assert_eq!(created.payment.amount_total_cents, created.invoice.total_cents);
    }

    #[tokio::test]
    async fn test_sequential_creates_increment_number() {
        let svc = service().await;
        let first = svc.create(sample_input()).await.unwrap();
        let second = svc.create(sample_input()).await.unwrap();
        let third = svc.create(sample_input()).await.unwrap();

        let prefix = month_prefix(Utc::now());
        assert_eq!(first.invoice.invoice_number, format!("{prefix}-0001"));
        assert_eq!(second.invoice.invoice_number, format!("{prefix}-0002"));
        assert_eq!(third.invoice.invoice_number, format!("{prefix}-0003"));
    }

    #[tokio::test]
    async fn test_concurrent_creates_never_share_a_number() {
        let svc = service().await;
        let (a, b) = tokio::join!(svc.create(sample_input()), svc.create(sample_input()));
        let a = a.unwrap();
        let b = b.unwrap();
        assert_ne!(a.invoice.invoice_number, b.invoice.invoice_number);
    }

    #[tokio::test]
    async fn test_collision_is_retried_with_a_fresh_read() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let svc = InvoiceService::new(db.clone());
        let prefix = month_prefix(Utc::now());

        // Drive the creation one poll at a time and freeze it as soon as its
        // payment row lands; at that point it is inside the allocation phase
        // and cannot make progress until polled again.
        let mut create = Box::pin(svc.create(sample_input()));
        let mut frozen = false;
        for _ in 0..10_000 {
            if let Some(result) = poll_once(&mut create).await {
                panic!("creation finished before the competitor acted: {result:?}");
            }
            if payment_rows(&db).await == 1 {
                frozen = true;
                break;
            }
        }
        assert!(frozen, "creation never reached the allocation phase");

        // The competitor takes the number the frozen creation is about to
        // claim. Resuming it hits the unique index, re-reads, and lands on
        // the next free number.
        seed_invoice(&db, &format!("{prefix}-0001")).await;

        let created = create.await.unwrap();
        assert_eq!(created.invoice.invoice_number, format!("{prefix}-0002"));
    }

    #[tokio::test]
    async fn test_allocation_exhaustion_rolls_back_payment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let svc = InvoiceService::new(db.clone());
        let prefix = month_prefix(Utc::now());

        // Five digits sort below four nines, so the allocator reads 9999 as
        // the month's maximum and computes 10000 on every attempt; the
        // seeded 10000 collides each time until the retries run out.
        seed_invoice(&db, &format!("{prefix}-9999")).await;
        seed_invoice(&db, &format!("{prefix}-10000")).await;

        let before = payment_rows(&db).await;
        let err = svc.create(sample_input()).await.unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::Conflict);
        // The pre-created payment was deleted again.
        assert_eq!(payment_rows(&db).await, before);
    }

    #[tokio::test]
    async fn test_numbers_are_not_reused_after_delete() {
        let svc = service().await;
        let prefix = month_prefix(Utc::now());

        let first = svc.create(sample_input()).await.unwrap();
        assert_eq!(first.invoice.invoice_number, format!("{prefix}-0001"));
        assert!(svc.delete(&first.invoice.id).await.unwrap());

        let second = svc.create(sample_input()).await.unwrap();
        assert_eq!(second.invoice.invoice_number, format!("{prefix}-0002"));
    }

    #[tokio::test]
    async fn test_create_without_items_is_rejected_without_state() {
        let svc = service().await;
        let mut input = sample_input();
        input.items.clear();

        assert!(svc.create(input).await.is_err());
        assert!(svc.list().await.unwrap().is_empty());
        assert!(svc.list_customers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_unknown_customer_id_is_not_found() {
        let svc = service().await;
        let mut input = sample_input();
        input.customer_id = Some("no-such-customer".to_string());

        let err = svc.create(input).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_create_reuses_existing_customer() {
        let svc = service().await;
        let first = svc.create(sample_input()).await.unwrap();

        let mut input = sample_input();
        input.customer_id = Some(first.customer.id.clone());
        let second = svc.create(input).await.unwrap();

        assert_eq!(second.customer.id, first.customer.id);
        assert_eq!(svc.list_customers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_private_customer_never_stores_vat_number() {
        let svc = service().await;
        let mut input = sample_input();
        input.customer_vat_number = Some("BE0123456789".to_string());

        let created = svc.create(input).await.unwrap();
        assert_eq!(created.customer.vat_number, None);
    }

    #[tokio::test]
    async fn test_update_replaces_items_and_recomputes_totals() {
        let svc = service().await;
        let created = svc.create(sample_input()).await.unwrap();

        let mut input = sample_input();
        input.items = vec![tire_item("Balanceren", "", 4.0, 12.5)];
        input.status = InvoiceStatus::Unpaid;
        input.customer_name = "Jan Janssens BVBA".to_string();

        let updated = svc.update(&created.invoice.id, input).await.unwrap();

        // The number never changes.
        assert_eq!(updated.invoice.invoice_number, created.invoice.invoice_number);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.invoice.subtotal_cents, 5000);
        assert_eq!(updated.invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(updated.customer.name, "Jan Janssens BVBA");
        assert_eq!(updated.payment.amount_total_cents, updated.invoice.total_cents);
    }

    #[tokio::test]
    async fn test_update_missing_invoice_is_not_found() {
        let svc = service().await;
        let err = svc.update("no-such-id", sample_input()).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_delete_reports_not_found_as_false() {
        let svc = service().await;
        let created = svc.create(sample_input()).await.unwrap();

        assert!(svc.delete(&created.invoice.id).await.unwrap());
        assert!(!svc.delete(&created.invoice.id).await.unwrap());
        assert!(svc.get(&created.invoice.id).await.is_err());
    }

    #[tokio::test]
    async fn test_lookup_customer_prefills_vehicle() {
        let svc = service().await;
        svc.create(sample_input()).await.unwrap();

        let found = svc
            .lookup_customer("JAN@VOORBEELD.BE")
            .await
            .unwrap()
            .expect("lookup should match");
        assert_eq!(found.customer.name, "Jan Janssens");
        assert_eq!(found.license_plate.as_deref(), Some("1-ABC-123"));
        assert_eq!(found.mileage, Some(84_000));
        assert_eq!(found.vehicle_model.as_deref(), Some("VW Golf"));

        assert!(svc.lookup_customer("nobody@voorbeeld.be").await.unwrap().is_none());
    }
}
