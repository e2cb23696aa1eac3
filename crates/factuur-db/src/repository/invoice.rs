//! # Invoice Repository
//!
//! Database operations for invoices, their line items and their payment
//! record.
//!
//! ## Write Ordering
//! The payment row is inserted first so the invoice can reference it. If the
//! invoice write never lands (number allocation exhausted, validation), the
//! caller deletes the payment again with [`InvoiceRepository::delete_payment`].
//!
//! ## Item Ownership
//! Items belong to exactly one invoice. Updates replace them wholesale and
//! the schema cascades them away on invoice deletion.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use factuur_core::{Customer, Invoice, InvoiceItem, InvoiceWithRelations, Payment};

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    // =========================================================================
    // Number Allocation Support
    // =========================================================================

    /// The highest invoice number ever allocated with the given month
    /// prefix, or `None` when the month has no invoices yet.
    ///
    /// Zero-padded sequences make lexicographic MAX equal numeric MAX, so a
    /// plain ORDER BY suffices. Deleted invoices leave their number behind
    /// in `retired_invoice_numbers`, which this scan includes: a sequence
    /// number is never reused, not even when the month's highest invoice is
    /// deleted.
    pub async fn latest_number_with_prefix(&self, prefix: &str) -> DbResult<Option<String>> {
        let number = sqlx::query_scalar::<_, String>(
            r#"
            SELECT invoice_number FROM (
                SELECT invoice_number FROM invoices WHERE invoice_number LIKE ?1
                UNION
                SELECT invoice_number FROM retired_invoice_numbers WHERE invoice_number LIKE ?1
            )
            ORDER BY invoice_number DESC
            LIMIT 1
            "#,
        )
        .bind(format!("{prefix}-%"))
        .fetch_optional(&self.pool)
        .await?;

        Ok(number)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Inserts a payment record.
    pub async fn insert_payment(&self, payment: &Payment) -> DbResult<()> {
        debug!(id = %payment.id, cents = payment.amount_total_cents, "Inserting payment");

        sqlx::query(
            r#"
            INSERT INTO payments (id, customer_id, amount_total_cents, method, status, paid_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.customer_id)
        .bind(payment.amount_total_cents)
        .bind(payment.method)
        .bind(payment.status)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a payment's amount and method (invoice edits).
    pub async fn update_payment(&self, payment: &Payment) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE payments SET
                amount_total_cents = ?2,
                method = ?3,
                status = ?4,
                paid_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&payment.id)
        .bind(payment.amount_total_cents)
        .bind(payment.method)
        .bind(payment.status)
        .bind(payment.paid_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a payment record. Used to roll back an orphaned payment when
    /// invoice creation fails after the payment was written.
    pub async fn delete_payment(&self, payment_id: &str) -> DbResult<()> {
        debug!(id = %payment_id, "Deleting payment");

        sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(payment_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Gets a payment by ID.
    pub async fn get_payment(&self, payment_id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?1")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Inserts an invoice and all of its items in one transaction.
    ///
    /// A UNIQUE violation on `invoices.invoice_number` surfaces as
    /// [`DbError::UniqueViolation`]; the allocator's retry loop pivots on it.
    pub async fn insert_with_items(
        &self,
        invoice: &Invoice,
        items: &[InvoiceItem],
    ) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            number = %invoice.invoice_number,
            items = items.len(),
            "Inserting invoice"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, customer_id, payment_id,
                license_plate, mileage, vehicle_model,
                subtotal_cents, vat_cents, total_cents,
                status, issued_at, paid_at, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.customer_id)
        .bind(&invoice.payment_id)
        .bind(&invoice.license_plate)
        .bind(invoice.mileage)
        .bind(&invoice.vehicle_model)
        .bind(invoice.subtotal_cents)
        .bind(invoice.vat_cents)
        .bind(invoice.total_cents)
        .bind(invoice.status)
        .bind(invoice.issued_at)
        .bind(invoice.paid_at)
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            insert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets an invoice by ID (bare row, no relations).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Gets an invoice with its customer, payment and ordered items.
    pub async fn get_with_relations(&self, id: &str) -> DbResult<Option<InvoiceWithRelations>> {
        let Some(invoice) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        Ok(Some(self.load_relations(invoice).await?))
    }

    /// Lists all invoices with relations, newest first.
    pub async fn list_with_relations(&self) -> DbResult<Vec<InvoiceWithRelations>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        // One query per invoice for relations. Fine at this dataset size
        // (single shop, hundreds of invoices).
        let mut result = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            result.push(self.load_relations(invoice).await?);
        }

        Ok(result)
    }

    /// Updates an invoice's mutable fields. The invoice number is immutable
    /// and deliberately absent here.
    pub async fn update(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, "Updating invoice");

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                license_plate = ?2,
                mileage = ?3,
                vehicle_model = ?4,
                subtotal_cents = ?5,
                vat_cents = ?6,
                total_cents = ?7,
                status = ?8,
                issued_at = ?9,
                paid_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.license_plate)
        .bind(invoice.mileage)
        .bind(&invoice.vehicle_model)
        .bind(invoice.subtotal_cents)
        .bind(invoice.vat_cents)
        .bind(invoice.total_cents)
        .bind(invoice.status)
        .bind(invoice.issued_at)
        .bind(invoice.paid_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "invoice".to_string(),
                id: invoice.id.clone(),
            });
        }

        Ok(())
    }

    /// Replaces an invoice's items wholesale, in one transaction.
    pub async fn replace_items(&self, invoice_id: &str, items: &[InvoiceItem]) -> DbResult<()> {
        debug!(id = %invoice_id, items = items.len(), "Replacing invoice items");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            insert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes an invoice, its items (schema cascade) and its payment record
    /// in one transaction. Returns `false` when the invoice did not exist.
    ///
    /// The invoice number is retired, never recycled: a tombstone keeps it
    /// visible to [`InvoiceRepository::latest_number_with_prefix`] so the
    /// allocator moves past it even when the month's highest invoice is
    /// deleted.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let Some(invoice) = self.get_by_id(id).await? else {
            return Ok(false);
        };

        debug!(id = %id, number = %invoice.invoice_number, "Deleting invoice");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(&invoice.payment_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO retired_invoice_numbers (invoice_number, retired_at)
            VALUES (?1, ?2)
            "#,
        )
        .bind(&invoice.invoice_number)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Items for one invoice, in insertion order.
    pub async fn items_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT *
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn load_relations(&self, invoice: Invoice) -> DbResult<InvoiceWithRelations> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
            .bind(&invoice.customer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "customer".to_string(),
                id: invoice.customer_id.clone(),
            })?;

        let payment = self
            .get_payment(&invoice.payment_id)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "payment".to_string(),
                id: invoice.payment_id.clone(),
            })?;

        let items = self.items_for_invoice(&invoice.id).await?;

        Ok(InvoiceWithRelations {
            invoice,
            customer,
            payment,
            items,
        })
    }
}

async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    item: &InvoiceItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, description, size,
            quantity, unit_price_cents, vat_rate, total_cents, position
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.invoice_id)
    .bind(&item.description)
    .bind(&item.size)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.vat_rate)
    .bind(item.total_cents)
    .bind(item.position)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_customer, sample_invoice, test_db};

    #[tokio::test]
    async fn test_insert_and_get_with_relations() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        let (invoice, payment, items) = sample_invoice(&customer.id, "INV-202501-0001");
        db.invoices().insert_payment(&payment).await.unwrap();
        db.invoices().insert_with_items(&invoice, &items).await.unwrap();

        let full = db
            .invoices()
            .get_with_relations(&invoice.id)
            .await
            .unwrap()
            .expect("invoice should exist");

        assert_eq!(full.invoice.invoice_number, "INV-202501-0001");
        assert_eq!(full.customer.id, customer.id);
        assert_eq!(full.payment.id, payment.id);
        assert_eq!(full.items.len(), items.len());
        assert_eq!(full.items[0].position, 0);
    }

    #[tokio::test]
    async fn test_duplicate_number_is_unique_violation() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        let (first, payment_a, items_a) = sample_invoice(&customer.id, "INV-202501-0001");
        db.invoices().insert_payment(&payment_a).await.unwrap();
        db.invoices().insert_with_items(&first, &items_a).await.unwrap();

        let (second, payment_b, items_b) = sample_invoice(&customer.id, "INV-202501-0001");
        db.invoices().insert_payment(&payment_b).await.unwrap();
        let err = db
            .invoices()
            .insert_with_items(&second, &items_b)
            .await
            .unwrap_err();

        assert!(err.is_unique_violation_on("invoices.invoice_number"));
    }

    #[tokio::test]
    async fn test_latest_number_with_prefix() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        assert_eq!(
            db.invoices()
                .latest_number_with_prefix("INV-202501")
                .await
                .unwrap(),
            None
        );

        for number in ["INV-202501-0001", "INV-202501-0003", "INV-202502-0009"] {
            let (invoice, payment, items) = sample_invoice(&customer.id, number);
            db.invoices().insert_payment(&payment).await.unwrap();
            db.invoices().insert_with_items(&invoice, &items).await.unwrap();
        }

        assert_eq!(
            db.invoices()
                .latest_number_with_prefix("INV-202501")
                .await
                .unwrap()
                .as_deref(),
            Some("INV-202501-0003")
        );
    }

    #[tokio::test]
    async fn test_delete_removes_items_and_payment() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        let (invoice, payment, items) = sample_invoice(&customer.id, "INV-202501-0001");
        db.invoices().insert_payment(&payment).await.unwrap();
        db.invoices().insert_with_items(&invoice, &items).await.unwrap();

        let deleted = db.invoices().delete(&invoice.id).await.unwrap();
        assert!(deleted);

        assert!(db.invoices().get_by_id(&invoice.id).await.unwrap().is_none());
        assert!(db.invoices().get_payment(&payment.id).await.unwrap().is_none());
        assert!(db
            .invoices()
            .items_for_invoice(&invoice.id)
            .await
            .unwrap()
            .is_empty());

        // Customer survives invoice deletion.
        assert!(db.customers().get_by_id(&customer.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deleted_number_stays_visible_to_allocation() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        let (invoice, payment, items) = sample_invoice(&customer.id, "INV-202501-0007");
        db.invoices().insert_payment(&payment).await.unwrap();
        db.invoices().insert_with_items(&invoice, &items).await.unwrap();

        assert!(db.invoices().delete(&invoice.id).await.unwrap());

        // The month's highest invoice is gone, but its number is retired,
        // not freed.
        assert_eq!(
            db.invoices()
                .latest_number_with_prefix("INV-202501")
                .await
                .unwrap()
                .as_deref(),
            Some("INV-202501-0007")
        );
    }

    #[tokio::test]
    async fn test_delete_missing_invoice_returns_false() {
        let db = test_db().await;
        let deleted = db.invoices().delete("no-such-id").await.unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_replace_items_wholesale() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        let (invoice, payment, items) = sample_invoice(&customer.id, "INV-202501-0001");
        db.invoices().insert_payment(&payment).await.unwrap();
        db.invoices().insert_with_items(&invoice, &items).await.unwrap();

        let replacement = InvoiceItem {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            description: "Balanceren".to_string(),
            size: None,
            quantity: 4,
            unit_price_cents: 1250,
            vat_rate: factuur_core::types::VatRate::Standard,
            total_cents: 5000,
            position: 0,
        };
        db.invoices()
            .replace_items(&invoice.id, std::slice::from_ref(&replacement))
            .await
            .unwrap();

        let after = db.invoices().items_for_invoice(&invoice.id).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].description, "Balanceren");
    }
}
