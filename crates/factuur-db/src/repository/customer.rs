//! # Customer Repository
//!
//! Database operations for customers. Customers are shared across invoices:
//! created on the first invoice for a new email address, reused by lookup,
//! overwritten when an invoice edit changes customer fields, and never
//! cascade-deleted.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use factuur_core::{Customer, Invoice};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, type, name, email, address, vat_number, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(customer.customer_type)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.vat_number)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, type, name, email, address, vat_number, created_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Overwrites a customer's mutable fields (invoice edits change customer
    /// data in place; the id and created_at never move).
    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Updating customer");

        sqlx::query(
            r#"
            UPDATE customers SET
                type = ?2,
                name = ?3,
                email = ?4,
                address = ?5,
                vat_number = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&customer.id)
        .bind(customer.customer_type)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.vat_number)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists all customers, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, type, name, email, address, vat_number, created_at
            FROM customers
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Case-insensitive exact-match lookup by email. When several customers
    /// share an address, the most recently created one wins.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, type, name, email, address, vat_number, created_at
            FROM customers
            WHERE email = ?1 COLLATE NOCASE
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// The customer's most recently created invoice, used to surface vehicle
    /// metadata (license plate, mileage, model) for form prefill.
    pub async fn latest_invoice(&self, customer_id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT *
            FROM invoices
            WHERE customer_id = ?1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_customer, test_db};

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");

        db.customers().insert(&customer).await.unwrap();

        let found = db.customers().get_by_id(&customer.id).await.unwrap();
        let found = found.expect("customer should exist");
        assert_eq!(found.name, customer.name);
        assert_eq!(found.email, customer.email);
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let db = test_db().await;
        let customer = sample_customer("Jan.Janssens@Voorbeeld.BE");
        db.customers().insert(&customer).await.unwrap();

        let found = db
            .customers()
            .find_by_email("jan.janssens@voorbeeld.be")
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().id, customer.id);

        let missing = db.customers().find_by_email("nobody@voorbeeld.be").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_overwrites_fields() {
        let db = test_db().await;
        let mut customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        customer.name = "Jan Janssens BVBA".to_string();
        customer.customer_type = factuur_core::CustomerType::Business;
        customer.vat_number = Some("BE0123456789".to_string());
        db.customers().update(&customer).await.unwrap();

        let found = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Jan Janssens BVBA");
        assert_eq!(found.customer_type, factuur_core::CustomerType::Business);
        assert_eq!(found.vat_number.as_deref(), Some("BE0123456789"));
    }
}
