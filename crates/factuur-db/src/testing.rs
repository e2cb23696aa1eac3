//! Test fixtures shared by the repository tests.

use chrono::Utc;
use uuid::Uuid;

use crate::pool::{Database, DbConfig};
use factuur_core::types::{
    Customer, CustomerType, Invoice, InvoiceItem, InvoiceStatus, Payment, PaymentMethod,
    PaymentStatus, VatRate,
};

/// A migrated in-memory database.
pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database should initialize")
}

pub fn sample_customer(email: &str) -> Customer {
    Customer {
        id: Uuid::new_v4().to_string(),
        customer_type: CustomerType::Private,
        name: "Jan Janssens".to_string(),
        email: Some(email.to_string()),
        address: Some("Dorpsstraat 1, 9000 Gent".to_string()),
        vat_number: None,
        created_at: Utc::now(),
    }
}

/// An invoice fixture with one tire line and one service line, plus its
/// payment. The payment must be inserted before the invoice.
pub fn sample_invoice(
    customer_id: &str,
    number: &str,
) -> (Invoice, Payment, Vec<InvoiceItem>) {
    sample_invoice_with_sizes(customer_id, number, &["205/55 R16"])
}

/// Like [`sample_invoice`] but with one line per given tire size. An empty
/// size string becomes a sizeless service line.
pub fn sample_invoice_with_sizes(
    customer_id: &str,
    number: &str,
    sizes: &[&str],
) -> (Invoice, Payment, Vec<InvoiceItem>) {
    let now = Utc::now();
    let invoice_id = Uuid::new_v4().to_string();

    let items: Vec<InvoiceItem> = sizes
        .iter()
        .enumerate()
        .map(|(position, size)| InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.clone(),
            description: "Michelin Primacy 4".to_string(),
            size: if size.is_empty() {
                None
            } else {
                Some(size.to_string())
            },
            quantity: 2,
            unit_price_cents: 8500,
            vat_rate: VatRate::Standard,
            total_cents: 17000,
            position: position as i64,
        })
        .collect();

    let subtotal_cents: i64 = items.iter().map(|i| i.total_cents).sum();
    let vat_cents: i64 = items
        .iter()
        .map(|i| (i.total_cents * i.vat_rate.percent() + 50) / 100)
        .sum();

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        amount_total_cents: subtotal_cents + vat_cents,
        method: PaymentMethod::Pin,
        status: PaymentStatus::Paid,
        paid_at: now,
        created_at: now,
    };

    let invoice = Invoice {
        id: invoice_id,
        invoice_number: number.to_string(),
        customer_id: customer_id.to_string(),
        payment_id: payment.id.clone(),
        license_plate: Some("1-ABC-123".to_string()),
        mileage: Some(84_000),
        vehicle_model: Some("VW Golf".to_string()),
        subtotal_cents,
        vat_cents,
        total_cents: subtotal_cents + vat_cents,
        status: InvoiceStatus::Paid,
        issued_at: now,
        paid_at: now,
        created_at: now,
    };

    (invoice, payment, items)
}
