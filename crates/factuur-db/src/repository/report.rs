//! # Report Repository
//!
//! Read-only queries behind the report aggregator: invoices inside a time
//! window, and tire-size frequency counts.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::DbResult;
use factuur_core::report::SizeCount;
use factuur_core::Invoice;

/// Repository for reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Invoices issued inside `[start, end]` (both bounds inclusive),
    /// oldest first.
    pub async fn invoices_issued_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT *
            FROM invoices
            WHERE issued_at >= ?1 AND issued_at <= ?2
            ORDER BY issued_at ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// The most frequently sold tire sizes, optionally restricted to
    /// invoices issued inside a window. Blank sizes don't count.
    ///
    /// Frequency is the number of invoice lines carrying the size, not the
    /// summed quantity; ties break on size text for a stable order.
    pub async fn top_sizes(
        &self,
        limit: u32,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> DbResult<Vec<SizeCount>> {
        let rows = match window {
            Some((start, end)) => {
                sqlx::query_as::<_, SizeCount>(
                    r#"
                    SELECT ii.size AS size, COUNT(*) AS count
                    FROM invoice_items ii
                    JOIN invoices i ON i.id = ii.invoice_id
                    WHERE ii.size IS NOT NULL AND TRIM(ii.size) != ''
                      AND i.issued_at >= ?1 AND i.issued_at <= ?2
                    GROUP BY ii.size
                    ORDER BY count DESC, ii.size ASC
                    LIMIT ?3
                    "#,
                )
                .bind(start)
                .bind(end)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SizeCount>(
                    r#"
                    SELECT size, COUNT(*) AS count
                    FROM invoice_items
                    WHERE size IS NOT NULL AND TRIM(size) != ''
                    GROUP BY size
                    ORDER BY count DESC, size ASC
                    LIMIT ?1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_customer, sample_invoice_with_sizes, test_db};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_issued_between_is_inclusive() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        let jan_10 = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let jan_20 = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
        let feb_01 = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();

        for (number, issued_at) in [
            ("INV-202501-0001", jan_10),
            ("INV-202501-0002", jan_20),
            ("INV-202502-0001", feb_01),
        ] {
            let (mut invoice, payment, items) =
                sample_invoice_with_sizes(&customer.id, number, &["205/55 R16"]);
            invoice.issued_at = issued_at;
            db.invoices().insert_payment(&payment).await.unwrap();
            db.invoices().insert_with_items(&invoice, &items).await.unwrap();
        }

        let window = db
            .reports()
            .invoices_issued_between(jan_10, jan_20)
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].invoice_number, "INV-202501-0001");
        assert_eq!(window[1].invoice_number, "INV-202501-0002");
    }

    #[tokio::test]
    async fn test_top_sizes_counts_lines_and_skips_blanks() {
        let db = test_db().await;
        let customer = sample_customer("jan@voorbeeld.be");
        db.customers().insert(&customer).await.unwrap();

        let fixtures: &[(&str, &[&str])] = &[
            ("INV-202501-0001", &["205/55 R16", "205/55 R16"]),
            ("INV-202501-0002", &["195/65 R15", ""]),
            ("INV-202501-0003", &["205/55 R16"]),
        ];
        for (number, sizes) in fixtures {
            let (invoice, payment, items) =
                sample_invoice_with_sizes(&customer.id, number, sizes);
            db.invoices().insert_payment(&payment).await.unwrap();
            db.invoices().insert_with_items(&invoice, &items).await.unwrap();
        }

        let top = db.reports().top_sizes(5, None).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].size, "205/55 R16");
        assert_eq!(top[0].count, 3);
        assert_eq!(top[1].size, "195/65 R15");
        assert_eq!(top[1].count, 1);

        let top_one = db.reports().top_sizes(1, None).await.unwrap();
        assert_eq!(top_one.len(), 1);
    }
}
