//! Report aggregation.
//!
//! Resolves a period kind + anchor date into an inclusive window, folds the
//! invoices issued in it into summary statistics, and surfaces the tire-size
//! frequency aggregation.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use factuur_core::report::{
    end_of_day, period_window, start_of_day, ReportPeriod, ReportStats, SizeCount,
};
use factuur_db::Database;

use crate::dto::ReportData;
use crate::error::ApiResult;

/// Default number of entries for the popular-sizes aggregation.
const DEFAULT_TOP_SIZES: u32 = 5;

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        ReportService { db }
    }

    /// Builds the report for one period: window bounds, statistics and the
    /// fully-populated invoices issued inside the window.
    pub async fn report(&self, period: ReportPeriod, anchor: NaiveDate) -> ApiResult<ReportData> {
        let window = period_window(period, anchor);
        debug!(?period, %anchor, start = %window.start, end = %window.end, "Building report");

        let rows = self
            .db
            .reports()
            .invoices_issued_between(window.start, window.end)
            .await?;
        let stats = ReportStats::fold(&rows);

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(full) = self.db.invoices().get_with_relations(&row.id).await? {
                invoices.push(full);
            }
        }

        Ok(ReportData {
            window,
            stats,
            invoices,
        })
    }

    /// The most frequently sold tire sizes, optionally restricted to a date
    /// window (whole days, both ends inclusive).
    pub async fn top_sizes(
        &self,
        limit: Option<u32>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ApiResult<Vec<SizeCount>> {
        let window: Option<(DateTime<Utc>, DateTime<Utc>)> = match (from, to) {
            (Some(from), Some(to)) => Some((start_of_day(from), end_of_day(to))),
            (Some(from), None) => Some((start_of_day(from), end_of_day(Utc::now().date_naive()))),
            (None, Some(to)) => Some((DateTime::<Utc>::MIN_UTC, end_of_day(to))),
            (None, None) => None,
        };

        Ok(self
            .db
            .reports()
            .top_sizes(limit.unwrap_or(DEFAULT_TOP_SIZES), window)
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::InvoiceInput;
    use crate::services::invoice::InvoiceService;
    use factuur_core::totals::{ItemInput, RawNumber};
    use factuur_core::types::{CustomerType, InvoiceStatus, PaymentMethod, VatRate};
    use factuur_db::DbConfig;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn input(status: InvoiceStatus, size: &str, price: f64) -> InvoiceInput {
        InvoiceInput {
            customer_id: None,
            customer_type: CustomerType::Private,
            customer_name: "Jan Janssens".to_string(),
            customer_email: None,
            customer_address: None,
            customer_vat_number: None,
            payment_method: PaymentMethod::Cash,
            status,
            items: vec![ItemInput {
                description: "Band".to_string(),
                size: Some(size.to_string()),
                quantity: RawNumber::Number(1.0),
                unit_price: RawNumber::Number(price),
                vat_rate: VatRate::Standard,
            }],
            license_plate: None,
            mileage: None,
            vehicle_model: None,
        }
    }

    #[tokio::test]
    async fn test_daily_report_separates_paid_and_unpaid() {
        let db = db().await;
        let invoices = InvoiceService::new(db.clone());
        let reports = ReportService::new(db);

        invoices.create(input(InvoiceStatus::Paid, "205/55 R16", 100.0)).await.unwrap();
        invoices.create(input(InvoiceStatus::Paid, "205/55 R16", 50.0)).await.unwrap();
        invoices.create(input(InvoiceStatus::Unpaid, "195/65 R15", 80.0)).await.unwrap();

        let today = Utc::now().date_naive();
        let report = reports.report(ReportPeriod::Daily, today).await.unwrap();

        assert_eq!(report.stats.count, 3);
        assert_eq!(report.stats.paid_count, 2);
        assert_eq!(report.stats.unpaid_count, 1);
        // revenue = paid totals incl. VAT: (10000 + 5000) × 1.21
        assert_eq!(report.stats.total_revenue_cents, 12100 + 6050);
        assert_eq!(report.stats.outstanding_cents, 9680);
        assert_eq!(report.stats.count, report.stats.paid_count + report.stats.unpaid_count);
        assert_eq!(report.invoices.len(), 3);
    }

    #[tokio::test]
    async fn test_report_window_excludes_other_periods() {
        let db = db().await;
        let invoices = InvoiceService::new(db.clone());
        let reports = ReportService::new(db);

        invoices.create(input(InvoiceStatus::Paid, "205/55 R16", 100.0)).await.unwrap();

        // Anchor a month with no invoices.
        let empty_month = NaiveDate::from_ymd_opt(2020, 6, 15).unwrap();
        let report = reports.report(ReportPeriod::Monthly, empty_month).await.unwrap();
        assert_eq!(report.stats.count, 0);
        assert!(report.invoices.is_empty());
    }

    #[tokio::test]
    async fn test_top_sizes_orders_by_frequency() {
        let db = db().await;
        let invoices = InvoiceService::new(db.clone());
        let reports = ReportService::new(db);

        invoices.create(input(InvoiceStatus::Paid, "205/55 R16", 85.0)).await.unwrap();
        invoices.create(input(InvoiceStatus::Paid, "205/55 R16", 85.0)).await.unwrap();
        invoices.create(input(InvoiceStatus::Paid, "195/65 R15", 70.0)).await.unwrap();

        let top = reports.top_sizes(Some(1), None, None).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].size, "205/55 R16");
        assert_eq!(top[0].count, 2);
    }
}
