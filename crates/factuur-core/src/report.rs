//! # Report Aggregation
//!
//! Pure halves of the revenue reporting feature: resolving a period kind +
//! anchor date into an inclusive timestamp window, and folding the invoices
//! issued inside the window into summary statistics. Fetching the invoices
//! is the repository's job.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::{Invoice, InvoiceStatus};

// =============================================================================
// Report Period
// =============================================================================

/// The reporting period kind. Weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportPeriod::Daily),
            "weekly" => Ok(ReportPeriod::Weekly),
            "monthly" => Ok(ReportPeriod::Monthly),
            other => Err(format!(
                "invalid period: {other} (allowed: daily, weekly, monthly)"
            )),
        }
    }
}

/// The resolved inclusive window of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodWindow {
    #[serde(rename = "type")]
    pub period: ReportPeriod,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Resolves a period kind and anchor date to inclusive start/end timestamps.
///
/// The end bound is the last millisecond of the period, so `issued_at <= end`
/// keeps everything issued on the final day.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use factuur_core::report::{period_window, ReportPeriod};
///
/// // 2026-01-15 is a Thursday; its week runs Monday 12th .. Sunday 18th.
/// let anchor = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
/// let window = period_window(ReportPeriod::Weekly, anchor);
/// assert_eq!(window.start.to_rfc3339(), "2026-01-12T00:00:00+00:00");
/// assert_eq!(window.end.date_naive().to_string(), "2026-01-18");
/// ```
pub fn period_window(period: ReportPeriod, anchor: NaiveDate) -> PeriodWindow {
    let (first_day, last_day) = match period {
        ReportPeriod::Daily => (anchor, anchor),
        ReportPeriod::Weekly => {
            let monday = anchor - Duration::days(anchor.weekday().num_days_from_monday() as i64);
            (monday, monday + Duration::days(6))
        }
        ReportPeriod::Monthly => {
            let first = anchor.with_day(1).expect("day 1 always exists");
            let next_month = if first.month() == 12 {
                NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
            }
            .expect("first of month always exists");
            (first, next_month - Duration::days(1))
        }
    };

    PeriodWindow {
        period,
        start: start_of_day(first_day),
        end: end_of_day(last_day),
    }
}

/// Midnight UTC at the start of a date.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight always exists")
        .and_utc()
}

/// The last millisecond of a date, so `issued_at <= end` keeps the whole day.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .expect("end of day always exists")
        .and_utc()
}

// =============================================================================
// Report Stats
// =============================================================================

/// Summary statistics over the invoices issued in a window.
///
/// Revenue counts only PAID invoices; outstanding counts the rest; the VAT
/// sum covers every invoice in the window regardless of status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub count: i64,
    pub paid_count: i64,
    pub unpaid_count: i64,
    pub total_revenue_cents: i64,
    pub outstanding_cents: i64,
    pub vat_cents: i64,
}

impl ReportStats {
    /// Folds invoices into summary statistics.
    pub fn fold<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> ReportStats {
        invoices
            .into_iter()
            .fold(ReportStats::default(), |mut acc, inv| {
                acc.count += 1;
                match inv.status {
                    InvoiceStatus::Paid => {
                        acc.paid_count += 1;
                        acc.total_revenue_cents += inv.total_cents;
                    }
                    InvoiceStatus::Unpaid => {
                        acc.unpaid_count += 1;
                        acc.outstanding_cents += inv.total_cents;
                    }
                }
                acc.vat_cents += inv.vat_cents;
                acc
            })
    }
}

/// One entry of the "popular tire sizes" aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SizeCount {
    pub size: String,
    pub count: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
