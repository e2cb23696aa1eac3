//! # Invoice Numbering
//!
//! Pure helpers for the `INV-YYYYMM-NNNN` invoice number format.
//!
//! ## Format
//! ```text
//! INV-202601-0007
//! └┬┘ └─┬──┘ └┬─┘
//!  │    │     └── 4-digit sequence, restarts at 0001 each month,
//!  │    │         never reused after a delete
//!  │    └──────── year + month at issuance
//!  └───────────── literal prefix
//! ```
//!
//! The allocator itself lives in the server's invoice service: it reads the
//! lexicographically greatest persisted number for the current month prefix,
//! computes the next one here, and retries on a uniqueness conflict. These
//! helpers stay pure so the format and sequence math are testable without a
//! database.

use chrono::{DateTime, Datelike, Utc};

/// Literal prefix of every invoice number.
pub const INVOICE_PREFIX: &str = "INV";

/// Maximum insertion attempts before number allocation fails hard.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// The month prefix for an issuance timestamp, e.g. `INV-202601`.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use factuur_core::numbering::month_prefix;
///
/// let issued = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
/// assert_eq!(month_prefix(issued), "INV-202601");
/// ```
pub fn month_prefix(issued_at: DateTime<Utc>) -> String {
    format!(
        "{}-{:04}{:02}",
        INVOICE_PREFIX,
        issued_at.year(),
        issued_at.month()
    )
}

/// Formats a full invoice number from a month prefix and sequence.
pub fn format_number(prefix: &str, sequence: u32) -> String {
    format!("{prefix}-{sequence:04}")
}

/// Parses the trailing sequence segment of an invoice number.
///
/// Returns `None` when the trailing segment is not numeric; malformed
/// numbers then restart the month at 0001 instead of poisoning allocation.
///
/// ## Example
/// ```rust
/// use factuur_core::numbering::parse_sequence;
///
/// assert_eq!(parse_sequence("INV-202601-0007"), Some(7));
/// assert_eq!(parse_sequence("INV-202601-xyz"), None);
/// ```
pub fn parse_sequence(invoice_number: &str) -> Option<u32> {
    invoice_number.rsplit('-').next()?.parse().ok()
}

/// Computes the next invoice number for a month, given the latest persisted
/// number sharing that month's prefix (or `None` when the month is empty).
///
/// ## Example
/// ```rust
/// use factuur_core::numbering::next_number;
///
/// assert_eq!(next_number("INV-202601", None), "INV-202601-0001");
/// assert_eq!(
///     next_number("INV-202601", Some("INV-202601-0007")),
///     "INV-202601-0008"
/// );
/// ```
pub fn next_number(prefix: &str, latest: Option<&str>) -> String {
    let sequence = latest.and_then(parse_sequence).unwrap_or(0) + 1;
    format_number(prefix, sequence)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_prefix_zero_pads_month() {
        let march = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(month_prefix(march), "INV-202603");

        let december = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(month_prefix(december), "INV-202512");
    }

    #[test]
    fn test_format_number_zero_pads_sequence() {
        assert_eq!(format_number("INV-202601", 1), "INV-202601-0001");
        assert_eq!(format_number("INV-202601", 42), "INV-202601-0042");
        assert_eq!(format_number("INV-202601", 9999), "INV-202601-9999");
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("INV-202601-0001"), Some(1));
        assert_eq!(parse_sequence("INV-202601-0123"), Some(123));
        assert_eq!(parse_sequence("garbage"), None);
        assert_eq!(parse_sequence("INV-202601-"), None);
    }

    #[test]
    fn test_next_number_restarts_each_month() {
        // A fresh month starts at 0001 regardless of other months' history.
        assert_eq!(next_number("INV-202602", None), "INV-202602-0001");
    }

    #[test]
    fn test_next_number_increments_latest() {
        assert_eq!(
            next_number("INV-202601", Some("INV-202601-0009")),
            "INV-202601-0010"
        );
    }

    #[test]
    fn test_sequence_survives_lexicographic_ordering() {
        // Zero padding keeps lexicographic and numeric order aligned,
        // which the "latest number" database lookup relies on.
        let a = format_number("INV-202601", 2);
        let b = format_number("INV-202601", 10);
        assert!(a < b);
    }
}
