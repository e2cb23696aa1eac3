//! # EPC Payment Reference Encoder
//!
//! Builds the EPC069-12 "SEPA Credit Transfer" QR payload (version 002)
//! that banking apps scan to prefill a transfer.
//!
//! ## Payload Grammar
//! ```text
//! ┌────┬───────────────────────────────┬──────────────────────────────┐
//! │ #  │ field                         │ value here                   │
//! ├────┼───────────────────────────────┼──────────────────────────────┤
//! │ 1  │ service tag                   │ BCD                          │
//! │ 2  │ version                       │ 002                          │
//! │ 3  │ character set                 │ 1 (UTF-8)                    │
//! │ 4  │ identification                │ SCT                          │
//! │ 5  │ BIC                           │ (empty, optional since v002) │
//! │ 6  │ beneficiary name              │ ≤ 70 chars, collapsed spaces │
//! │ 7  │ IBAN                          │ no spaces, upper-cased       │
//! │ 8  │ amount                        │ EUR + 2-decimal total        │
//! │ 9  │ purpose                       │ (empty)                      │
//! │ 10 │ structured remittance         │ (empty)                      │
//! │ 11 │ unstructured remittance       │ "Factuur <nr>", ≤ 140 chars  │
//! └────┴───────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Lines are CRLF-terminated, including a trailing CRLF after the last
//! field. Bank scanners parse by fixed field order, so this output must be
//! reproduced byte-exactly.

use crate::money::Money;

/// Maximum length of the beneficiary name field.
const MAX_NAME_LEN: usize = 70;

/// Maximum length of the unstructured remittance field.
const MAX_REMITTANCE_LEN: usize = 140;

/// Builds the EPC QR payload for a bank transfer paying an invoice.
///
/// ## Example
/// ```rust
/// use factuur_core::epc::payment_reference;
/// use factuur_core::money::Money;
///
/// let payload = payment_reference(
///     Money::from_cents(12340),
///     "INV-202501-0001",
///     "IBAN: BE92 0636 4586 3623",
///     "Gent Bandenservice",
/// );
/// assert!(payload.contains("EUR123.40\r\n"));
/// assert!(payload.contains("BE92063645863623\r\n"));
/// ```
pub fn payment_reference(
    total: Money,
    invoice_number: &str,
    iban: &str,
    beneficiary_name: &str,
) -> String {
    let name = clean_name(beneficiary_name);
    let iban = clean_iban(iban);
    let amount = format!("EUR{}", total.format_plain());
    let remittance = truncate_chars(format!("Factuur {invoice_number}").trim(), MAX_REMITTANCE_LEN);

    let lines = [
        "BCD",
        "002",
        "1",
        "SCT",
        "", // BIC, unused
        name.as_str(),
        iban.as_str(),
        amount.as_str(),
        "", // purpose, unused
        "", // structured remittance reference, unused
        remittance.as_str(),
    ];

    let mut payload = lines.join("\r\n");
    payload.push_str("\r\n");
    payload
}

/// Trims, collapses internal whitespace runs to single spaces, and caps the
/// beneficiary name at 70 characters.
fn clean_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, MAX_NAME_LEN)
}

/// Strips a leading literal `IBAN:` prefix, removes all whitespace, and
/// upper-cases the account number.
fn clean_iban(iban: &str) -> String {
    let trimmed = iban.trim();
    let stripped = trimmed.strip_prefix("IBAN:").unwrap_or(trimmed);
    stripped
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Truncation by characters, not bytes, so multi-byte names cannot split.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
