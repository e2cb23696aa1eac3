//! EPC payload → QR image data URL.
//!
//! The contract is deliberately lenient: "text in, data URL out", and an
//! empty string on encode failure rather than an error. Callers embed the
//! result where an image is optional (email body); the invoice itself is
//! never blocked on QR encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;
use tracing::warn;

/// Renders the payload as an SVG QR code wrapped in a base64 data URL.
/// Returns an empty string when encoding fails.
pub fn data_url(payload: &str) -> String {
    if payload.is_empty() {
        return String::new();
    }

    match QrCode::new(payload.as_bytes()) {
        Ok(code) => {
            let image = code
                .render::<svg::Color>()
                .min_dimensions(240, 240)
                .build();
            format!("data:image/svg+xml;base64,{}", STANDARD.encode(image))
        }
        Err(err) => {
            warn!(%err, "QR encoding failed, omitting image");
            String::new()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
