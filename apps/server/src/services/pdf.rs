//! PDF rendering for invoices and reports.
//!
//! Single-column A4 layout with the builtin Helvetica fonts. The
//! invoice PDF embeds the EPC payment QR drawn module-by-module as filled
//! rectangles; when QR encoding fails the invoice renders without it.

use std::io::BufWriter;

use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb,
};
use qrcode::QrCode;
use tracing::warn;

use factuur_core::epc::payment_reference;
use factuur_core::types::{InvoiceStatus, InvoiceWithRelations, PaymentMethod};
use factuur_core::Money;

use crate::config::ShopConfig;
use crate::dto::ReportData;
use crate::error::{ApiError, ApiResult};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 18.0;
const LINE_GAP: f32 = 5.2;
const QR_SIZE_MM: f32 = 30.0;

/// Renders invoice and report PDFs with the shop identity in the header.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    shop: ShopConfig,
}

impl PdfRenderer {
    pub fn new(shop: ShopConfig) -> Self {
        PdfRenderer { shop }
    }

    // =========================================================================
    // Invoice
    // =========================================================================

    pub fn render_invoice(&self, invoice: &InvoiceWithRelations) -> ApiResult<Vec<u8>> {
        let title = format!("Factuur {}", invoice.invoice.invoice_number);
        let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let fonts = Fonts::load(&doc)?;
        let layer = doc.get_page(page).get_layer(layer);

        let mut y = PAGE_H - 20.0;

        // Shop header
        text(&layer, &fonts.bold, &self.shop.name, 16.0, MARGIN_X, y);
        y -= LINE_GAP + 1.0;
        text(&layer, &fonts.regular, &self.shop.address, 9.0, MARGIN_X, y);
        y -= LINE_GAP - 1.0;
        text(
            &layer,
            &fonts.regular,
            &format!("BTW {}   IBAN {}", self.shop.vat_number, self.shop.iban),
            9.0,
            MARGIN_X,
            y,
        );
        y -= LINE_GAP - 1.0;
        text(
            &layer,
            &fonts.regular,
            &format!("{}   {}", self.shop.email, self.shop.phone).trim().to_string(),
            9.0,
            MARGIN_X,
            y,
        );

        // Invoice meta, right column
        let meta_x = 130.0;
        let mut meta_y = PAGE_H - 20.0;
        text(&layer, &fonts.bold, "FACTUUR", 14.0, meta_x, meta_y);
        meta_y -= LINE_GAP + 1.0;
        text(
            &layer,
            &fonts.regular,
            &format!("Nummer: {}", invoice.invoice.invoice_number),
            9.0,
            meta_x,
            meta_y,
        );
        meta_y -= LINE_GAP - 1.0;
        text(
            &layer,
            &fonts.regular,
            &format!("Datum: {}", invoice.invoice.issued_at.format("%d-%m-%Y")),
            9.0,
            meta_x,
            meta_y,
        );
        meta_y -= LINE_GAP - 1.0;
        let status = match invoice.invoice.status {
            InvoiceStatus::Paid => "BETAALD",
            InvoiceStatus::Unpaid => "OPENSTAAND",
        };
        text(
            &layer,
            &fonts.regular,
            &format!("Status: {status}"),
            9.0,
            meta_x,
            meta_y,
        );

        // Customer block
        y -= 14.0;
        text(&layer, &fonts.bold, "Klant", 10.0, MARGIN_X, y);
        y -= LINE_GAP;
        text(&layer, &fonts.regular, &invoice.customer.name, 9.0, MARGIN_X, y);
        if let Some(address) = &invoice.customer.address {
            y -= LINE_GAP - 1.0;
            text(&layer, &fonts.regular, address, 9.0, MARGIN_X, y);
        }
        if let Some(vat) = &invoice.customer.vat_number {
            y -= LINE_GAP - 1.0;
            text(&layer, &fonts.regular, &format!("BTW {vat}"), 9.0, MARGIN_X, y);
        }

        // Vehicle block, when present
        let vehicle = vehicle_line(invoice);
        if !vehicle.is_empty() {
            y -= LINE_GAP;
            text(&layer, &fonts.regular, &vehicle, 9.0, MARGIN_X, y);
        }

        // Items table
        y -= 12.0;
        text(&layer, &fonts.bold, "Omschrijving", 9.0, MARGIN_X, y);
        text(&layer, &fonts.bold, "Maat", 9.0, 88.0, y);
        text(&layer, &fonts.bold, "Aantal", 9.0, 118.0, y);
        text(&layer, &fonts.bold, "Prijs", 9.0, 138.0, y);
        text(&layer, &fonts.bold, "BTW", 9.0, 158.0, y);
        text(&layer, &fonts.bold, "Totaal", 9.0, 175.0, y);
        y -= 2.0;
        rule(&layer, MARGIN_X, PAGE_W - MARGIN_X, y);
        y -= LINE_GAP;

        for (idx, item) in invoice.items.iter().enumerate() {
            if y < 60.0 {
                // Items continue on a fresh page; totals move there too.
                let (next_page, next_layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
                let layer = doc.get_page(next_page).get_layer(next_layer);
                return self.render_invoice_overflow(
                    doc,
                    layer,
                    fonts,
                    invoice,
                    idx,
                    PAGE_H - 20.0,
                );
            }
            text(&layer, &fonts.regular, &item.description, 9.0, MARGIN_X, y);
            text(
                &layer,
                &fonts.regular,
                item.size.as_deref().unwrap_or("-"),
                9.0,
                88.0,
                y,
            );
            text(&layer, &fonts.regular, &item.quantity.to_string(), 9.0, 118.0, y);
            text(&layer, &fonts.regular, &item.unit_price().format_plain(), 9.0, 138.0, y);
            text(
                &layer,
                &fonts.regular,
                &format!("{}%", item.vat_rate.percent()),
                9.0,
                158.0,
                y,
            );
            text(&layer, &fonts.regular, &item.line_total().format_plain(), 9.0, 175.0, y);
            y -= LINE_GAP;
        }

        y -= 2.0;
        rule(&layer, MARGIN_X, PAGE_W - MARGIN_X, y);
        y -= LINE_GAP + 1.0;

        // Totals block
        let totals_x = 138.0;
        text(&layer, &fonts.regular, "Subtotaal", 9.0, totals_x, y);
        text(
            &layer,
            &fonts.regular,
            &eur(invoice.invoice.subtotal()),
            9.0,
            175.0,
            y,
        );
        y -= LINE_GAP - 1.0;
        text(&layer, &fonts.regular, "BTW", 9.0, totals_x, y);
        text(
            &layer,
            &fonts.regular,
            &eur(invoice.invoice.vat_amount()),
            9.0,
            175.0,
            y,
        );
        y -= LINE_GAP;
        text(&layer, &fonts.bold, "Totaal", 10.0, totals_x, y);
        text(&layer, &fonts.bold, &eur(invoice.invoice.total()), 10.0, 175.0, y);
        y -= LINE_GAP;
        let method = match invoice.payment_method() {
            PaymentMethod::Cash => "contant",
            PaymentMethod::Pin => "PIN",
            PaymentMethod::Online => "overschrijving",
        };
        text(
            &layer,
            &fonts.regular,
            &format!("Betaald via {method}"),
            8.0,
            totals_x,
            y,
        );

        // Payment QR, bottom left
        let payload = payment_reference(
            invoice.invoice.total(),
            &invoice.invoice.invoice_number,
            &self.shop.iban,
            &self.shop.name,
        );
        draw_qr(&layer, &payload, MARGIN_X, 24.0 + QR_SIZE_MM);
        text(
            &layer,
            &fonts.regular,
            "Scan om te betalen",
            8.0,
            MARGIN_X,
            20.0,
        );

        save(doc)
    }

    /// Continuation page for long invoices: the remaining items plus the
    /// grand total. Kept deliberately plain; invoices with more than a page
    /// of lines are rare at this shop size.
    fn render_invoice_overflow(
        &self,
        doc: PdfDocumentReference,
        layer: PdfLayerReference,
        fonts: Fonts,
        invoice: &InvoiceWithRelations,
        from: usize,
        mut y: f32,
    ) -> ApiResult<Vec<u8>> {
        for item in &invoice.items[from..] {
            if y < 30.0 {
                break;
            }
            text(&layer, &fonts.regular, &item.description, 9.0, MARGIN_X, y);
            text(&layer, &fonts.regular, &item.line_total().format_plain(), 9.0, 175.0, y);
            y -= LINE_GAP;
        }
        y -= LINE_GAP;
        text(&layer, &fonts.bold, "Totaal", 10.0, 138.0, y);
        text(&layer, &fonts.bold, &eur(invoice.invoice.total()), 10.0, 175.0, y);
        save(doc)
    }

    // =========================================================================
    // Report
    // =========================================================================

    pub fn render_report(&self, data: &ReportData) -> ApiResult<Vec<u8>> {
        let period = format!("{:?}", data.window.period).to_lowercase();
        let title = format!("Rapport {period}");
        let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let fonts = Fonts::load(&doc)?;
        let layer = doc.get_page(page).get_layer(layer);

        let mut y = PAGE_H - 20.0;
        text(&layer, &fonts.bold, &self.shop.name, 14.0, MARGIN_X, y);
        y -= LINE_GAP + 2.0;
        text(
            &layer,
            &fonts.bold,
            &format!(
                "Omzetrapport {} ({} t/m {})",
                period,
                data.window.start.format("%d-%m-%Y"),
                data.window.end.format("%d-%m-%Y")
            ),
            11.0,
            MARGIN_X,
            y,
        );
        y -= 10.0;

        let stats = [
            ("Facturen".to_string(), data.stats.count.to_string()),
            ("Betaald".to_string(), data.stats.paid_count.to_string()),
            ("Openstaand".to_string(), data.stats.unpaid_count.to_string()),
            (
                "Omzet".to_string(),
                eur(Money::from_cents(data.stats.total_revenue_cents)),
            ),
            (
                "Uitstaand bedrag".to_string(),
                eur(Money::from_cents(data.stats.outstanding_cents)),
            ),
            (
                "BTW".to_string(),
                eur(Money::from_cents(data.stats.vat_cents)),
            ),
        ];
        for (label, value) in stats {
            text(&layer, &fonts.regular, &label, 9.0, MARGIN_X, y);
            text(&layer, &fonts.regular, &value, 9.0, 70.0, y);
            y -= LINE_GAP;
        }

        y -= 5.0;
        text(&layer, &fonts.bold, "Nummer", 9.0, MARGIN_X, y);
        text(&layer, &fonts.bold, "Klant", 9.0, 60.0, y);
        text(&layer, &fonts.bold, "Datum", 9.0, 120.0, y);
        text(&layer, &fonts.bold, "Status", 9.0, 148.0, y);
        text(&layer, &fonts.bold, "Totaal", 9.0, 172.0, y);
        y -= 2.0;
        rule(&layer, MARGIN_X, PAGE_W - MARGIN_X, y);
        y -= LINE_GAP;

        for invoice in &data.invoices {
            if y < 20.0 {
                break;
            }
            text(&layer, &fonts.regular, &invoice.invoice.invoice_number, 8.0, MARGIN_X, y);
            text(&layer, &fonts.regular, &invoice.customer.name, 8.0, 60.0, y);
            text(
                &layer,
                &fonts.regular,
                &invoice.invoice.issued_at.format("%d-%m-%Y").to_string(),
                8.0,
                120.0,
                y,
            );
            let status = match invoice.invoice.status {
                InvoiceStatus::Paid => "betaald",
                InvoiceStatus::Unpaid => "openstaand",
            };
            text(&layer, &fonts.regular, status, 8.0, 148.0, y);
            text(
                &layer,
                &fonts.regular,
                &invoice.invoice.total().format_plain(),
                8.0,
                172.0,
                y,
            );
            y -= LINE_GAP - 1.0;
        }

        save(doc)
    }
}

// =============================================================================
// Drawing Helpers
// =============================================================================

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> ApiResult<Fonts> {
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ApiError::pdf_render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ApiError::pdf_render(e.to_string()))?;
        Ok(Fonts { regular, bold })
    }
}

fn text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    content: &str,
    size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(content, size, Mm(x), Mm(y), font);
}

fn rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.set_outline_thickness(0.3);
    layer.add_line(printpdf::Line {
        points: vec![
            (printpdf::Point::new(Mm(x1), Mm(y)), false),
            (printpdf::Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

/// EUR amounts with a plain ASCII prefix; the builtin fonts have unreliable
/// glyph coverage for the euro sign.
fn eur(amount: Money) -> String {
    format!("EUR {}", amount.format_plain())
}

fn vehicle_line(invoice: &InvoiceWithRelations) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(model) = &invoice.invoice.vehicle_model {
        parts.push(model.clone());
    }
    if let Some(plate) = &invoice.invoice.license_plate {
        parts.push(plate.clone());
    }
    if let Some(mileage) = invoice.invoice.mileage {
        parts.push(format!("{mileage} km"));
    }
    parts.join("  -  ")
}

/// Draws the payment QR module-by-module as filled squares. `y_top` is the
/// top edge of the QR in page coordinates (origin bottom-left). When the
/// payload does not encode, the invoice renders without a QR.
fn draw_qr(layer: &PdfLayerReference, payload: &str, x: f32, y_top: f32) {
    let code = match QrCode::new(payload.as_bytes()) {
        Ok(code) => code,
        Err(err) => {
            warn!(%err, "Payment QR encoding failed, rendering invoice without it");
            return;
        }
    };

    let width = code.width();
    let module = QR_SIZE_MM / width as f32;
    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));

    for (idx, color) in code.to_colors().iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let col = (idx % width) as f32;
        let row = (idx / width) as f32;
        let left = x + col * module;
        let top = y_top - row * module;
        let rect = Rect::new(Mm(left), Mm(top - module), Mm(left + module), Mm(top))
            .with_mode(PaintMode::Fill);
        layer.add_rect(rect);
    }
}

fn save(doc: PdfDocumentReference) -> ApiResult<Vec<u8>> {
    let mut writer = BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer)
        .map_err(|e| ApiError::pdf_render(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| ApiError::pdf_render(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use factuur_core::report::{period_window, ReportPeriod, ReportStats};
    use factuur_core::types::{
        Customer, CustomerType, Invoice, InvoiceItem, Payment, PaymentStatus, VatRate,
    };

    fn shop() -> ShopConfig {
        ShopConfig {
            name: "Gent Bandenservice".to_string(),
            address: "Dorpsstraat 1, 9000 Gent".to_string(),
            iban: "BE92063645863623".to_string(),
            vat_number: "BE0123456789".to_string(),
            email: "info@voorbeeld.be".to_string(),
            phone: "+32 9 123 45 67".to_string(),
        }
    }

    fn full_invoice() -> InvoiceWithRelations {
        let now = Utc::now();
        let customer = Customer {
            id: "c1".to_string(),
            customer_type: CustomerType::Private,
            name: "Jan Janssens".to_string(),
            email: Some("jan@voorbeeld.be".to_string()),
            address: Some("Dorpsstraat 2".to_string()),
            vat_number: None,
            created_at: now,
        };
        let payment = Payment {
            id: "p1".to_string(),
            customer_id: "c1".to_string(),
            amount_total_cents: 41140,
            method: PaymentMethod::Pin,
            status: PaymentStatus::Paid,
            paid_at: now,
            created_at: now,
        };
        let invoice = Invoice {
            id: "i1".to_string(),
            invoice_number: "INV-202501-0001".to_string(),
            customer_id: "c1".to_string(),
            payment_id: "p1".to_string(),
            license_plate: Some("1-ABC-123".to_string()),
            mileage: Some(84_000),
            vehicle_model: Some("VW Golf".to_string()),
            subtotal_cents: 34000,
            vat_cents: 7140,
            total_cents: 41140,
            status: InvoiceStatus::Paid,
            issued_at: now,
            paid_at: now,
            created_at: now,
        };
        let items = vec![InvoiceItem {
            id: "it1".to_string(),
            invoice_id: "i1".to_string(),
            description: "Michelin Primacy 4".to_string(),
            size: Some("205/55 R16".to_string()),
            quantity: 4,
            unit_price_cents: 8500,
            vat_rate: VatRate::Standard,
            total_cents: 34000,
            position: 0,
        }];
        InvoiceWithRelations {
            invoice,
            customer,
            payment,
            items,
        }
    }

    #[test]
    fn test_invoice_pdf_renders_bytes() {
        let renderer = PdfRenderer::new(shop());
        let bytes = renderer.render_invoice(&full_invoice()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_report_pdf_renders_bytes() {
        let renderer = PdfRenderer::new(shop());
        let full = full_invoice();
        let data = ReportData {
            window: period_window(ReportPeriod::Daily, Utc::now().date_naive()),
            stats: ReportStats::fold([&full.invoice]),
            invoices: vec![full],
        };
        let bytes = renderer.render_report(&data).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
