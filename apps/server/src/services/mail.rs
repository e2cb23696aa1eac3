//! Invoice delivery over SMTP.
//!
//! Sending acts on an already-persisted invoice, so a delivery failure never
//! taints the invoice itself; "saved but not emailed" is the email endpoint
//! returning an error.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;
use uuid::Uuid;

use factuur_core::types::InvoiceWithRelations;

use crate::config::SmtpConfig;
use crate::error::{ApiError, ApiResult};

/// Sends invoice PDFs as email attachments.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: SmtpConfig,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        Mailer { config }
    }

    /// Sends the invoice PDF to `to`. Returns the message id on success.
    ///
    /// The blocking SMTP transport runs on the blocking thread pool so the
    /// request handler's task is not stalled.
    pub async fn send_invoice(
        &self,
        to: &str,
        subject: &str,
        invoice: &InvoiceWithRelations,
        pdf: Vec<u8>,
        qr_data_url: &str,
    ) -> ApiResult<String> {
        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|_| ApiError::mail_delivery("Invalid From address in SMTP settings"))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|_| ApiError::validation(format!("Invalid recipient address: {to}")))?;

        let (text, html) = invoice_body(invoice, qr_data_url);
        let alternative = MultiPart::alternative()
            .singlepart(SinglePart::plain(text))
            .singlepart(SinglePart::html(html));

        let content_type = ContentType::parse("application/pdf")
            .map_err(|e| ApiError::internal(format!("PDF attachment content type: {e}")))?;
        let filename = format!("{}.pdf", invoice.invoice.invoice_number);
        let attachment = Attachment::new(filename).body(pdf, content_type);

        let message_id = format!("<{}@factuur>", Uuid::new_v4());
        let email = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .message_id(Some(message_id.clone()))
            .multipart(MultiPart::mixed().multipart(alternative).singlepart(attachment))
            .map_err(|e| ApiError::internal(format!("Failed to build email: {e}")))?;

        let transport = self.transport()?;
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| ApiError::internal(format!("Mail task failed: {e}")))?
            .map_err(|e| ApiError::mail_delivery(format!("Failed to send email: {e}")))?;

        info!(
            number = %invoice.invoice.invoice_number,
            to,
            %message_id,
            "Invoice emailed"
        );
        Ok(message_id)
    }

    fn transport(&self) -> ApiResult<SmtpTransport> {
        let host = self.config.host.trim();
        if host.is_empty() {
            return Err(ApiError::mail_delivery("SMTP host is not configured"));
        }

        let mut builder = if self.config.starttls {
            SmtpTransport::starttls_relay(host)
                .map_err(|e| ApiError::mail_delivery(format!("Invalid SMTP host: {e}")))?
                .port(self.config.port)
        } else {
            // Plain connection, for local relays only.
            SmtpTransport::builder_dangerous(host).port(self.config.port)
        };

        if !self.config.username.trim().is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }

        Ok(builder.build())
    }
}

/// Plain-text and HTML bodies. The HTML variant embeds the payment QR when
/// one could be rendered.
fn invoice_body(invoice: &InvoiceWithRelations, qr_data_url: &str) -> (String, String) {
    let number = &invoice.invoice.invoice_number;
    let total = invoice.invoice.total();
    let name = &invoice.customer.name;

    let text = format!(
        "Beste {name},\n\n\
         In de bijlage vindt u factuur {number} voor een bedrag van EUR {}.\n\n\
         Met vriendelijke groet",
        total.format_plain()
    );

    let qr_block = if qr_data_url.is_empty() {
        String::new()
    } else {
        format!(
            "<p>Scan om te betalen:</p><img src=\"{qr_data_url}\" \
             alt=\"Betaal-QR\" width=\"200\" height=\"200\" />"
        )
    };
    let html = format!(
        "<p>Beste {name},</p>\
         <p>In de bijlage vindt u factuur <strong>{number}</strong> voor een \
         bedrag van <strong>EUR {}</strong>.</p>\
         {qr_block}\
         <p>Met vriendelijke groet</p>",
        total.format_plain()
    );

    (text, html)
}

// =============================================================================
// Unit Tests
// =============================================================================
