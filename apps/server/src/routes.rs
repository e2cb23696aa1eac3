//! HTTP route handlers.
//!
//! Thin axum handlers over the service layer: parse/extract, call a service,
//! shape the response. JSON bodies are camelCase; the two PDF endpoints
//! return binary with a `Content-Disposition: attachment` header.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use factuur_core::epc::payment_reference;
use factuur_core::report::ReportPeriod;
use factuur_core::types::{Customer, InvoiceWithRelations};

use crate::dto::{
    CustomerLookup, DeleteResponse, EmailRequest, EmailResponse, HealthResponse, InvoiceInput,
    ReportData, ReportQuery, TopSizesQuery, TopSizesResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::services::invoice::InvoiceService;
use crate::services::mail::Mailer;
use crate::services::pdf::PdfRenderer;
use crate::services::qr;
use crate::services::report::ReportService;
use crate::AppState;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/invoices", post(create_invoice).get(list_invoices))
        .route(
            "/api/invoices/{id}",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/api/invoices/{id}/pdf", get(invoice_pdf))
        .route("/api/invoices/{id}/email", post(email_invoice))
        .route("/api/customers", get(list_customers))
        .route("/api/customers/lookup", get(lookup_customer))
        .route("/api/reports", get(report))
        .route("/api/reports/pdf", get(report_pdf))
        .route("/api/reports/top-sizes", get(top_sizes))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Invoices
// =============================================================================

async fn create_invoice(
    State(state): State<Arc<AppState>>,
    Json(input): Json<InvoiceInput>,
) -> ApiResult<(StatusCode, Json<InvoiceWithRelations>)> {
    let created = InvoiceService::new(state.db.clone()).create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_invoices(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<InvoiceWithRelations>>> {
    Ok(Json(InvoiceService::new(state.db.clone()).list().await?))
}

async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceWithRelations>> {
    Ok(Json(InvoiceService::new(state.db.clone()).get(&id).await?))
}

async fn update_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<InvoiceInput>,
) -> ApiResult<Json<InvoiceWithRelations>> {
    Ok(Json(
        InvoiceService::new(state.db.clone()).update(&id, input).await?,
    ))
}

async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = InvoiceService::new(state.db.clone()).delete(&id).await?;
    Ok(Json(DeleteResponse { deleted }))
}

async fn invoice_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let invoice = InvoiceService::new(state.db.clone()).get(&id).await?;
    let pdf = PdfRenderer::new(state.config.shop.clone()).render_invoice(&invoice)?;

    Ok(pdf_response(&invoice.invoice.invoice_number, pdf))
}

async fn email_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<EmailRequest>,
) -> ApiResult<Json<EmailResponse>> {
    let invoice = InvoiceService::new(state.db.clone()).get(&id).await?;

    let to = request
        .to
        .or_else(|| invoice.customer.email.clone())
        .ok_or_else(|| {
            ApiError::validation("No recipient: the customer has no email address")
        })?;
    let subject = request
        .subject
        .unwrap_or_else(|| format!("Factuur {}", invoice.invoice.invoice_number));

    let pdf = PdfRenderer::new(state.config.shop.clone()).render_invoice(&invoice)?;
    let payload = payment_reference(
        invoice.invoice.total(),
        &invoice.invoice.invoice_number,
        &state.config.shop.iban,
        &state.config.shop.name,
    );
    let qr_data_url = qr::data_url(&payload);

    let message_id = Mailer::new(state.config.smtp.clone())
        .send_invoice(&to, &subject, &invoice, pdf, &qr_data_url)
        .await?;

    Ok(Json(EmailResponse {
        success: true,
        message_id,
    }))
}

// =============================================================================
// Customers
// =============================================================================

async fn list_customers(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(
        InvoiceService::new(state.db.clone()).list_customers().await?,
    ))
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    email: String,
}

async fn lookup_customer(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<CustomerLookup>> {
    let found = InvoiceService::new(state.db.clone())
        .lookup_customer(&query.email)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No customer with email {}", query.email)))?;

    Ok(Json(found))
}

// =============================================================================
// Reports
// =============================================================================

async fn report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<ReportData>> {
    let (period, anchor) = parse_report_query(&query)?;
    Ok(Json(
        ReportService::new(state.db.clone()).report(period, anchor).await?,
    ))
}

async fn report_pdf(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let (period, anchor) = parse_report_query(&query)?;
    let data = ReportService::new(state.db.clone()).report(period, anchor).await?;
    let pdf = PdfRenderer::new(state.config.shop.clone()).render_report(&data)?;

    let name = format!("rapport-{}-{anchor}", query.period.trim().to_lowercase());
    Ok(pdf_response(&name, pdf))
}

async fn top_sizes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopSizesQuery>,
) -> ApiResult<Json<TopSizesResponse>> {
    let sizes = ReportService::new(state.db.clone())
        .top_sizes(query.limit, query.from, query.to)
        .await?;
    Ok(Json(TopSizesResponse { sizes }))
}

fn parse_report_query(query: &ReportQuery) -> ApiResult<(ReportPeriod, chrono::NaiveDate)> {
    let period = ReportPeriod::from_str(&query.period).map_err(ApiError::validation)?;
    let anchor = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok((period, anchor))
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        timestamp: Utc::now(),
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn pdf_response(name: &str, pdf: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}.pdf\""),
            ),
        ],
        pdf,
    )
        .into_response()
}
