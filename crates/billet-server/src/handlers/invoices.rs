//! Invoice handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::dashboard::parse_range;
use crate::{
    request_actor, AppError, AppState, SuccessResponse, DASHBOARD_PATH,
    DETAIL_REDIRECT_DELAY_MS, MAX_PAGE_LIMIT,
};
use billet_core::models::{
    InvoiceDetails, InvoiceListEntry, InvoiceQuery, InvoiceStatus, NewInvoice,
};
use billet_core::{AuditAction, AuditEvent, ExportFilter, Notice, TimeRange};

/// Query parameters for listing invoices
#[derive(Debug, Deserialize)]
pub struct InvoiceListQuery {
    /// Time range preset; omitted means all time
    pub range: Option<String>,
    /// Matches invoice number or client name
    pub search: Option<String>,
    /// Inclusive start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    pub to: Option<String>,
    pub limit: Option<i64>,
}

/// Request body for a status change
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Load the invoice list for `range` and narrow it with `filter`
pub(crate) fn filtered_invoices(
    state: &AppState,
    range: TimeRange,
    filter: &ExportFilter,
    limit: Option<i64>,
) -> billet_core::Result<Vec<InvoiceListEntry>> {
    let query = InvoiceQuery {
        since: range.lower_bound(Utc::now()),
        limit: limit.map(|l| l.max(1).min(MAX_PAGE_LIMIT)),
    };
    let invoices = state.db.list_invoices(&query)?;
    Ok(filter.apply(&invoices).into_iter().cloned().collect())
}

/// GET /api/invoices - List invoices, newest first
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InvoiceListQuery>,
    request: Request,
) -> Result<Json<Vec<InvoiceListEntry>>, AppError> {
    let actor = request_actor(request.headers());

    let range = match params.range.as_deref() {
        Some(raw) => parse_range(Some(raw))?,
        None => TimeRange::All,
    };
    let filter = ExportFilter {
        search: params.search.clone(),
        date_from: params.from.clone(),
        date_to: params.to.clone(),
    };

    let invoices = filtered_invoices(&state, range, &filter, params.limit)?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::ListInvoices)
            .range(range)
            .returned(invoices.len())
            .details(format!(
                "search={:?}, from={:?}, to={:?}",
                params.search, params.from, params.to
            )),
    )?;

    Ok(Json(invoices))
}

/// POST /api/invoices - Create an invoice with its items and materials
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<InvoiceDetails>, AppError> {
    let actor = request_actor(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: NewInvoice =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let details = state.db.create_invoice(&req).map_err(AppError::from_core)?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::CreateInvoice)
            .invoice(details.invoice.id)
            .client(details.invoice.client_id)
            .details(format!(
                "invoice_no={}, items={}",
                details.invoice.invoice_no,
                details.items.len()
            )),
    )?;

    Ok(Json(details))
}

/// GET /api/invoices/:id - Invoice with client, items and materials
///
/// A missing invoice answers 404 with a notice and a hint to return to the
/// dashboard.
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<InvoiceDetails>, AppError> {
    let actor = request_actor(request.headers());

    let details = state.db.get_invoice_details(id)?.ok_or_else(|| {
        AppError::not_found(&format!("Invoice {} not found", id))
            .with_notice(Notice::error(
                "Load Failed",
                "Failed to load invoice details.",
            ))
            .with_redirect(DASHBOARD_PATH, DETAIL_REDIRECT_DELAY_MS)
    })?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::ViewInvoice)
            .invoice(id)
            .client(details.invoice.client_id),
    )?;

    Ok(Json(details))
}

/// PATCH /api/invoices/:id/status - Change an invoice's status
pub async fn update_invoice_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = request_actor(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), 1024)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: UpdateStatusRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let status: InvoiceStatus = req
        .status
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    state
        .db
        .update_invoice_status(id, status)
        .map_err(AppError::from_core)?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::UpdateInvoiceStatus)
            .invoice(id)
            .details(format!("status={}", status)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/invoices/:id - Delete an invoice and its items
pub async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = request_actor(request.headers());

    let invoice = state
        .db
        .get_invoice(id)?
        .ok_or_else(|| AppError::not_found(&format!("Invoice {} not found", id)))?;

    state.db.delete_invoice(id).map_err(AppError::from_core)?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::DeleteInvoice)
            .invoice(id)
            .client(invoice.client_id)
            .details(format!("invoice_no={}", invoice.invoice_no)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}
