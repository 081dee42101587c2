//! Detailed material export handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Response, StatusCode},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use super::dashboard::parse_range;
use super::invoices::filtered_invoices;
use crate::{request_actor, AppError, AppState};
use billet_core::models::InvoiceListEntry;
use billet_core::{
    AuditAction, AuditEvent, Error as CoreError, ExportFilter, ExportSelection, Notice,
    TimeRange, CSV_CONTENT_TYPE,
};

/// Request body for the material export
///
/// With no ticked `invoice_ids`, every invoice passing the filters is exported.
#[derive(Debug, Default, Deserialize)]
pub struct ExportMaterialsRequest {
    #[serde(default)]
    pub invoice_ids: Vec<i64>,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Nothing to export keeps its warning; any other failure gets the generic
/// export notice
fn export_failed(e: CoreError) -> AppError {
    match e {
        CoreError::NothingToExport(_) => AppError::from_core(e),
        e => {
            error!(error = %e, "Failed to export material data");
            AppError::internal("Failed to export data")
                .with_notice(Notice::error("Export Failed", "Failed to export data"))
        }
    }
}

/// POST /api/export/materials - Download the detailed material CSV
pub async fn export_materials(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response<Body>, AppError> {
    let actor = request_actor(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 100)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: ExportMaterialsRequest = if bytes.is_empty() {
        ExportMaterialsRequest::default()
    } else {
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?
    };

    let range = match req.range.as_deref() {
        Some(raw) => parse_range(Some(raw))?,
        None => TimeRange::All,
    };
    let selection = ExportSelection::with_selected(
        ExportFilter {
            search: req.search,
            date_from: req.from,
            date_to: req.to,
        },
        req.invoice_ids,
    );

    let invoices =
        filtered_invoices(&state, range, &selection.filter, None).map_err(export_failed)?;
    let shown: Vec<&InvoiceListEntry> = invoices.iter().collect();
    let candidates = selection.candidates(&shown);

    let file = state
        .db
        .export_detailed_csv(&candidates, Utc::now().date_naive())
        .map_err(export_failed)?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::ExportMaterials)
            .range(range)
            .invoices(&candidates)
            .export(&file),
    )?;

    info!(rows = file.row_count, file = %file.filename, "Exported material breakdown");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CSV_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.filename),
        )
        .body(Body::from(file.content))
        .map_err(|e| AppError::internal(&e.to_string()))
}
