//! Audit trail handler

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{request_actor, AppError, AppState, MAX_PAGE_LIMIT};
use billet_core::{AuditAction, AuditEntry, AuditEvent, AuditQuery};

/// Query parameters for the audit trail
#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    pub limit: Option<i64>,
    /// e.g. `export_materials`
    pub action: Option<String>,
    /// Only requests that touched this invoice
    pub invoice_id: Option<i64>,
}

/// GET /api/audit - Recorded requests, newest first
pub async fn list_audit_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditListQuery>,
    request: Request,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let actor = request_actor(request.headers());

    let action = params
        .action
        .as_deref()
        .map(str::parse::<AuditAction>)
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;
    let query = AuditQuery {
        limit: params
            .limit
            .unwrap_or(AuditQuery::default().limit)
            .max(1)
            .min(MAX_PAGE_LIMIT),
        action,
        invoice_id: params.invoice_id,
    };

    let entries = state.db.list_audit_log(&query)?;

    let mut event = AuditEvent::new(AuditAction::ListAudit).returned(entries.len());
    if let Some(invoice_id) = query.invoice_id {
        event = event.invoice(invoice_id);
    }
    state.db.log_audit(&actor, &event)?;

    Ok(Json(entries))
}
