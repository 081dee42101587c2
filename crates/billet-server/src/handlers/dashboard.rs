//! Dashboard handlers
//!
//! `GET /api/dashboard` is stateless: it computes analytics for the requested
//! range and returns them. The `/view` routes drive the shared
//! `DashboardView`, where only the most recently started refresh may commit.

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{request_actor, AppError, AppState};
use billet_core::models::Analytics;
use billet_core::{
    load_analytics, AuditAction, AuditEvent, DashboardSnapshot, Notice, TimeRange,
};

/// Query parameters for the dashboard
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// 7days, 30days, 90days or all (default 30days)
    pub range: Option<String>,
}

/// Request body for changing the dashboard range
#[derive(Debug, Deserialize)]
pub struct SetRangeRequest {
    pub range: String,
}

pub(crate) fn parse_range(raw: Option<&str>) -> Result<TimeRange, AppError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => r.parse::<TimeRange>().map_err(|e: String| AppError::bad_request(&e)),
        None => Ok(TimeRange::default()),
    }
}

/// GET /api/dashboard - Analytics for a time range
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
    request: Request,
) -> Result<Json<Analytics>, AppError> {
    let actor = request_actor(request.headers());
    let range = parse_range(params.range.as_deref())?;

    let analytics = load_analytics(&state.db, range, Utc::now()).await;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::ViewDashboard).range(range),
    )?;

    Ok(Json(analytics))
}

/// GET /api/dashboard/view - Current shared dashboard state
pub async fn get_dashboard_view(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSnapshot>, AppError> {
    let view = state.dashboard.read().await;
    Ok(Json(view.snapshot()))
}

/// POST /api/dashboard/view/range - Select a range and refresh the view
///
/// A request that finishes after a newer one started is discarded; the
/// response always reflects the latest committed state.
pub async fn set_dashboard_range(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<DashboardSnapshot>, AppError> {
    let actor = request_actor(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), 1024)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: SetRangeRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;
    let range = parse_range(Some(&req.range))?;

    let ticket = state.dashboard.write().await.begin_refresh(range);

    let db = state.db.clone();
    let loaded = tokio::spawn(async move { load_analytics(&db, range, Utc::now()).await }).await;

    let snapshot = {
        let mut view = state.dashboard.write().await;
        let applied = match loaded {
            Ok(analytics) => view.commit(ticket, analytics),
            Err(e) => {
                warn!(error = %e, "Dashboard refresh task failed");
                view.fail(
                    ticket,
                    Notice::error("Load Failed", "Failed to load dashboard data."),
                )
            }
        };
        if !applied {
            debug!(generation = ticket.generation(), "Discarded stale dashboard refresh");
        }
        view.snapshot()
    };

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::SetDashboardRange).range(range),
    )?;

    Ok(Json(snapshot))
}
