//! Client handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};

use crate::{request_actor, AppError, AppState};
use billet_core::models::{Client, NewClient};
use billet_core::{AuditAction, AuditEvent};

/// GET /api/clients - List all clients
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Client>>, AppError> {
    let actor = request_actor(request.headers());

    let clients = state.db.list_clients()?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::ListClients).returned(clients.len()),
    )?;

    Ok(Json(clients))
}

/// POST /api/clients - Create a client
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Client>, AppError> {
    let actor = request_actor(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 10)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: NewClient =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let client = state.db.create_client(&req).map_err(AppError::from_core)?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::CreateClient)
            .client(client.id)
            .details(format!("name={}", client.name)),
    )?;

    Ok(Json(client))
}

/// GET /api/clients/:id - Get a single client
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Client>, AppError> {
    let actor = request_actor(request.headers());

    let client = state
        .db
        .get_client(id)?
        .ok_or_else(|| AppError::not_found(&format!("Client {} not found", id)))?;

    state.db.log_audit(
        &actor,
        &AuditEvent::new(AuditAction::ViewClient).client(id),
    )?;

    Ok(Json(client))
}
