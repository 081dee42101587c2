//! Billet Web Server
//!
//! Axum-based REST API for the Billet invoice analytics tool.
//!
//! Security features:
//! - API key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Audit logging for API access
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use billet_core::db::Database;
use billet_core::{DashboardView, Error as CoreError, Notice};

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Environment variable holding comma-separated API keys
pub const API_KEYS_ENV: &str = "BILLET_API_KEYS";

/// Where a client should go after a missing-resource error
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Delay before redirecting away from a missing invoice
pub const DETAIL_REDIRECT_DELAY_MS: u64 = 2000;

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as `Authorization: Bearer <key>`
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

impl ServerConfig {
    /// Read API keys from `BILLET_API_KEYS`
    pub fn api_keys_from_env() -> Vec<String> {
        std::env::var(API_KEYS_ENV)
            .map(|raw| parse_api_keys(&raw))
            .unwrap_or_default()
    }
}

/// Split a comma-separated key list, dropping blanks
pub fn parse_api_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Dashboard view state shared by every client
    pub dashboard: RwLock<DashboardView>,
}

/// Authentication middleware - validates API keys
///
/// Keys are compared in constant time.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // Constant-time only for same-length keys
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Identify the caller for audit logging
/// Returns "api-key" for API key auth, or "local-dev" for unauthenticated
pub fn request_actor(headers: &axum::http::HeaderMap) -> String {
    if headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some()
    {
        return "api-key".to_string();
    }

    "local-dev".to_string()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        dashboard: RwLock::new(DashboardView::new()),
    });

    let api_routes = Router::new()
        // Dashboard
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/dashboard/view", get(handlers::get_dashboard_view))
        .route("/dashboard/view/range", post(handlers::set_dashboard_range))
        // Clients
        .route(
            "/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route("/clients/:id", get(handlers::get_client))
        // Invoices
        .route(
            "/invoices",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route(
            "/invoices/:id",
            get(handlers::get_invoice).delete(handlers::delete_invoice),
        )
        .route("/invoices/:id/status", patch(handlers::update_invoice_status))
        // Export
        .route("/export/materials", post(handlers::export_materials))
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .expose_headers([header::CONTENT_DISPOSITION])
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve the UI bundle if a directory was provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server with default configuration
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        warn!(
            "⚠️  Authentication required but no API keys configured (set {})",
            API_KEYS_ENV
        );
    }

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Client-side navigation hint attached to some errors
#[derive(Debug, Clone, Serialize)]
pub struct RedirectHint {
    pub to: String,
    pub after_ms: u64,
}

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    notice: Option<Notice>,
    redirect: Option<RedirectHint>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            notice: None,
            redirect: None,
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    /// Attach a user-facing notice
    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    /// Ask the client to navigate to `to` after `after_ms`
    pub fn with_redirect(mut self, to: &str, after_ms: u64) -> Self {
        self.redirect = Some(RedirectHint {
            to: to.to_string(),
            after_ms,
        });
        self
    }

    /// Map a core error onto the matching status; storage failures stay
    /// internal and are only logged
    pub fn from_core(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => Self::not_found(&msg),
            CoreError::Conflict(msg) => Self::conflict(&msg),
            CoreError::InvalidData(msg) => Self::bad_request(&msg),
            CoreError::InvalidNumber { field, value } => {
                Self::bad_request(&format!("Invalid number in {}: {}", field, value))
            }
            CoreError::NothingToExport(msg) => {
                Self::bad_request(&msg).with_notice(Notice::warning("Nothing to Export", msg))
            }
            other => Self::from(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let mut body = serde_json::json!({
            "error": self.message
        });
        if let Some(notice) = &self.notice {
            body["notice"] = serde_json::json!(notice);
        }
        if let Some(redirect) = &self.redirect {
            body["redirect"] = serde_json::json!(redirect);
        }

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            notice: None,
            redirect: None,
            // Keep full error for logging
            internal: Some(err.into()),
        }
    }
}

#[cfg(test)]
mod tests;
