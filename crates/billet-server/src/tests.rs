//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use billet_core::models::{InvoiceStatus, NewClient, NewInvoice, NewInvoiceItem, NewItemMaterial};
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    };
    create_router(db, None, config)
}

/// Two invoices dated today: one for a named client, one without a client
fn setup_seeded_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let today = Utc::now().date_naive();

    let client = db
        .create_client(&NewClient {
            name: "Nile Builders".to_string(),
            ..Default::default()
        })
        .unwrap();

    db.create_invoice(&NewInvoice {
        invoice_no: "INV-001".to_string(),
        client_id: Some(client.id),
        project_name: "Villa".to_string(),
        invoice_date: today,
        due_date: None,
        discount: 0.0,
        vat_rate: 0.0,
        notes: String::new(),
        status: InvoiceStatus::Paid,
        items: vec![NewInvoiceItem {
            category: "Kitchens".to_string(),
            code: "K-1".to_string(),
            description: "Kitchen, with island".to_string(),
            qty: 2.0,
            unit_price: 500.0,
            materials: vec![NewItemMaterial {
                material_name: "MDF".to_string(),
                unit: "sheet".to_string(),
                qty_per_item: 3.0,
                unit_cost: 40.0,
            }],
            ..Default::default()
        }],
    })
    .unwrap();

    db.create_invoice(&NewInvoice {
        invoice_no: "INV-002".to_string(),
        client_id: None,
        project_name: String::new(),
        invoice_date: today,
        due_date: None,
        discount: 0.0,
        vat_rate: 0.0,
        notes: String::new(),
        status: InvoiceStatus::Draft,
        items: vec![NewInvoiceItem {
            category: "Wardrobes".to_string(),
            qty: 1.0,
            unit_price: 250.0,
            ..Default::default()
        }],
    })
    .unwrap();

    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    (create_router(db.clone(), None, config), db)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ========== Dashboard API Tests ==========

#[tokio::test]
async fn test_dashboard_empty() {
    let app = setup_test_app();

    let response = app.oneshot(get_request("/api/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["range"], "30days");
    assert_eq!(json["summary"]["total_invoices"], 0);
    assert_eq!(json["summary"]["avg_invoice_value"], 0.0);
    assert!(json["time_series"].as_array().unwrap().is_empty());
    assert!(json["top_clients"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_with_data() {
    let (app, _db) = setup_seeded_app();

    let response = app
        .oneshot(get_request("/api/dashboard?range=7days"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["range"], "7days");
    assert_eq!(json["summary"]["total_invoices"], 2);
    assert_eq!(json["summary"]["total_revenue"], 1250.0);
    assert_eq!(json["summary"]["paid_count"], 1);
    assert_eq!(json["summary"]["draft_count"], 1);

    // Same day collapses to one point
    let series = json["time_series"].as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["invoice_count"], 2);
    assert_eq!(series[0]["revenue"], 1250.0);

    let categories = json["categories"].as_array().unwrap();
    assert_eq!(categories[0]["category"], "Kitchens");
    assert_eq!(categories[0]["revenue"], 1000.0);

    let materials = json["materials"].as_array().unwrap();
    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0]["material_name"], "MDF");
    assert_eq!(materials[0]["total_qty"], 6.0);
    assert_eq!(materials[0]["total_cost"], 240.0);

    let clients = json["top_clients"].as_array().unwrap();
    assert_eq!(clients[0]["client_name"], "Nile Builders");
    assert_eq!(clients[1]["client_name"], "Unknown");
}

#[tokio::test]
async fn test_dashboard_invalid_range() {
    let app = setup_test_app();

    let response = app
        .oneshot(get_request("/api/dashboard?range=fortnight"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Unknown time range"));
}

#[tokio::test]
async fn test_dashboard_view_range_change() {
    let (app, _db) = setup_seeded_app();

    let response = app
        .clone()
        .oneshot(get_request("/api/dashboard/view"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["generation"], 0);
    assert!(json["analytics"].is_null());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/dashboard/view/range",
            serde_json::json!({ "range": "all" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["range"], "all");
    assert_eq!(json["generation"], 1);
    assert_eq!(json["loading"], false);
    assert_eq!(json["analytics"]["summary"]["total_invoices"], 2);

    // State persists between requests
    let response = app
        .oneshot(get_request("/api/dashboard/view"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["range"], "all");
    assert_eq!(json["generation"], 1);
}

#[tokio::test]
async fn test_dashboard_view_rejects_unknown_range() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/dashboard/view/range",
            serde_json::json!({ "range": "yesterday" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Client API Tests ==========

#[tokio::test]
async fn test_create_and_get_client() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/clients",
            serde_json::json!({ "name": "Delta Homes", "phone": "0100" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["name"], "Delta Homes");
    let id = json["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/clients/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["phone"], "0100");

    let response = app.oneshot(get_request("/api/clients")).await.unwrap();
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_client_requires_name() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/clients",
            serde_json::json!({ "name": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_client_not_found() {
    let app = setup_test_app();

    let response = app.oneshot(get_request("/api/clients/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Invoice API Tests ==========

#[tokio::test]
async fn test_create_invoice() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "invoice_no": "INV-100",
        "invoice_date": "2024-03-01",
        "vat_rate": 10,
        "items": [{
            "category": "Kitchens",
            "qty": 2,
            "unit_price": 100,
            "materials": [{
                "material_name": "MDF",
                "unit": "sheet",
                "qty_per_item": 3,
                "unit_cost": 10
            }]
        }]
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/invoices", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["invoice"]["subtotal"], 200.0);
    assert_eq!(json["invoice"]["vat_amount"], 20.0);
    assert_eq!(json["invoice"]["total"], 220.0);
    assert_eq!(json["invoice"]["status"], "draft");
    assert_eq!(json["items"][0]["line_total"], 200.0);
    assert_eq!(json["items"][0]["materials"][0]["total_qty"], 6.0);

    // Same number again conflicts
    let response = app
        .oneshot(json_request("POST", "/api/invoices", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_invoice_invalid_json() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/invoices")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "Invalid JSON");
}

#[tokio::test]
async fn test_list_invoices_with_search() {
    let (app, _db) = setup_seeded_app();

    let response = app
        .clone()
        .oneshot(get_request("/api/invoices"))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 2);

    let response = app
        .oneshot(get_request("/api/invoices?search=nile"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let invoices = json.as_array().unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0]["invoice_no"], "INV-001");
    assert_eq!(invoices[0]["client_name"], "Nile Builders");
}

#[tokio::test]
async fn test_get_invoice_details() {
    let (app, db) = setup_seeded_app();
    let id = db.list_invoices(&Default::default()).unwrap()[0].id;

    let response = app
        .oneshot(get_request(&format!("/api/invoices/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["invoice"]["id"], id);
    assert!(json["items"].as_array().is_some());
}

#[tokio::test]
async fn test_get_invoice_not_found_redirects() {
    let app = setup_test_app();

    let response = app.oneshot(get_request("/api/invoices/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = get_body_json(response).await;
    assert_eq!(json["notice"]["level"], "error");
    assert_eq!(json["notice"]["title"], "Load Failed");
    assert_eq!(json["notice"]["message"], "Failed to load invoice details.");
    assert_eq!(json["redirect"]["to"], "/dashboard");
    assert_eq!(json["redirect"]["after_ms"], 2000);
    assert!(json.get("invoice").is_none());
}

#[tokio::test]
async fn test_update_invoice_status() {
    let (app, db) = setup_seeded_app();
    let id = db
        .list_invoices(&Default::default())
        .unwrap()
        .into_iter()
        .find(|inv| inv.invoice_no == "INV-002")
        .unwrap()
        .id;

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/invoices/{}/status", id),
            serde_json::json!({ "status": "sent" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        db.get_invoice(id).unwrap().unwrap().status,
        InvoiceStatus::Sent
    );

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/invoices/{}/status", id),
            serde_json::json!({ "status": "void" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/api/invoices/999/status",
            serde_json::json!({ "status": "paid" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_invoice() {
    let (app, db) = setup_seeded_app();
    let id = db.list_invoices(&Default::default()).unwrap()[0].id;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/invoices/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["success"], true);

    let response = app
        .oneshot(get_request(&format!("/api/invoices/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Export API Tests ==========

#[tokio::test]
async fn test_export_materials_csv() {
    let (app, _db) = setup_seeded_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/export/materials",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert_eq!(content_type, "text/csv; charset=utf-8");

    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let expected = format!(
        "attachment; filename=\"material-breakdown-detailed-{}.csv\"",
        Utc::now().date_naive().format("%Y-%m-%d")
    );
    assert_eq!(disposition, expected);

    let body = get_body_text(response).await;
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    assert_eq!(&reader.headers().unwrap()[0], "Date");

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    // One material row for INV-001, one bare item row for INV-002
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][2], "INV-001");
    assert_eq!(&records[0][4], "Kitchen, with island");
    assert_eq!(&records[0][5], "MDF");
    assert_eq!(&records[0][9], "240.00");
    assert_eq!(&records[1][5], "");
}

#[tokio::test]
async fn test_export_selected_invoice_only() {
    let (app, db) = setup_seeded_app();
    let id = db
        .list_invoices(&Default::default())
        .unwrap()
        .into_iter()
        .find(|inv| inv.invoice_no == "INV-002")
        .unwrap()
        .id;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/export/materials",
            serde_json::json!({ "invoice_ids": [id] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = get_body_text(response).await;
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(&records[0][2], "INV-002");
}

#[tokio::test]
async fn test_export_nothing_to_export() {
    let (app, _db) = setup_seeded_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/export/materials",
            serde_json::json!({ "search": "no such invoice" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No invoices selected for export");
    assert_eq!(json["notice"]["level"], "warning");
}

#[tokio::test]
async fn test_export_storage_failure_carries_notice() {
    let (app, db) = setup_seeded_app();
    db.conn()
        .unwrap()
        .execute_batch("DROP TABLE invoices;")
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/export/materials",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Failed to export data");
    assert_eq!(json["notice"]["level"], "error");
    assert_eq!(json["notice"]["title"], "Export Failed");
}

// ========== Audit API Tests ==========

#[tokio::test]
async fn test_audit_log_records_requests() {
    let (app, _db) = setup_seeded_app();

    app.clone()
        .oneshot(get_request("/api/dashboard?range=90days"))
        .await
        .unwrap();

    let response = app.oneshot(get_request("/api/audit?limit=10")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries[0]["action"], "view_dashboard");
    assert_eq!(entries[0]["range"], "90days");
    assert_eq!(entries[0]["actor"], "local-dev");
}

#[tokio::test]
async fn test_audit_log_records_export() {
    let (app, db) = setup_seeded_app();
    let ids: Vec<i64> = db
        .list_invoices(&Default::default())
        .unwrap()
        .iter()
        .map(|inv| inv.id)
        .collect();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/export/materials",
            serde_json::json!({ "range": "30days" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    app.clone()
        .oneshot(get_request(&format!("/api/invoices/{}", ids[0])))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/api/audit?action=export_materials"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);

    let export = &entries[0];
    assert_eq!(export["range"], "30days");
    assert_eq!(export["row_count"], 2);
    let mut exported: Vec<i64> = export["invoice_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    exported.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(exported, expected);
    assert!(export["export_file"]
        .as_str()
        .unwrap()
        .starts_with("material-breakdown-detailed-"));

    // Everything that touched the first invoice: the detail view and the export
    let response = app
        .oneshot(get_request(&format!("/api/audit?invoice_id={}", ids[0])))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let actions: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["view_invoice", "export_materials"]);
}

#[tokio::test]
async fn test_audit_log_rejects_unknown_action() {
    let app = setup_test_app();

    let response = app
        .oneshot(get_request("/api/audit?action=export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Authentication Tests ==========

fn setup_auth_app() -> Router {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        allowed_origins: vec![],
        api_keys: vec!["test-key-123".to_string()],
    };
    create_router(db, None, config)
}

#[tokio::test]
async fn test_auth_required() {
    let app = setup_auth_app();

    let response = app.oneshot(get_request("/api/dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        get_body_json(response).await["error"],
        "Authentication required"
    );
}

#[tokio::test]
async fn test_auth_rejects_wrong_key() {
    let app = setup_auth_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/dashboard")
                .header("authorization", "Bearer wrong-key-12")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_with_api_key() {
    let app = setup_auth_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/dashboard")
                .header("authorization", "Bearer test-key-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_parse_api_keys() {
    assert_eq!(
        parse_api_keys(" alpha, ,beta ,"),
        vec!["alpha".to_string(), "beta".to_string()]
    );
    assert!(parse_api_keys("").is_empty());
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc".to_string()];
    assert!(validate_api_key("abc", &keys));
    assert!(!validate_api_key("abd", &keys));
    assert!(!validate_api_key("abcd", &keys));
    assert!(!validate_api_key("abc", &[]));
}

// ========== Security Header Tests ==========

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();

    let response = app.oneshot(get_request("/api/clients")).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}
