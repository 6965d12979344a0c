// tests/router.rs
//
// Rotas que respondem antes de tocar no banco; o pool é preguiçoso.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use pos_backend::{
    build_router,
    config::{AppState, Config},
    models::auth::{User, UserRole},
};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;
use uuid::Uuid;

fn app_with(config: &Config) -> (Router, AppState) {
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    let state = AppState::from_pool(pool, config);
    (build_router(state.clone()), state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = app_with(&common::test_config());
    let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_protected_route_without_token_returns_token_missing() {
    let (app, _) = app_with(&common::test_config());
    let request = Request::builder().uri("/api/products").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn test_malformed_authorization_header_is_invalid_token() {
    let (app, _) = app_with(&common::test_config());
    let request = Request::builder()
        .method("POST")
        .uri("/api/sales")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_expired_token_is_rejected_before_user_lookup() {
    let mut config = common::test_config();
    config.jwt_expires_in_hours = -2;
    let (app, state) = app_with(&config);

    let user = User {
        id: Uuid::new_v4(),
        username: "caixa01".into(),
        email: "caixa01@loja.com".into(),
        password_hash: String::new(),
        full_name: "Caixa Um".into(),
        role: UserRole::Cashier,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let token = state.auth_service.create_token(&user).unwrap();

    let request = Request::builder()
        .uri("/api/inventory/alerts")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (app, _) = app_with(&common::test_config());
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/sales/{id}/cancel"].is_object());
}

#[tokio::test]
async fn test_malformed_body_is_a_json_validation_error() {
    let (app, _) = app_with(&common::test_config());
    let request = json_request("POST", "/api/auth/login", None, json!({ "username": 42 }));

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"]["body"].is_array());
}

#[tokio::test]
async fn test_missing_json_content_type_is_a_validation_error() {
    let (app, _) = app_with(&common::test_config());
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .body(Body::from(r#"{"username":"a","password":"b"}"#))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// Daqui para baixo o banco é real
async fn cashier_token(state: &AppState) -> (String, uuid::Uuid) {
    let cashier = common::create_user(state, "caixa01", UserRole::Cashier).await;
    let manager = common::create_user(state, "gerente", UserRole::Manager).await;
    let product = common::create_product(state, &manager, "A-001", 3).await;
    (state.auth_service.create_token(&cashier).unwrap(), product.product.id)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_sale_errors_render_as_json_bodies(pool: PgPool) {
    let state = common::state(pool);
    let (token, product_id) = cashier_token(&state).await;
    let app = build_router(state);

    let stock = json_request(
        "POST",
        "/api/sales",
        Some(&token),
        json!({ "items": [{ "product_id": product_id, "quantity": 4 }], "payment_method": "cash" }),
    );
    let (status, body) = send(app.clone(), stock).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "STOCK_ERROR");
    assert!(body["error"].as_str().unwrap().contains("Disponível: 3"));

    let payment = json_request(
        "POST",
        "/api/sales",
        Some(&token),
        json!({
            "items": [{ "product_id": product_id, "quantity": 1 }],
            "payment_method": "cash",
            "payment_details": [{ "method": "cash", "amount": 50 }]
        }),
    );
    let (status, body) = send(app.clone(), payment).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAYMENT_ERROR");

    let unknown_method = json_request(
        "POST",
        "/api/sales",
        Some(&token),
        json!({ "items": [{ "product_id": product_id, "quantity": 1 }], "payment_method": "bitcoin" }),
    );
    let (status, body) = send(app, unknown_method).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_bad_path_and_query_are_validation_errors(pool: PgPool) {
    let state = common::state(pool);
    let (token, _) = cashier_token(&state).await;
    let app = build_router(state);

    let bad_path = Request::builder()
        .uri("/api/sales/nao-e-uuid")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.clone(), bad_path).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let bad_query = Request::builder()
        .uri("/api/sales?page=abc")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, bad_query).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
