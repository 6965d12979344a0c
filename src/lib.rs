// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc, middleware::auth::auth_guard};

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// Monta o router completo. Tudo fora de /api/health, /api/auth/login e
/// /swagger-ui passa pelo `auth_guard`.
pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let public_auth_routes = Router::new().route("/login", post(handlers::auth::login));

    // Define as rotas de usuário (protegidas pelo middleware)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/me", get(handlers::auth::get_me))
        .route("/change-password", put(handlers::auth::change_password))
        .route("/users", get(handlers::auth::list_users))
        .route("/users/{user_id}/status", put(handlers::auth::update_user_status))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let product_routes = Router::new()
        .route("/"
               ,get(handlers::catalog::list_products)
               .post(handlers::catalog::create_product)
        )
        .route("/barcode/{barcode}", get(handlers::catalog::get_product_by_barcode))
        .route("/{id}"
               ,get(handlers::catalog::get_product)
               .put(handlers::catalog::update_product)
               .delete(handlers::catalog::delete_product)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let category_routes = Router::new()
        .route("/"
               ,get(handlers::catalog::list_categories)
               .post(handlers::catalog::create_category)
        )
        .route("/hierarchy", get(handlers::catalog::category_hierarchy))
        .route("/{id}"
               ,get(handlers::catalog::get_category)
               .put(handlers::catalog::update_category)
               .delete(handlers::catalog::delete_category)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let inventory_routes = Router::new()
        .route("/", get(handlers::inventory::overview))
        .route("/alerts", get(handlers::inventory::alerts))
        .route("/transactions", get(handlers::inventory::transactions))
        .route("/stats", get(handlers::inventory::stats))
        .route("/reconciliation", get(handlers::inventory::reconciliation))
        .route("/bulk-adjust", put(handlers::inventory::bulk_adjust))
        .route("/{product_id}/adjust", put(handlers::inventory::adjust))
        .route("/{product_id}/thresholds", put(handlers::inventory::update_thresholds))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let sales_routes = Router::new()
        .route("/"
               ,post(handlers::sales::create_sale)
               .get(handlers::sales::list_sales)
        )
        // Indicadores (rotas estáticas têm prioridade sobre /{id})
        .route("/stats", get(handlers::dashboard::get_sales_stats))
        .route("/daily-summary", get(handlers::dashboard::get_daily_summary))
        .route("/{id}", get(handlers::sales::get_sale))
        .route("/{id}/receipt", get(handlers::sales::get_receipt))
        .route("/{id}/refund", post(handlers::sales::refund_sale))
        .route("/{id}/cancel", post(handlers::sales::cancel_sale))
        .route("/{id}/complete", post(handlers::sales::complete_sale))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let settings_routes = Router::new()
        .route("/shop"
               ,get(handlers::settings::get_shop_settings)
               .put(handlers::settings::update_shop_settings)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(health))
        .nest("/api/auth", public_auth_routes.merge(auth_routes))
        .nest("/api/products", product_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/inventory", inventory_routes)
        .nest("/api/sales", sales_routes)
        .nest("/api/settings", settings_routes)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
