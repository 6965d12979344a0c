// src/handlers/inventory.rs

use axum::extract::State;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, extract::{Json, Path, Query}},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AdminOnly, ManagerOrAdmin, RequireRole},
    },
    models::inventory::{
        AdjustInventoryPayload, AdjustInventoryResponse, BulkAdjustPayload, BulkAdjustResponse,
        InventoryAlerts, InventoryFilter, InventoryListResponse, InventoryStats,
        ReconciliationReport, ThresholdsResponse, TransactionFilter, TransactionListResponse,
        UpdateThresholdsPayload,
    },
};

// GET /api/inventory
#[utoipa::path(
    get,
    path = "/api/inventory",
    tag = "Inventory",
    params(InventoryFilter),
    responses((status = 200, description = "Saldos por produto", body = InventoryListResponse)),
    security(("api_jwt" = []))
)]
pub async fn overview(
    State(app_state): State<AppState>,
    Query(filter): Query<InventoryFilter>,
) -> Result<Json<InventoryListResponse>, AppError> {
    let response = app_state.inventory_service.overview(&filter).await?;
    Ok(Json(response))
}

// GET /api/inventory/alerts
#[utoipa::path(
    get,
    path = "/api/inventory/alerts",
    tag = "Inventory",
    responses((status = 200, description = "Produtos com estoque baixo ou zerado", body = InventoryAlerts)),
    security(("api_jwt" = []))
)]
pub async fn alerts(State(app_state): State<AppState>) -> Result<Json<InventoryAlerts>, AppError> {
    let alerts = app_state.inventory_service.alerts().await?;
    Ok(Json(alerts))
}

// GET /api/inventory/transactions
#[utoipa::path(
    get,
    path = "/api/inventory/transactions",
    tag = "Inventory",
    params(TransactionFilter),
    responses((status = 200, description = "Livro-razão de estoque", body = TransactionListResponse)),
    security(("api_jwt" = []))
)]
pub async fn transactions(
    State(app_state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let response = app_state.inventory_service.transactions(&filter).await?;
    Ok(Json(response))
}

// GET /api/inventory/stats
#[utoipa::path(
    get,
    path = "/api/inventory/stats",
    tag = "Inventory",
    responses((status = 200, description = "Indicadores de estoque", body = InventoryStats)),
    security(("api_jwt" = []))
)]
pub async fn stats(State(app_state): State<AppState>) -> Result<Json<InventoryStats>, AppError> {
    let stats = app_state.inventory_service.stats().await?;
    Ok(Json(stats))
}

// GET /api/inventory/reconciliation (somente admin)
#[utoipa::path(
    get,
    path = "/api/inventory/reconciliation",
    tag = "Inventory",
    responses(
        (status = 200, description = "Saldo x livro-razão", body = ReconciliationReport),
        (status = 403, description = "Somente administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn reconciliation(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
) -> Result<Json<ReconciliationReport>, AppError> {
    let report = app_state.inventory_service.reconcile().await?;
    Ok(Json(report))
}

// PUT /api/inventory/{product_id}/adjust
#[utoipa::path(
    put,
    path = "/api/inventory/{product_id}/adjust",
    tag = "Inventory",
    params(("product_id" = Uuid, Path, description = "ID do produto")),
    request_body = AdjustInventoryPayload,
    responses(
        (status = 200, description = "Estoque ajustado", body = AdjustInventoryResponse),
        (status = 400, description = "Tipo ou quantidade inválidos"),
        (status = 404, description = "Estoque não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn adjust(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<ManagerOrAdmin>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AdjustInventoryPayload>,
) -> Result<Json<AdjustInventoryResponse>, AppError> {
    payload.validate()?;

    let (adjustment, inventory) = app_state
        .inventory_service
        .adjust(product_id, &payload, user.id)
        .await?;

    Ok(Json(AdjustInventoryResponse {
        message: "Estoque ajustado com sucesso.".to_string(),
        adjustment,
        inventory,
    }))
}

// PUT /api/inventory/bulk-adjust
#[utoipa::path(
    put,
    path = "/api/inventory/bulk-adjust",
    tag = "Inventory",
    request_body = BulkAdjustPayload,
    responses(
        (status = 200, description = "Resultado por item", body = BulkAdjustResponse),
        (status = 400, description = "Lote vazio ou itens inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_adjust(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<ManagerOrAdmin>,
    Json(payload): Json<BulkAdjustPayload>,
) -> Result<Json<BulkAdjustResponse>, AppError> {
    payload.validate()?;

    let response = app_state.inventory_service.bulk_adjust(&payload, user.id).await?;
    Ok(Json(response))
}

// PUT /api/inventory/{product_id}/thresholds
#[utoipa::path(
    put,
    path = "/api/inventory/{product_id}/thresholds",
    tag = "Inventory",
    params(("product_id" = Uuid, Path, description = "ID do produto")),
    request_body = UpdateThresholdsPayload,
    responses(
        (status = 200, description = "Limites atualizados", body = ThresholdsResponse),
        (status = 404, description = "Estoque não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_thresholds(
    State(app_state): State<AppState>,
    _guard: RequireRole<ManagerOrAdmin>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateThresholdsPayload>,
) -> Result<Json<ThresholdsResponse>, AppError> {
    payload.validate()?;

    let inventory = app_state
        .inventory_service
        .update_thresholds(product_id, &payload)
        .await?;

    Ok(Json(ThresholdsResponse {
        message: "Limites de estoque atualizados.".to_string(),
        inventory,
    }))
}
