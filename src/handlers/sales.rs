// src/handlers/sales.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::{Json, Path, Query}},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{ManagerOrAdmin, RequireRole},
    },
    models::sales::{
        CancelSalePayload, CreateSalePayload, CreateSaleResponse, ReceiptResponse, RefundPayload,
        RefundResponse, SaleDetails, SaleFilter, SaleListResponse, SaleStatusResponse,
    },
};

// POST /api/sales
// A validação do payload fica no serviço, junto das regras de pagamento.
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CreateSalePayload,
    responses(
        (status = 201, description = "Venda registrada", body = CreateSaleResponse),
        (status = 400, description = "Dados inválidos, estoque insuficiente ou pagamento incorreto")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateSalePayload>,
) -> Result<impl IntoResponse, AppError> {
    let details = app_state.sales_service.create_sale(&payload, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSaleResponse { message: "Venda registrada com sucesso.".to_string(), details }),
    ))
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    params(SaleFilter),
    responses((status = 200, description = "Vendas paginadas", body = SaleListResponse)),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    Query(filter): Query<SaleFilter>,
) -> Result<Json<SaleListResponse>, AppError> {
    let response = app_state.sales_service.list_sales(&filter).await?;
    Ok(Json(response))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda com itens e pagamentos", body = SaleDetails),
        (status = 404, description = "Venda não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> Result<Json<SaleDetails>, AppError> {
    let details = app_state.sales_service.get_sale(sale_id).await?;
    Ok(Json(details))
}

// GET /api/sales/{id}/receipt
#[utoipa::path(
    get,
    path = "/api/sales/{id}/receipt",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Dados do recibo", body = ReceiptResponse),
        (status = 404, description = "Venda não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_receipt(
    State(app_state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> Result<Json<ReceiptResponse>, AppError> {
    let receipt = app_state.sales_service.receipt(sale_id).await?;
    Ok(Json(ReceiptResponse { receipt }))
}

// POST /api/sales/{id}/refund
#[utoipa::path(
    post,
    path = "/api/sales/{id}/refund",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda original")),
    request_body = RefundPayload,
    responses(
        (status = 200, description = "Estorno processado", body = RefundResponse),
        (status = 400, description = "Quantidade acima do vendido ou item de outra venda"),
        (status = 404, description = "Venda inexistente ou não estornável")
    ),
    security(("api_jwt" = []))
)]
pub async fn refund_sale(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<ManagerOrAdmin>,
    Path(sale_id): Path<Uuid>,
    Json(payload): Json<RefundPayload>,
) -> Result<Json<RefundResponse>, AppError> {
    let response = app_state
        .sales_service
        .refund_sale(sale_id, &payload, user.id)
        .await?;
    Ok(Json(response))
}

// POST /api/sales/{id}/cancel
// Corpo opcional: sem JSON, cancela sem motivo.
#[utoipa::path(
    post,
    path = "/api/sales/{id}/cancel",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    request_body(content = CancelSalePayload, description = "Motivo opcional"),
    responses(
        (status = 200, description = "Venda cancelada", body = SaleStatusResponse),
        (status = 400, description = "Status não permite cancelamento"),
        (status = 404, description = "Venda não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_sale(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<ManagerOrAdmin>,
    Path(sale_id): Path<Uuid>,
    payload: Option<Json<CancelSalePayload>>,
) -> Result<Json<SaleStatusResponse>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let sale = app_state
        .sales_service
        .cancel_sale(sale_id, &payload, user.id)
        .await?;

    Ok(Json(SaleStatusResponse { message: "Venda cancelada com sucesso.".to_string(), sale }))
}

// POST /api/sales/{id}/complete
#[utoipa::path(
    post,
    path = "/api/sales/{id}/complete",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda em espera")),
    responses(
        (status = 200, description = "Venda concluída", body = SaleStatusResponse),
        (status = 400, description = "A venda não está em espera"),
        (status = 404, description = "Venda não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_sale(
    State(app_state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> Result<Json<SaleStatusResponse>, AppError> {
    let sale = app_state.sales_service.complete_sale(sale_id).await?;
    Ok(Json(SaleStatusResponse { message: "Venda concluída com sucesso.".to_string(), sale }))
}
