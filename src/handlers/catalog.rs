// src/handlers/catalog.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, extract::{Json, Path, Query}},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AdminOnly, ManagerOrAdmin, RequireRole},
    },
    models::catalog::{
        CategoryDetail, CategoryNode, CategoryResponse, CategoryWithCount, CreateCategoryPayload,
        CreateProductPayload, MessageResponse, ProductFilter, ProductListResponse, ProductResponse,
        ProductWithStock, UpdateCategoryPayload, UpdateProductPayload,
    },
};

// ---
// Produtos
// ---

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Catalog",
    params(ProductFilter),
    responses(
        (status = 200, description = "Produtos ativos com saldo", body = ProductListResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ProductListResponse>, AppError> {
    let products = app_state.catalog_service.list_products(&filter).await?;
    Ok(Json(products))
}

// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = ProductWithStock),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductWithStock>, AppError> {
    let product = app_state.catalog_service.get_product(product_id).await?;
    Ok(Json(product))
}

// GET /api/products/barcode/{barcode}
#[utoipa::path(
    get,
    path = "/api/products/barcode/{barcode}",
    tag = "Catalog",
    params(("barcode" = String, Path, description = "Código de barras")),
    responses(
        (status = 200, description = "Produto", body = ProductWithStock),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product_by_barcode(
    State(app_state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<ProductWithStock>, AppError> {
    let product = app_state.catalog_service.get_product_by_barcode(&barcode).await?;
    Ok(Json(product))
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Catalog",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado com estoque inicial", body = ProductResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "SKU ou código de barras duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<ManagerOrAdmin>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.validate_business_rules()?;

    let product = app_state.catalog_service.create_product(&payload, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse { message: "Produto criado com sucesso.".to_string(), product }),
    ))
}

// PUT /api/products/{id}
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do produto")),
    request_body = UpdateProductPayload,
    responses(
        (status = 200, description = "Produto atualizado", body = ProductResponse),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    _guard: RequireRole<ManagerOrAdmin>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<Json<ProductResponse>, AppError> {
    payload.validate()?;
    payload.validate_business_rules()?;

    let product = app_state.catalog_service.update_product(product_id, &payload).await?;
    Ok(Json(ProductResponse { message: "Produto atualizado com sucesso.".to_string(), product }))
}

// DELETE /api/products/{id}
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto desativado", body = MessageResponse),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    app_state.catalog_service.delete_product(product_id).await?;
    Ok(Json(MessageResponse { message: "Produto removido com sucesso.".to_string() }))
}

// ---
// Categorias
// ---

// GET /api/categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Catalog",
    responses((status = 200, description = "Categorias ativas", body = Vec<CategoryWithCount>)),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, AppError> {
    let categories = app_state.catalog_service.list_categories().await?;
    Ok(Json(categories))
}

// GET /api/categories/{id}
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses(
        (status = 200, description = "Categoria com subcategorias", body = CategoryDetail),
        (status = 404, description = "Categoria não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_category(
    State(app_state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<CategoryDetail>, AppError> {
    let category = app_state.catalog_service.get_category(category_id).await?;
    Ok(Json(category))
}

// GET /api/categories/hierarchy
#[utoipa::path(
    get,
    path = "/api/categories/hierarchy",
    tag = "Catalog",
    responses((status = 200, description = "Árvore de categorias", body = Vec<CategoryNode>)),
    security(("api_jwt" = []))
)]
pub async fn category_hierarchy(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<CategoryNode>>, AppError> {
    let tree = app_state.catalog_service.category_hierarchy().await?;
    Ok(Json(tree))
}

// POST /api/categories
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Catalog",
    request_body = CreateCategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = CategoryResponse),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    _guard: RequireRole<ManagerOrAdmin>,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = app_state.catalog_service.create_category(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse { message: "Categoria criada com sucesso.".to_string(), category }),
    ))
}

// PUT /api/categories/{id}
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID da categoria")),
    request_body = UpdateCategoryPayload,
    responses(
        (status = 200, description = "Categoria atualizada", body = CategoryResponse),
        (status = 400, description = "Hierarquia circular"),
        (status = 404, description = "Categoria não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    _guard: RequireRole<ManagerOrAdmin>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<Json<CategoryResponse>, AppError> {
    payload.validate()?;

    let category = app_state.catalog_service.update_category(category_id, &payload).await?;
    Ok(Json(CategoryResponse { message: "Categoria atualizada com sucesso.".to_string(), category }))
}

// DELETE /api/categories/{id}
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses(
        (status = 200, description = "Categoria desativada", body = MessageResponse),
        (status = 409, description = "Categoria com produtos ou subcategorias ativas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_category(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    app_state.catalog_service.delete_category(category_id).await?;
    Ok(Json(MessageResponse { message: "Categoria removida com sucesso.".to_string() }))
}
