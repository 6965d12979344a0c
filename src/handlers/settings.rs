// src/handlers/settings.rs

use axum::extract::State;
use validator::Validate;

use crate::{
    common::{error::AppError, extract::Json},
    config::AppState,
    middleware::rbac::{AdminOnly, RequireRole},
    models::settings::{ShopSettings, UpdateShopSettingsPayload},
};

// GET /api/settings/shop
#[utoipa::path(
    get,
    path = "/api/settings/shop",
    tag = "Settings",
    responses((status = 200, description = "Dados da loja", body = ShopSettings)),
    security(("api_jwt" = []))
)]
pub async fn get_shop_settings(
    State(app_state): State<AppState>,
) -> Result<Json<ShopSettings>, AppError> {
    let settings = app_state
        .settings_repo
        .get_shop_settings(&app_state.db_pool)
        .await?;

    Ok(Json(settings))
}

// PUT /api/settings/shop (somente admin)
#[utoipa::path(
    put,
    path = "/api/settings/shop",
    tag = "Settings",
    request_body = UpdateShopSettingsPayload,
    responses(
        (status = 200, description = "Configurações atualizadas", body = ShopSettings),
        (status = 403, description = "Somente administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_shop_settings(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Json(payload): Json<UpdateShopSettingsPayload>,
) -> Result<Json<ShopSettings>, AppError> {
    payload.validate()?;

    let pairs = payload.into_pairs();
    if pairs.is_empty() {
        return Err(AppError::validation("body", "Nenhum campo para atualizar."));
    }

    let settings = app_state.settings_repo.update_shop_settings(pairs).await?;
    tracing::info!("Configurações da loja atualizadas");
    Ok(Json(settings))
}
