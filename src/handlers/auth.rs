// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::PageParams,
        error::AppError,
        extract::{Json, Path, Query},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AdminOnly, RequireRole},
    },
    models::{
        auth::{
            AuthResponse, ChangePasswordPayload, LoginUserPayload, RegisterResponse,
            RegisterUserPayload, UpdateUserStatusPayload, User, UserListResponse, UserStatusResponse,
        },
        catalog::MessageResponse,
    },
};

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login realizado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas ou conta desativada")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let response = app_state
        .auth_service
        .login(&payload.username, &payload.password)
        .await?;

    tracing::info!(user_id = %response.user.id, "Login realizado");
    Ok(Json(response))
}

// POST /api/auth/register (somente admin)
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = RegisterResponse),
        (status = 403, description = "Somente administradores"),
        (status = 409, description = "Usuário ou e-mail já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn register(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = app_state.auth_service.register_user(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { message: "Usuário criado com sucesso.".to_string(), user }),
    ))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// PUT /api/auth/change-password
#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordPayload,
    responses(
        (status = 200, description = "Senha alterada", body = MessageResponse),
        (status = 401, description = "Senha atual incorreta")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    app_state.auth_service.change_password(&user, &payload).await?;

    Ok(Json(MessageResponse { message: "Senha alterada com sucesso.".to_string() }))
}

// GET /api/auth/users (somente admin)
#[utoipa::path(
    get,
    path = "/api/auth/users",
    tag = "Auth",
    params(PageParams),
    responses(
        (status = 200, description = "Usuários cadastrados", body = UserListResponse),
        (status = 403, description = "Somente administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(params): Query<PageParams>,
) -> Result<Json<UserListResponse>, AppError> {
    let response = app_state.auth_service.list_users(&params).await?;
    Ok(Json(response))
}

// PUT /api/auth/users/{user_id}/status (somente admin)
#[utoipa::path(
    put,
    path = "/api/auth/users/{user_id}/status",
    tag = "Auth",
    params(("user_id" = Uuid, Path, description = "ID do usuário")),
    request_body = UpdateUserStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = UserStatusResponse),
        (status = 400, description = "Tentativa de desativar a própria conta"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserStatusPayload>,
) -> Result<Json<UserStatusResponse>, AppError> {
    let user = app_state
        .auth_service
        .update_user_status(actor.id, user_id, payload.is_active)
        .await?;

    let message = if user.is_active { "Usuário ativado." } else { "Usuário desativado." };
    Ok(Json(UserStatusResponse { message: message.to_string(), user }))
}
