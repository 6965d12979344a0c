// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{common::error::AppError, config::AppState, models::auth::User};

// O middleware em si: valida o Bearer token e injeta o usuário na requisição
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = match request.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) => bearer,
        // Cabeçalho presente mas fora do formato "Bearer <token>"
        None if request.headers().contains_key(AUTHORIZATION) => return Err(AppError::InvalidToken),
        None => return Err(AppError::TokenMissing),
    };

    let user = app_state.auth_service.validate_token(bearer.token()).await?;

    tracing::debug!(user_id = %user.id, role = user.role.as_str(), "Requisição autenticada");

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::TokenMissing)
    }
}
