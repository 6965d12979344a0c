// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{common::error::AppError, middleware::auth::AuthenticatedUser, models::auth::UserRole};

/// 1. O Trait que define quais perfis podem passar
pub trait RoleDef: Send + Sync + 'static {
    fn allowed() -> &'static [UserRole];
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // O auth_guard já rodou; sem usuário, a rota foi montada sem ele
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::TokenMissing)?;

        if !T::allowed().contains(&user.0.role) {
            tracing::warn!(
                user_id = %user.0.id,
                role = user.0.role.as_str(),
                "Acesso negado por perfil"
            );
            return Err(AppError::InsufficientPermissions);
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PERFIS (TIPOS)
// ---

pub struct AdminOnly;
impl RoleDef for AdminOnly {
    fn allowed() -> &'static [UserRole] { &[UserRole::Admin] }
}

pub struct ManagerOrAdmin;
impl RoleDef for ManagerOrAdmin {
    fn allowed() -> &'static [UserRole] { &[UserRole::Admin, UserRole::Manager] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::auth::User;

    fn parts_with(role: Option<UserRole>) -> Parts {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        if let Some(role) = role {
            request.extensions_mut().insert(AuthenticatedUser(User {
                id: Uuid::new_v4(),
                username: "teste".into(),
                email: "teste@loja.com".into(),
                password_hash: String::new(),
                full_name: "Teste".into(),
                role,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }));
        }
        request.into_parts().0
    }

    #[tokio::test]
    async fn test_manager_passes_manager_guard_but_not_admin_guard() {
        let mut parts = parts_with(Some(UserRole::Manager));
        assert!(RequireRole::<ManagerOrAdmin>::from_request_parts(&mut parts, &()).await.is_ok());

        let err = RequireRole::<AdminOnly>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), "INSUFFICIENT_PERMISSIONS");
    }

    #[tokio::test]
    async fn test_cashier_is_rejected_by_manager_guard() {
        let mut parts = parts_with(Some(UserRole::Cashier));
        let err = RequireRole::<ManagerOrAdmin>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthenticated() {
        let mut parts = parts_with(None);
        let err = RequireRole::<AdminOnly>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), "TOKEN_MISSING");
    }
}
