// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::db_utils::Pagination;

// Perfis de acesso do PDV
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Cashier,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Cashier => "cashier",
        }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para registro de um novo usuário (somente admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserPayload {
    #[validate(length(min = 3, max = 50, message = "O usuário deve ter entre 3 e 50 caracteres."))]
    #[schema(example = "caixa01")]
    pub username: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "caixa01@loja.com")]
    pub email: String,

    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres."))]
    pub full_name: String,

    #[serde(default = "default_role")]
    pub role: UserRole,
}

fn default_role() -> UserRole {
    UserRole::Cashier
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(length(min = 1, message = "O usuário é obrigatório."))]
    pub username: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: User,
}

// Troca de senha do próprio usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordPayload {
    #[validate(length(min = 1, message = "A senha atual é obrigatória."))]
    pub current_password: String,
    #[validate(length(min = 6, message = "A nova senha deve ter no mínimo 6 caracteres."))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserStatusPayload {
    pub is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserStatusResponse {
    pub message: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // Subject (ID do usuário)
    pub role: UserRole, // Perfil no momento da emissão
    pub exp: usize,     // Expiration time
    pub iat: usize,     // Issued At
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_payload_defaults_to_cashier() {
        let payload: RegisterUserPayload = serde_json::from_value(serde_json::json!({
            "username": "maria",
            "email": "maria@loja.com",
            "password": "segredo1",
            "full_name": "Maria Silva"
        }))
        .unwrap();
        assert_eq!(payload.role, UserRole::Cashier);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_register_payload_rejects_short_password_and_bad_email() {
        let payload = RegisterUserPayload {
            username: "jo".into(),
            email: "nao-e-email".into(),
            password: "123".into(),
            full_name: "Jo".into(),
            role: UserRole::Manager,
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_change_password_requires_six_chars() {
        let payload = ChangePasswordPayload {
            current_password: "antiga1".into(),
            new_password: "12345".into(),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("new_password"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Manager).unwrap(), "\"manager\"");
        assert_eq!(UserRole::Cashier.as_str(), "cashier");
    }
}
