// src/common/error.rs

use std::borrow::Cow;
use std::collections::HashMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Um ou mais campos são inválidos.")]
    ValidationError(#[from] ValidationErrors),

    // ---
    // Erros do motor de vendas
    // ---
    #[error("{0}")]
    StockError(String),

    #[error("{0}")]
    PaymentError(String),

    #[error("{0}")]
    RefundError(String),

    #[error("A quantidade resultante não pode ser negativa.")]
    NegativeQuantity,

    #[error("Tipo de ajuste inválido: '{0}'. Use add, remove ou set.")]
    InvalidAdjustmentType(String),

    #[error("Venda não encontrada.")]
    SaleNotFound,

    #[error("Venda não encontrada ou não pode ser estornada.")]
    SaleNotRefundable,

    #[error("A venda já está cancelada.")]
    AlreadyCancelled,

    #[error("Vendas concluídas não podem ser canceladas. Use o estorno.")]
    CannotCancelCompleted,

    #[error("Operação inválida para uma venda com status '{0}'.")]
    InvalidSaleStatus(String),

    // ---
    // Recursos não encontrados
    // ---
    #[error("Produto não encontrado.")]
    ProductNotFound,

    #[error("Categoria não encontrada.")]
    CategoryNotFound,

    #[error("Registro de estoque não encontrado para este produto.")]
    InventoryNotFound,

    #[error("Usuário não encontrado.")]
    UserNotFound,

    // ---
    // Autenticação e autorização
    // ---
    #[error("Token de acesso não informado.")]
    TokenMissing,

    #[error("Token inválido.")]
    InvalidToken,

    #[error("Token expirado.")]
    TokenExpired,

    #[error("Usuário ou senha inválidos.")]
    InvalidCredentials,

    #[error("Conta desativada.")]
    AccountDeactivated,

    #[error("Permissões insuficientes para esta operação.")]
    InsufficientPermissions,

    #[error("A senha atual está incorreta.")]
    InvalidCurrentPassword,

    #[error("Você não pode desativar a sua própria conta.")]
    SelfDeactivationBlocked,

    // ---
    // Conflitos
    // ---
    #[error("{0}")]
    UniqueConstraintViolation(String),

    #[error("{0}")]
    CategoryInUse(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Atalho para erros de validação de regra de negócio em um único campo.
    pub fn validation(field: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        let mut err = ValidationError::new("invalid");
        err.message = Some(message.into());
        let mut errors = ValidationErrors::new();
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::StockError(_)
            | AppError::PaymentError(_)
            | AppError::RefundError(_)
            | AppError::NegativeQuantity
            | AppError::InvalidAdjustmentType(_)
            | AppError::AlreadyCancelled
            | AppError::CannotCancelCompleted
            | AppError::InvalidSaleStatus(_)
            | AppError::SelfDeactivationBlocked => StatusCode::BAD_REQUEST,

            AppError::SaleNotFound
            | AppError::SaleNotRefundable
            | AppError::ProductNotFound
            | AppError::CategoryNotFound
            | AppError::InventoryNotFound
            | AppError::UserNotFound => StatusCode::NOT_FOUND,

            AppError::TokenMissing
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::InvalidCredentials
            | AppError::AccountDeactivated
            | AppError::InvalidCurrentPassword => StatusCode::UNAUTHORIZED,

            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,

            AppError::UniqueConstraintViolation(_) | AppError::CategoryInUse(_) => StatusCode::CONFLICT,

            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Código estável consumido pelo cliente.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::StockError(_) => "STOCK_ERROR",
            AppError::PaymentError(_) => "PAYMENT_ERROR",
            AppError::RefundError(_) => "REFUND_ERROR",
            AppError::NegativeQuantity => "NEGATIVE_QUANTITY",
            AppError::InvalidAdjustmentType(_) => "INVALID_TYPE",
            AppError::SaleNotFound => "SALE_NOT_FOUND",
            AppError::SaleNotRefundable => "SALE_NOT_REFUNDABLE",
            AppError::AlreadyCancelled => "ALREADY_CANCELLED",
            AppError::CannotCancelCompleted => "CANNOT_CANCEL_COMPLETED",
            AppError::InvalidSaleStatus(_) => "INVALID_SALE_STATUS",
            AppError::ProductNotFound => "PRODUCT_NOT_FOUND",
            AppError::CategoryNotFound => "CATEGORY_NOT_FOUND",
            AppError::InventoryNotFound => "INVENTORY_NOT_FOUND",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::TokenMissing => "TOKEN_MISSING",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            AppError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            AppError::InvalidCurrentPassword => "INVALID_CURRENT_PASSWORD",
            AppError::SelfDeactivationBlocked => "SELF_DEACTIVATION_BLOCKED",
            AppError::UniqueConstraintViolation(_) => "DUPLICATE_RESOURCE",
            AppError::CategoryInUse(_) => "CATEGORY_IN_USE",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "SERVER_ERROR",
        }
    }
}

// Rejeições dos extratores viram 400 VALIDATION_ERROR
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("path", rejection.body_text())
    }
}

// Converte os erros de validação em { campo: [mensagens] }
fn validation_details(errors: &ValidationErrors) -> HashMap<String, Vec<String>> {
    let mut details = HashMap::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        details.insert(field.to_string(), messages);
    }
    details
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let body = match &self {
            AppError::ValidationError(errors) => json!({
                "error": self.to_string(),
                "code": code,
                "details": validation_details(errors),
            }),
            // O `tracing` loga o detalhe; o cliente recebe só a mensagem genérica.
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "Erro Interno do Servidor");
                json!({ "error": "Ocorreu um erro inesperado.", "code": code })
            }
            _ => json!({ "error": self.to_string(), "code": code }),
        };

        (status, Json(body)).into_response()
    }
}
