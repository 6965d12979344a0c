// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{map_unique_violation, PageParams},
        error::AppError,
    },
    models::auth::{User, UserRole},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo login
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Lista paginada, mais recentes primeiro
    pub async fn list_users(&self, params: &PageParams) -> Result<(Vec<User>, i64), AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
        )
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = self.count_users(&self.pool).await?;
        Ok((users, total))
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_users<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    // Cria um novo usuário no banco de dados
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        username: &str,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: UserRole,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            map_unique_violation(e, |constraint| {
                if constraint.contains("email") {
                    format!("O e-mail '{}' já está em uso.", email)
                } else {
                    format!("O usuário '{}' já existe.", username)
                }
            })
        })
    }
}
