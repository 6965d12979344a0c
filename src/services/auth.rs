// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{PageParams, Pagination},
        error::AppError,
    },
    db::UserRepository,
    models::auth::{
        AuthResponse, ChangePasswordPayload, Claims, RegisterUserPayload, User, UserListResponse,
        UserRole,
    },
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    expires_in_hours: i64,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        jwt_secret: String,
        expires_in_hours: i64,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, jwt_secret, expires_in_hours, pool }
    }

    // Hash fora do runtime assíncrono (bcrypt é CPU-bound)
    async fn hash_password(password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    /// Cadastro feito por um administrador. Não gera token para o novo usuário.
    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<User, AppError> {
        let hashed_password = Self::hash_password(&payload.password).await?;

        let user = self
            .user_repo
            .create_user(
                &self.pool,
                payload.username.trim(),
                payload.email.trim(),
                &hashed_password,
                payload.full_name.trim(),
                payload.role,
            )
            .await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Usuário cadastrado");
        Ok(user)
    }

    // Executa a verificação em um thread separado
    async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
        let password_clone = password.to_owned();
        let password_hash_clone = password_hash.to_owned();
        let is_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
        Ok(is_valid)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_username(username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let is_password_valid = Self::verify_password(password, &user.password_hash).await?;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::AccountDeactivated);
        }

        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Troca a senha do próprio usuário após conferir a senha atual.
    pub async fn change_password(&self, user: &User, payload: &ChangePasswordPayload) -> Result<(), AppError> {
        if !Self::verify_password(&payload.current_password, &user.password_hash).await? {
            return Err(AppError::InvalidCurrentPassword);
        }

        let hashed_password = Self::hash_password(&payload.new_password).await?;
        if !self.user_repo.update_password(user.id, &hashed_password).await? {
            return Err(AppError::UserNotFound);
        }

        tracing::info!(user_id = %user.id, "Senha alterada");
        Ok(())
    }

    pub async fn list_users(&self, params: &PageParams) -> Result<UserListResponse, AppError> {
        let (users, total) = self.user_repo.list_users(params).await?;
        Ok(UserListResponse { users, pagination: Pagination::new(params, total) })
    }

    /// Ativa ou desativa uma conta. O admin não pode desativar a si mesmo.
    pub async fn update_user_status(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<User, AppError> {
        if actor_id == user_id && !is_active {
            return Err(AppError::SelfDeactivationBlocked);
        }

        let user = self
            .user_repo
            .set_active(user_id, is_active)
            .await?
            .ok_or(AppError::UserNotFound)?;

        tracing::info!(user_id = %user.id, is_active, actor_id = %actor_id, "Status do usuário alterado");
        Ok(user)
    }

    /// Decodifica e valida assinatura/expiração, sem tocar no banco.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_claims(token)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !user.is_active {
            return Err(AppError::AccountDeactivated);
        }
        Ok(user)
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.expires_in_hours);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    /// Cria o primeiro administrador quando a tabela de usuários está vazia.
    /// Devolve `true` se o usuário foi criado.
    pub async fn ensure_bootstrap_admin(&self, username: &str, password: &str) -> Result<bool, AppError> {
        let hashed_password = Self::hash_password(password).await?;

        let mut tx = self.pool.begin().await?;

        // Serializa instâncias subindo ao mesmo tempo
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        if self.user_repo.count_users(&mut *tx).await? > 0 {
            return Ok(false);
        }

        let email = format!("{}@localhost", username);
        let admin = self
            .user_repo
            .create_user(&mut *tx, username, &email, &hashed_password, "Administrator", UserRole::Admin)
            .await?;

        tx.commit().await?;
        tracing::warn!(user_id = %admin.id, username, "Administrador inicial criado; troque a senha");
        Ok(true)
    }
}
