// src/config.rs

use std::{env, str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CatalogRepository, DashboardRepository, InventoryRepository, SalesRepository,
        SettingsRepository, UserRepository,
    },
    services::{
        auth::AuthService, catalog_service::CatalogService, dashboard_service::DashboardService,
        inventory_service::InventoryService, sales_service::SalesService,
    },
};

// Lê uma variável opcional, caindo no padrão quando ausente
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida ('{}'): {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expires_in_hours: i64,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// (usuário, senha) do administrador criado quando não há usuários
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_USERNAME"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(user), Ok(password)) if !user.trim().is_empty() && !password.is_empty() => {
                Some((user.trim().to_string(), password))
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expires_in_hours: env_or("JWT_EXPIRES_IN_HOURS", 24)?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?,
            bootstrap_admin,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub inventory_service: InventoryService,
    pub sales_service: SalesService,
    pub dashboard_service: DashboardService,
    pub settings_repo: SettingsRepository,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, config: &Config) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let sales_repo = SalesRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo,
            config.jwt_secret.clone(),
            config.jwt_expires_in_hours,
            db_pool.clone(),
        );
        let catalog_service =
            CatalogService::new(catalog_repo, inventory_repo.clone(), db_pool.clone());
        let inventory_service = InventoryService::new(inventory_repo.clone(), db_pool.clone());
        let sales_service = SalesService::new(
            sales_repo,
            inventory_repo,
            settings_repo.clone(),
            db_pool.clone(),
        );
        let dashboard_service = DashboardService::new(dashboard_repo);

        Self {
            db_pool,
            auth_service,
            catalog_service,
            inventory_service,
            sales_service,
            dashboard_service,
            settings_repo,
        }
    }
}
