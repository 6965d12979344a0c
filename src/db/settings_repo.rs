// src/db/settings_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::settings::{ShopSettings, SHOP_SETTING_KEYS},
};

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca as configurações da loja. Chaves ausentes caem no padrão.
    pub async fn get_shop_settings<'e, E>(&self, executor: E) -> Result<ShopSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pairs = sqlx::query_as::<_, (String, String)>(
            "SELECT setting_key, setting_value FROM system_settings WHERE setting_key = ANY($1)",
        )
        .bind(&SHOP_SETTING_KEYS[..])
        .fetch_all(executor)
        .await?;

        Ok(ShopSettings::from_pairs(pairs))
    }

    // Atualiza (ou cria) as chaves informadas
    pub async fn update_shop_settings(
        &self,
        pairs: Vec<(&'static str, String)>,
    ) -> Result<ShopSettings, AppError> {
        let mut tx = self.pool.begin().await?;

        for (key, value) in pairs {
            // Esta query é um "UPSERT".
            sqlx::query(
                r#"
                INSERT INTO system_settings (setting_key, setting_value, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (setting_key)
                DO UPDATE SET setting_value = EXCLUDED.setting_value, updated_at = NOW()
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        let settings = self.get_shop_settings(&mut *tx).await?;
        tx.commit().await?;
        Ok(settings)
    }
}
