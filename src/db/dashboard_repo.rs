// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{
        DailySummary, DailySummaryResponse, HourlySales, PaymentMethodStat, SalesOverview,
        SalesStats, SalesStatsBody, StatsPeriod, TopProductEntry,
    },
};

// Filtro comum: vendas concluídas desde (hoje - $1 dias), opcionalmente por caixa ($2)
const PERIOD_FILTER: &str = r#"
    s.status = 'completed'
    AND s.sale_date >= CURRENT_DATE - ($1::INT * INTERVAL '1 day')
    AND ($2::UUID IS NULL OR s.cashier_id = $2)
"#;

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Estatísticas de vendas do período
    pub async fn sales_stats(
        &self,
        period: StatsPeriod,
        cashier_id: Option<Uuid>,
    ) -> Result<SalesStats, AppError> {
        // Iniciamos uma transação (Snapshot consistente dos dados)
        let mut tx = self.pool.begin().await?;
        let days = period.days_back();

        // A. Visão geral
        let overview = sqlx::query_as::<_, SalesOverview>(&format!(
            r#"
            SELECT
                COUNT(*) AS total_sales,
                COALESCE(SUM(s.total_amount), 0) AS total_revenue,
                COALESCE(SUM(s.gst_amount), 0) AS total_gst,
                COALESCE(ROUND(AVG(s.total_amount), 2), 0) AS average_sale_amount,
                COUNT(DISTINCT s.customer_phone) AS unique_customers
            FROM sales s
            WHERE {PERIOD_FILTER}
            "#
        ))
        .bind(days)
        .bind(cashier_id)
        .fetch_one(&mut *tx)
        .await?;

        // B. Formas de pagamento
        let payment_methods = sqlx::query_as::<_, PaymentMethodStat>(&format!(
            r#"
            SELECT s.payment_method, COUNT(*) AS count, SUM(s.total_amount) AS total_amount
            FROM sales s
            WHERE {PERIOD_FILTER}
            GROUP BY s.payment_method
            ORDER BY total_amount DESC
            "#
        ))
        .bind(days)
        .bind(cashier_id)
        .fetch_all(&mut *tx)
        .await?;

        // C. Curva ABC (Top 10 produtos por quantidade)
        let top_products = sqlx::query_as::<_, TopProductEntry>(&format!(
            r#"
            SELECT p.id AS product_id, p.name, p.sku,
                   SUM(si.quantity)::BIGINT AS total_quantity,
                   SUM(si.total_amount) AS total_revenue
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            JOIN sales s ON s.id = si.sale_id
            WHERE {PERIOD_FILTER}
            GROUP BY p.id, p.name, p.sku
            ORDER BY total_quantity DESC, p.name ASC
            LIMIT 10
            "#
        ))
        .bind(days)
        .bind(cashier_id)
        .fetch_all(&mut *tx)
        .await?;

        // D. Padrão por hora (apenas para "hoje")
        let hourly_pattern = if period == StatsPeriod::Today {
            Self::hourly(&mut tx, None, cashier_id).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;

        Ok(SalesStats {
            period,
            stats: SalesStatsBody { overview, payment_methods, top_products, hourly_pattern },
        })
    }

    // 2. Resumo de um dia
    // Sem data, usa o dia corrente do banco (o mesmo da numeração das vendas)
    pub async fn daily_summary(&self, date: Option<NaiveDate>) -> Result<DailySummaryResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let date = match date {
            Some(date) => date,
            None => {
                sqlx::query_scalar::<_, NaiveDate>("SELECT CURRENT_DATE")
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        let summary = sqlx::query_as::<_, DailySummary>(
            r#"
            SELECT
                COUNT(*) AS total_sales,
                COALESCE(SUM(total_amount), 0) AS total_revenue,
                COALESCE(SUM(gst_amount), 0) AS total_gst,
                COALESCE(ROUND(AVG(total_amount), 2), 0) AS average_sale,
                MIN(total_amount) AS min_sale,
                MAX(total_amount) AS max_sale,
                COUNT(DISTINCT customer_phone) AS unique_customers
            FROM sales
            WHERE sale_date::date = $1 AND status = 'completed'
            "#,
        )
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        let payment_breakdown = sqlx::query_as::<_, PaymentMethodStat>(
            r#"
            SELECT payment_method, COUNT(*) AS count, SUM(total_amount) AS total_amount
            FROM sales
            WHERE sale_date::date = $1 AND status = 'completed'
            GROUP BY payment_method
            ORDER BY total_amount DESC
            "#,
        )
        .bind(date)
        .fetch_all(&mut *tx)
        .await?;

        let hourly_breakdown = Self::hourly(&mut tx, Some(date), None).await?;

        tx.commit().await?;

        Ok(DailySummaryResponse { date, summary, payment_breakdown, hourly_breakdown })
    }

    // Vendas concluídas por hora do dia (padrão: hoje)
    async fn hourly(
        tx: &mut Transaction<'_, Postgres>,
        date: Option<NaiveDate>,
        cashier_id: Option<Uuid>,
    ) -> Result<Vec<HourlySales>, AppError> {
        let rows = sqlx::query_as::<_, HourlySales>(
            r#"
            SELECT EXTRACT(HOUR FROM s.sale_date)::INT AS hour,
                   COUNT(*) AS sale_count,
                   SUM(s.total_amount) AS total_amount
            FROM sales s
            WHERE s.status = 'completed'
              AND s.sale_date::date = COALESCE($1, CURRENT_DATE)
              AND ($2::UUID IS NULL OR s.cashier_id = $2)
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(date)
        .bind(cashier_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows)
    }
}
