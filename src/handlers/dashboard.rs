// src/handlers/dashboard.rs

use axum::extract::State;

use crate::{
    common::{error::AppError, extract::{Json, Query}},
    config::AppState,
    models::dashboard::{DailySummaryQuery, DailySummaryResponse, SalesStats, SalesStatsQuery},
};

// GET /api/sales/stats
#[utoipa::path(
    get,
    path = "/api/sales/stats",
    tag = "Dashboard",
    params(SalesStatsQuery),
    responses(
        (status = 200, description = "Indicadores de vendas concluídas no período", body = SalesStats),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_sales_stats(
    State(app_state): State<AppState>,
    Query(query): Query<SalesStatsQuery>,
) -> Result<Json<SalesStats>, AppError> {
    let stats = app_state
        .dashboard_service
        .sales_stats(query.period, query.cashier_id)
        .await?;

    Ok(Json(stats))
}

// GET /api/sales/daily-summary
#[utoipa::path(
    get,
    path = "/api/sales/daily-summary",
    tag = "Dashboard",
    params(DailySummaryQuery),
    responses(
        (status = 200, description = "Fechamento do dia", body = DailySummaryResponse),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_daily_summary(
    State(app_state): State<AppState>,
    Query(query): Query<DailySummaryQuery>,
) -> Result<Json<DailySummaryResponse>, AppError> {
    let summary = app_state.dashboard_service.daily_summary(query.date).await?;
    Ok(Json(summary))
}
