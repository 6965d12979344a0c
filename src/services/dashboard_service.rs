// src/services/dashboard_service.rs

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::{DailySummaryResponse, SalesStats, StatsPeriod},
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn sales_stats(
        &self,
        period: Option<StatsPeriod>,
        cashier_id: Option<Uuid>,
    ) -> Result<SalesStats, AppError> {
        self.repo.sales_stats(period.unwrap_or_default(), cashier_id).await
    }

    pub async fn daily_summary(&self, date: Option<NaiveDate>) -> Result<DailySummaryResponse, AppError> {
        self.repo.daily_summary(date).await
    }
}
