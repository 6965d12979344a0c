// src/models/dashboard.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::sales::PaymentMethod;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    #[default]
    Today,
    Week,
    Month,
    Year,
}

impl StatsPeriod {
    /// Janela em dias para trás a partir de hoje (0 = somente hoje).
    pub fn days_back(&self) -> i32 {
        match self {
            StatsPeriod::Today => 0,
            StatsPeriod::Week => 7,
            StatsPeriod::Month => 30,
            StatsPeriod::Year => 365,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SalesStatsQuery {
    pub period: Option<StatsPeriod>,
    pub cashier_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DailySummaryQuery {
    /// YYYY-MM-DD (padrão: hoje)
    pub date: Option<NaiveDate>,
}

// 1. Visão geral do período
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct SalesOverview {
    pub total_sales: i64,
    pub total_revenue: Decimal,
    pub total_gst: Decimal,
    pub average_sale_amount: Decimal,
    pub unique_customers: i64,
}

// 2. Quebra por forma de pagamento
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct PaymentMethodStat {
    pub payment_method: PaymentMethod,
    pub count: i64,
    pub total_amount: Decimal,
}

// 3. Curva ABC (Top Produtos)
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopProductEntry {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

// 4. Vendas por hora
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct HourlySales {
    pub hour: i32,
    pub sale_count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesStatsBody {
    pub overview: SalesOverview,
    pub payment_methods: Vec<PaymentMethodStat>,
    pub top_products: Vec<TopProductEntry>,
    pub hourly_pattern: Vec<HourlySales>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesStats {
    pub period: StatsPeriod,
    pub stats: SalesStatsBody,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DailySummary {
    pub total_sales: i64,
    pub total_revenue: Decimal,
    pub total_gst: Decimal,
    pub average_sale: Decimal,
    pub min_sale: Option<Decimal>,
    pub max_sale: Option<Decimal>,
    pub unique_customers: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailySummaryResponse {
    pub date: NaiveDate,
    pub summary: DailySummary,
    pub payment_breakdown: Vec<PaymentMethodStat>,
    pub hourly_breakdown: Vec<HourlySales>,
}
