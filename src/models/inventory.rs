// src/models/inventory.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::Pagination, error::AppError},
    models::catalog::RecordStatus,
};

// --- 1. Saldo de Estoque (1:1 com o produto) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Inventory {
    pub product_id: Uuid,
    pub current_quantity: i32,
    pub minimum_threshold: i32,
    pub maximum_capacity: Option<i32>,
    pub reserved_quantity: i32,
    pub last_updated: DateTime<Utc>,
}

// Linha de estoque travada (FOR UPDATE) junto com os dados do produto
// usados pelo motor de vendas.
#[derive(Debug, Clone, FromRow)]
pub struct StockSnapshot {
    pub product_id: Uuid,
    pub current_quantity: i32,
    pub name: String,
    pub selling_price: Decimal,
    pub gst_rate: Decimal,
    pub status: RecordStatus,
}

// --- 2. Livro-razão (somente inserção) ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "inventory_transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InventoryTransactionType {
    Sale,
    Return,
    Purchase,
    Adjustment,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub transaction_type: InventoryTransactionType,
    pub quantity_change: i32,
    pub reason: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// Movimentação + produto + usuário + número da venda (listagem)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct InventoryTransactionView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transaction: InventoryTransaction,
    pub product_name: String,
    pub sku: String,
    pub created_by_name: Option<String>,
    pub sale_number: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TransactionFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub product_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub transaction_type: Option<InventoryTransactionType>,
}

// --- 3. Ajustes ---
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    Add,
    Remove,
    Set,
}

impl FromStr for AdjustmentType {
    type Err = AppError;

    // Tipo desconhecido vira INVALID_TYPE, não erro de desserialização
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(AdjustmentType::Add),
            "remove" => Ok(AdjustmentType::Remove),
            "set" => Ok(AdjustmentType::Set),
            other => Err(AppError::InvalidAdjustmentType(other.to_string())),
        }
    }
}

impl AdjustmentType {
    /// Calcula a nova quantidade. `remove` satura em zero; `set` negativo é rejeitado.
    pub fn apply(self, current: i32, quantity: i32) -> Result<i32, AppError> {
        if matches!(self, AdjustmentType::Add | AdjustmentType::Remove) && quantity < 0 {
            return Err(AppError::validation(
                "quantity",
                "A quantidade deve ser positiva para add/remove.",
            ));
        }

        let new_quantity = match self {
            AdjustmentType::Add => current
                .checked_add(quantity)
                .ok_or_else(|| AppError::validation("quantity", "Quantidade excede o limite."))?,
            AdjustmentType::Remove => (current - quantity).max(0),
            AdjustmentType::Set => quantity,
        };

        if new_quantity < 0 {
            return Err(AppError::NegativeQuantity);
        }
        Ok(new_quantity)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Add => "add",
            AdjustmentType::Remove => "remove",
            AdjustmentType::Set => "set",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustInventoryPayload {
    pub quantity: i32,

    #[validate(length(min = 1, max = 200, message = "O motivo é obrigatório (máx. 200)."))]
    #[schema(example = "Contagem física")]
    pub reason: String,

    #[serde(rename = "type")]
    #[schema(example = "add")]
    pub adjustment_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BulkAdjustmentItem {
    pub product_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub adjustment: AdjustInventoryPayload,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkAdjustPayload {
    #[validate(length(min = 1, message = "Informe ao menos um ajuste."), nested)]
    pub adjustments: Vec<BulkAdjustmentItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdjustmentOutcome {
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub quantity_change: i32,
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdjustInventoryResponse {
    pub message: String,
    pub adjustment: AdjustmentOutcome,
    pub inventory: Inventory,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkAdjustSuccess {
    pub product_id: Uuid,
    pub adjustment: AdjustmentOutcome,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkAdjustFailure {
    pub product_id: Uuid,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkAdjustSummary {
    pub total_adjustments: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkAdjustResponse {
    pub message: String,
    pub summary: BulkAdjustSummary,
    pub results: Vec<BulkAdjustSuccess>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<BulkAdjustFailure>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateThresholdsPayload {
    #[validate(range(min = 0, message = "O estoque mínimo não pode ser negativo."))]
    pub minimum_threshold: Option<i32>,
    #[validate(range(min = 0, message = "A capacidade máxima não pode ser negativa."))]
    pub maximum_capacity: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThresholdsResponse {
    pub message: String,
    pub inventory: Inventory,
}

// --- 4. Visões de leitura ---
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    LowStock,
    OutOfStock,
    InStock,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct InventoryFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<StockStatus>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct InventoryOverviewRow {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub selling_price: Decimal,
    pub category_name: Option<String>,
    pub current_quantity: i32,
    pub minimum_threshold: i32,
    pub maximum_capacity: Option<i32>,
    pub reserved_quantity: i32,
    pub last_updated: DateTime<Utc>,
    pub stock_status: String,
    pub capacity_percentage: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryListResponse {
    pub inventory: Vec<InventoryOverviewRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub transactions: Vec<InventoryTransactionView>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StockAlert {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category_name: Option<String>,
    pub current_quantity: i32,
    pub minimum_threshold: i32,
    pub alert_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryAlerts {
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
    pub total_alerts: usize,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct InventoryOverviewStats {
    pub total_products: i64,
    pub out_of_stock_count: i64,
    pub low_stock_count: i64,
    pub in_stock_count: i64,
    pub total_inventory_value: Decimal,
    pub total_selling_value: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct CategoryStockStats {
    pub category_name: String,
    pub product_count: i64,
    pub total_quantity: i64,
    pub category_value: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TransactionActivity {
    pub transaction_type: InventoryTransactionType,
    pub count: i64,
    pub total_quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryStats {
    pub overview: InventoryOverviewStats,
    pub by_category: Vec<CategoryStockStats>,
    pub recent_activity: Vec<TransactionActivity>,
}

// Conciliação: saldo em cache x soma do livro-razão
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LedgerMismatch {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub current_quantity: i32,
    pub ledger_quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciliationReport {
    pub consistent: bool,
    pub mismatches: Vec<LedgerMismatch>,
    pub checked_at: DateTime<Utc>,
}
