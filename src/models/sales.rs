// src/models/sales.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{common::db_utils::Pagination, models::settings::ShopSettings};

// ---
// Enums (espelham os tipos do Postgres)
// ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
            SaleStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Mixed,
    StoreCredit,
}

impl PaymentMethod {
    /// Métodos aceitos como forma de pagamento de uma venda.
    pub fn is_sale_method(&self) -> bool {
        matches!(self, PaymentMethod::Cash | PaymentMethod::Card | PaymentMethod::Upi | PaymentMethod::Mixed)
    }

    /// Métodos aceitos em cada parcela de pagamento.
    pub fn is_tender_method(&self) -> bool {
        matches!(self, PaymentMethod::Cash | PaymentMethod::Card | PaymentMethod::Upi)
    }

    /// Métodos aceitos para devolver o dinheiro no estorno.
    pub fn is_refund_method(&self) -> bool {
        matches!(self, PaymentMethod::Cash | PaymentMethod::Card | PaymentMethod::StoreCredit)
    }
}

// ---
// Entidades
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Sale {
    pub id: Uuid,
    pub sale_number: String,
    pub original_sale_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub gst_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub cashier_id: Uuid,
    pub sale_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Snapshot de preço e imposto, independente de mudanças futuras no catálogo
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_percentage: Decimal,
    pub gst_rate: Decimal,
    pub gst_amount: Decimal,
    pub line_subtotal: Decimal,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SaleItemDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: SaleItem,
    pub product_name: String,
    pub sku: String,
    pub unit: String,
}

// Item da venda original + o que já foi estornado dele
#[derive(Debug, Clone, FromRow)]
pub struct RefundableItem {
    #[sqlx(flatten)]
    pub item: SaleItem,
    pub product_name: String,
    pub refunded_quantity: i32,
    pub refunded_amount: Decimal,
    pub refunded_gst: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PaymentDetail {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub tendered_amount: Option<Decimal>,
    pub change_amount: Decimal,
    pub reference_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RefundItem {
    pub id: Uuid,
    pub refund_sale_id: Uuid,
    pub sale_item_id: Uuid,
    pub quantity: i32,
    pub amount: Decimal,
    pub gst_amount: Decimal,
    pub reason: Option<String>,
}

// Linha da listagem de vendas
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SaleListRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sale: Sale,
    pub cashier_name: Option<String>,
    pub item_count: i64,
}

// Dados de inserção da venda (já calculados pelo motor)
#[derive(Debug, Clone)]
pub struct NewSale {
    pub sale_number: String,
    pub original_sale_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub gst_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub cashier_id: Uuid,
}

// ---
// Payloads
// ---
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaleItemInput {
    pub product_id: Uuid,

    #[validate(range(min = 1, message = "A quantidade deve ser no mínimo 1."))]
    #[schema(example = 2)]
    pub quantity: i32,

    // Sobrescreve o preço de catálogo quando informado
    #[schema(value_type = Option<f64>)]
    pub unit_price: Option<Decimal>,

    #[schema(value_type = Option<f64>)]
    pub discount_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PaymentInput {
    pub method: PaymentMethod,

    #[schema(value_type = f64, example = 236.0)]
    pub amount: Decimal,

    #[validate(length(max = 100))]
    pub reference_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSalePayload {
    #[validate(length(min = 1, message = "A venda precisa de ao menos um item."), nested)]
    pub items: Vec<SaleItemInput>,

    pub payment_method: PaymentMethod,

    #[serde(default)]
    #[validate(nested)]
    pub payment_details: Vec<PaymentInput>,

    #[validate(length(max = 100))]
    pub customer_name: Option<String>,

    #[validate(length(max = 20))]
    pub customer_phone: Option<String>,

    #[validate(email(message = "E-mail do cliente inválido."))]
    pub customer_email: Option<String>,

    #[schema(value_type = Option<f64>)]
    pub discount_amount: Option<Decimal>,

    #[validate(length(max = 500))]
    pub notes: Option<String>,

    // Venda em espera: fica `pending` até ser concluída ou cancelada
    #[serde(default)]
    pub hold: bool,
}

// Colunas NUMERIC guardam 2 casas; valores mais finos quebrariam o snapshot
fn exceeds_cents(value: Decimal) -> bool {
    value.normalize().scale() > 2
}

fn field_error(errors: &mut ValidationErrors, field: &'static str, code: &'static str, message: &'static str) {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    errors.add(field, err);
}

impl CreateSalePayload {
    // Regras entre campos que o derive não expressa
    pub fn validate_business_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.payment_method.is_sale_method() {
            field_error(&mut errors, "payment_method", "payment_method",
                "Forma de pagamento deve ser cash, card, upi ou mixed.");
        }

        if self.payment_method == PaymentMethod::Mixed {
            if self.payment_details.len() < 2 {
                field_error(&mut errors, "payment_details", "mixed_min",
                    "Pagamento misto exige ao menos 2 formas de pagamento.");
            }
        } else if self.payment_details.len() > 1 {
            field_error(&mut errors, "payment_details", "single_max",
                "Apenas pagamentos mistos aceitam mais de uma forma de pagamento.");
        } else if let Some(detail) = self.payment_details.first() {
            if detail.method != self.payment_method {
                field_error(&mut errors, "payment_details", "method_mismatch",
                    "A forma de pagamento detalhada difere da forma da venda.");
            }
        }

        if self.payment_details.iter().any(|p| !p.method.is_tender_method()) {
            field_error(&mut errors, "payment_details", "tender_method",
                "Cada pagamento deve ser cash, card ou upi.");
        }
        if self.payment_details.iter().any(|p| p.amount.is_sign_negative()) {
            field_error(&mut errors, "payment_details", "amount",
                "O valor do pagamento não pode ser negativo.");
        }

        if self.items.iter().any(|i| i.unit_price.is_some_and(|p| p.is_sign_negative())) {
            field_error(&mut errors, "items", "unit_price", "O preço unitário não pode ser negativo.");
        }
        if self.items.iter().any(|i| {
            i.unit_price.is_some_and(exceeds_cents) || i.discount_percentage.is_some_and(exceeds_cents)
        }) {
            field_error(&mut errors, "items", "scale",
                "Preço unitário e desconto percentual aceitam no máximo 2 casas decimais.");
        }
        if self.payment_details.iter().any(|p| exceeds_cents(p.amount)) {
            field_error(&mut errors, "payment_details", "scale",
                "O valor do pagamento aceita no máximo 2 casas decimais.");
        }
        if self.discount_amount.is_some_and(exceeds_cents) {
            field_error(&mut errors, "discount_amount", "scale",
                "O desconto aceita no máximo 2 casas decimais.");
        }
        if self.items.iter().any(|i| {
            i.discount_percentage
                .is_some_and(|d| d.is_sign_negative() || d > Decimal::ONE_HUNDRED)
        }) {
            field_error(&mut errors, "items", "discount_percentage",
                "O desconto percentual deve estar entre 0 e 100.");
        }

        if self.discount_amount.is_some_and(|d| d.is_sign_negative()) {
            field_error(&mut errors, "discount_amount", "range", "O desconto não pode ser negativo.");
        }

        if let Some(phone) = &self.customer_phone {
            let valid = phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
            if !valid {
                field_error(&mut errors, "customer_phone", "phone", "Telefone do cliente inválido.");
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefundItemInput {
    pub sale_item_id: Uuid,

    #[validate(range(min = 1, message = "A quantidade deve ser no mínimo 1."))]
    pub quantity: i32,

    #[validate(length(max = 200))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefundPayload {
    #[validate(length(min = 1, message = "Informe ao menos um item para estorno."), nested)]
    pub items: Vec<RefundItemInput>,

    pub refund_method: PaymentMethod,
}

impl RefundPayload {
    pub fn validate_business_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !self.refund_method.is_refund_method() {
            field_error(&mut errors, "refund_method", "refund_method",
                "O estorno deve ser em cash, card ou store_credit.");
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CancelSalePayload {
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SaleFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cashier_id: Option<Uuid>,
    pub status: Option<SaleStatus>,
}

// ---
// Respostas
// ---
#[derive(Debug, Serialize, ToSchema)]
pub struct SaleDetails {
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
    pub payments: Vec<PaymentDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSaleResponse {
    pub message: String,
    #[serde(flatten)]
    pub details: SaleDetails,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefundedItem {
    pub sale_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub amount: Decimal,
    pub gst_amount: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefundResponse {
    pub message: String,
    pub refund: Sale,
    pub refunded_items: Vec<RefundedItem>,
    pub refund_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleListResponse {
    pub sales: Vec<SaleListRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleStatusResponse {
    pub message: String,
    pub sale: Sale,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Receipt {
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
    pub payments: Vec<PaymentDetail>,
    pub shop: ShopSettings,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptResponse {
    pub receipt: Receipt,
}
