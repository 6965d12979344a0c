// tests/common/mod.rs

#![allow(dead_code)]

use pos_backend::{
    config::{AppState, Config},
    models::{
        auth::{RegisterUserPayload, User, UserRole},
        catalog::{CreateProductPayload, ProductWithStock},
        sales::{CreateSalePayload, PaymentInput, PaymentMethod, SaleItemInput},
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/unused".to_string(),
        jwt_secret: "segredo-de-teste".to_string(),
        jwt_expires_in_hours: 1,
        bind_addr: "127.0.0.1:0".to_string(),
        db_max_connections: 5,
        db_acquire_timeout_secs: 3,
        bootstrap_admin: None,
    }
}

pub fn state(pool: PgPool) -> AppState {
    AppState::from_pool(pool, &test_config())
}

pub async fn create_user(state: &AppState, username: &str, role: UserRole) -> User {
    state
        .auth_service
        .register_user(&RegisterUserPayload {
            username: username.to_string(),
            email: format!("{}@loja.test", username),
            password: "senha-forte".to_string(),
            full_name: username.to_string(),
            role,
        })
        .await
        .expect("create user")
}

/// Produto A: preço 100, GST 18%, estoque 10.
pub async fn create_product(state: &AppState, actor: &User, sku: &str, stock: i32) -> ProductWithStock {
    state
        .catalog_service
        .create_product(
            &CreateProductPayload {
                name: format!("Produto {}", sku),
                description: None,
                sku: sku.to_string(),
                barcode: None,
                category_id: None,
                purchase_price: dec!(60),
                selling_price: dec!(100),
                gst_rate: dec!(18),
                unit: None,
                initial_stock: Some(stock),
                minimum_threshold: None,
                maximum_capacity: None,
            },
            actor.id,
        )
        .await
        .expect("create product")
}

pub fn cash_sale(product_id: Uuid, quantity: i32, tendered: Decimal) -> CreateSalePayload {
    CreateSalePayload {
        items: vec![SaleItemInput {
            product_id,
            quantity,
            unit_price: None,
            discount_percentage: None,
        }],
        payment_method: PaymentMethod::Cash,
        payment_details: vec![PaymentInput {
            method: PaymentMethod::Cash,
            amount: tendered,
            reference_number: None,
        }],
        customer_name: None,
        customer_phone: None,
        customer_email: None,
        discount_amount: None,
        notes: None,
        hold: false,
    }
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> i32 {
    state
        .catalog_service
        .get_product(product_id)
        .await
        .expect("product")
        .current_quantity
}
