// tests/sales_flow.rs
//
// Precisam de um Postgres (DATABASE_URL). Rode com `cargo test -- --ignored`.

mod common;

use pos_backend::{
    common::error::AppError,
    models::{
        auth::UserRole,
        inventory::{InventoryTransactionType, TransactionFilter},
        sales::{
            CancelSalePayload, PaymentInput, PaymentMethod, RefundItemInput, RefundPayload,
            SaleStatus,
        },
    },
};
use rust_decimal_macros::dec;
use sqlx::PgPool;

use common::{cash_sale, create_product, create_user, state, stock_of};

async fn count_sales(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sales")
        .fetch_one(pool)
        .await
        .expect("count sales")
}

fn refund_payload(sale_item_id: uuid::Uuid, quantity: i32) -> RefundPayload {
    RefundPayload {
        items: vec![RefundItemInput { sale_item_id, quantity, reason: None }],
        refund_method: PaymentMethod::Cash,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_cash_sale_computes_totals_and_decrements_stock(pool: PgPool) {
    let state = state(pool);
    let cashier = create_user(&state, "caixa01", UserRole::Cashier).await;
    let product = create_product(&state, &cashier, "A-001", 10).await;
    let product_id = product.product.id;

    let details = state
        .sales_service
        .create_sale(&cash_sale(product_id, 2, dec!(236.00)), cashier.id)
        .await
        .expect("sale");

    assert_eq!(details.sale.subtotal, dec!(200.00));
    assert_eq!(details.sale.gst_amount, dec!(36.00));
    assert_eq!(details.sale.total_amount, dec!(236.00));
    assert_eq!(details.sale.status, SaleStatus::Completed);
    assert!(details.sale.sale_number.starts_with("SL"));
    assert_eq!(details.sale.sale_number.len(), 14);

    // O dia do número é o mesmo dia que os relatórios usam
    let sale_day: String = sqlx::query_scalar("SELECT to_char(sale_date::date, 'YYYYMMDD') FROM sales WHERE id = $1")
        .bind(details.sale.id)
        .fetch_one(&state.db_pool)
        .await
        .expect("sale day");
    assert_eq!(&details.sale.sale_number[2..10], sale_day);

    assert_eq!(details.payments.len(), 1);
    assert_eq!(details.payments[0].amount, dec!(236.00));
    assert_eq!(details.payments[0].change_amount, dec!(0));

    assert_eq!(stock_of(&state, product_id).await, 8);

    let ledger = state
        .inventory_service
        .transactions(&TransactionFilter {
            product_id: Some(product_id),
            transaction_type: Some(InventoryTransactionType::Sale),
            ..Default::default()
        })
        .await
        .expect("ledger");
    assert_eq!(ledger.transactions.len(), 1);
    assert_eq!(ledger.transactions[0].transaction.quantity_change, -2);
    assert_eq!(ledger.transactions[0].transaction.reference_id, Some(details.sale.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_cash_overpayment_records_change(pool: PgPool) {
    let state = state(pool);
    let cashier = create_user(&state, "caixa01", UserRole::Cashier).await;
    let product = create_product(&state, &cashier, "A-001", 10).await;

    let details = state
        .sales_service
        .create_sale(&cash_sale(product.product.id, 2, dec!(250.00)), cashier.id)
        .await
        .expect("sale");

    let payment = &details.payments[0];
    assert_eq!(payment.amount, dec!(236.00));
    assert_eq!(payment.tendered_amount, Some(dec!(250.00)));
    assert_eq!(payment.change_amount, dec!(14.00));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_underpayment_is_rejected_without_writes(pool: PgPool) {
    let state = state(pool.clone());
    let cashier = create_user(&state, "caixa01", UserRole::Cashier).await;
    let product = create_product(&state, &cashier, "A-001", 10).await;

    let result = state
        .sales_service
        .create_sale(&cash_sale(product.product.id, 2, dec!(200.00)), cashier.id)
        .await;

    assert!(matches!(result, Err(AppError::PaymentError(_))));
    assert_eq!(stock_of(&state, product.product.id).await, 10);
    assert_eq!(count_sales(&pool).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_insufficient_stock_is_rejected_without_writes(pool: PgPool) {
    let state = state(pool.clone());
    let cashier = create_user(&state, "caixa01", UserRole::Cashier).await;
    let product = create_product(&state, &cashier, "A-001", 3).await;

    let result = state
        .sales_service
        .create_sale(&cash_sale(product.product.id, 4, dec!(1000.00)), cashier.id)
        .await;

    match result {
        Err(AppError::StockError(msg)) => assert!(msg.contains("Disponível: 3")),
        other => panic!("esperava StockError, veio {:?}", other.map(|d| d.sale.id)),
    }
    assert_eq!(stock_of(&state, product.product.id).await, 3);
    assert_eq!(count_sales(&pool).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_concurrent_sales_never_oversell(pool: PgPool) {
    let state = state(pool);
    let cashier = create_user(&state, "caixa01", UserRole::Cashier).await;
    let product = create_product(&state, &cashier, "A-001", 10).await;
    let product_id = product.product.id;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = state.sales_service.clone();
        let payload = cash_sale(product_id, 6, dec!(708.00));
        let cashier_id = cashier.id;
        handles.push(tokio::spawn(async move {
            service.create_sale(&payload, cashier_id).await
        }));
    }

    let mut successes = 0;
    let mut stock_errors = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(_) => successes += 1,
            Err(AppError::StockError(_)) => stock_errors += 1,
            Err(e) => panic!("erro inesperado: {}", e),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(stock_errors, 1);
    assert_eq!(stock_of(&state, product_id).await, 4);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_refund_limits_and_numbering(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product = create_product(&state, &manager, "A-001", 10).await;
    let product_id = product.product.id;

    let sale = state
        .sales_service
        .create_sale(&cash_sale(product_id, 2, dec!(236.00)), manager.id)
        .await
        .expect("sale");
    let sale_item_id = sale.items[0].item.id;

    let refund_of = |quantity| RefundPayload {
        items: vec![RefundItemInput { sale_item_id, quantity, reason: None }],
        refund_method: PaymentMethod::Cash,
    };

    // Vendeu 2, pedir 3 falha sem alterar nada
    let over = state.sales_service.refund_sale(sale.sale.id, &refund_of(3), manager.id).await;
    assert!(matches!(over, Err(AppError::RefundError(_))));
    assert_eq!(stock_of(&state, product_id).await, 8);

    let first = state
        .sales_service
        .refund_sale(sale.sale.id, &refund_of(1), manager.id)
        .await
        .expect("first refund");
    assert_eq!(first.refund_total, dec!(118.00));
    assert_eq!(first.refund.total_amount, dec!(-118.00));
    assert_eq!(first.refund.gst_amount, dec!(-18.00));
    assert_eq!(first.refund.status, SaleStatus::Refunded);
    assert_eq!(first.refund.original_sale_id, Some(sale.sale.id));
    assert_eq!(first.refund.sale_number, format!("RF{}", sale.sale.sale_number));
    assert_eq!(stock_of(&state, product_id).await, 9);

    // Resta 1 unidade estornável
    let over_remaining = state.sales_service.refund_sale(sale.sale.id, &refund_of(2), manager.id).await;
    assert!(matches!(over_remaining, Err(AppError::RefundError(_))));

    let second = state
        .sales_service
        .refund_sale(sale.sale.id, &refund_of(1), manager.id)
        .await
        .expect("second refund");
    assert_eq!(second.refund.sale_number, format!("RF{}-2", sale.sale.sale_number));
    assert_eq!(stock_of(&state, product_id).await, 10);

    // A venda original não é alterada
    let original = state.sales_service.get_sale(sale.sale.id).await.expect("original");
    assert_eq!(original.sale.status, SaleStatus::Completed);
    assert_eq!(original.sale.total_amount, dec!(236.00));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_cancel_rules_for_held_and_completed_sales(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product = create_product(&state, &manager, "A-001", 10).await;
    let product_id = product.product.id;

    let completed = state
        .sales_service
        .create_sale(&cash_sale(product_id, 1, dec!(118.00)), manager.id)
        .await
        .expect("completed sale");
    let refused = state
        .sales_service
        .cancel_sale(completed.sale.id, &CancelSalePayload::default(), manager.id)
        .await;
    assert!(matches!(refused, Err(AppError::CannotCancelCompleted)));

    let mut held_payload = cash_sale(product_id, 2, dec!(236.00));
    held_payload.hold = true;
    let held = state
        .sales_service
        .create_sale(&held_payload, manager.id)
        .await
        .expect("held sale");
    assert_eq!(held.sale.status, SaleStatus::Pending);
    assert_eq!(stock_of(&state, product_id).await, 7);

    let cancelled = state
        .sales_service
        .cancel_sale(
            held.sale.id,
            &CancelSalePayload { reason: Some("Cliente desistiu".to_string()) },
            manager.id,
        )
        .await
        .expect("cancel");
    assert_eq!(cancelled.status, SaleStatus::Cancelled);
    assert_eq!(stock_of(&state, product_id).await, 9);

    let again = state
        .sales_service
        .cancel_sale(held.sale.id, &CancelSalePayload::default(), manager.id)
        .await;
    assert!(matches!(again, Err(AppError::AlreadyCancelled)));

    let report = state.inventory_service.reconcile().await.expect("reconcile");
    assert!(report.consistent);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_held_sale_can_be_completed_once(pool: PgPool) {
    let state = state(pool);
    let cashier = create_user(&state, "caixa01", UserRole::Cashier).await;
    let product = create_product(&state, &cashier, "A-001", 10).await;

    let mut payload = cash_sale(product.product.id, 1, dec!(118.00));
    payload.hold = true;
    let held = state.sales_service.create_sale(&payload, cashier.id).await.expect("held");

    let completed = state.sales_service.complete_sale(held.sale.id).await.expect("complete");
    assert_eq!(completed.status, SaleStatus::Completed);

    let again = state.sales_service.complete_sale(held.sale.id).await;
    assert!(matches!(again, Err(AppError::InvalidSaleStatus(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_mixed_sale_persists_each_payment(pool: PgPool) {
    let state = state(pool);
    let cashier = create_user(&state, "caixa01", UserRole::Cashier).await;
    let product = create_product(&state, &cashier, "A-001", 10).await;

    let mut payload = cash_sale(product.product.id, 2, dec!(0));
    payload.payment_method = PaymentMethod::Mixed;
    payload.payment_details = vec![
        PaymentInput { method: PaymentMethod::Cash, amount: dec!(100.00), reference_number: None },
        PaymentInput { method: PaymentMethod::Upi, amount: dec!(136.00), reference_number: Some("UPI-778".into()) },
    ];

    let details = state.sales_service.create_sale(&payload, cashier.id).await.expect("mixed sale");
    assert_eq!(details.sale.payment_method, PaymentMethod::Mixed);

    let stored = state.sales_service.get_sale(details.sale.id).await.expect("stored");
    assert_eq!(stored.payments.len(), 2);
    let paid: rust_decimal::Decimal = stored.payments.iter().map(|p| p.amount).sum();
    assert_eq!(paid, stored.sale.total_amount);
    assert!(stored.payments.iter().any(|p| p.payment_method == PaymentMethod::Upi));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_refund_with_item_from_another_sale_writes_nothing(pool: PgPool) {
    let state = state(pool.clone());
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product_id = create_product(&state, &manager, "A-001", 10).await.product.id;

    let first = state
        .sales_service
        .create_sale(&cash_sale(product_id, 1, dec!(118.00)), manager.id)
        .await
        .expect("first sale");
    let second = state
        .sales_service
        .create_sale(&cash_sale(product_id, 1, dec!(118.00)), manager.id)
        .await
        .expect("second sale");

    let foreign_item = second.items[0].item.id;
    let result = state
        .sales_service
        .refund_sale(first.sale.id, &refund_payload(foreign_item, 1), manager.id)
        .await;

    assert!(matches!(result, Err(AppError::RefundError(_))));
    assert_eq!(count_sales(&pool).await, 2);
    assert_eq!(stock_of(&state, product_id).await, 8);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_refund_record_cannot_be_cancelled(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product_id = create_product(&state, &manager, "A-001", 10).await.product.id;

    let sale = state
        .sales_service
        .create_sale(&cash_sale(product_id, 1, dec!(118.00)), manager.id)
        .await
        .expect("sale");
    let refund = state
        .sales_service
        .refund_sale(sale.sale.id, &refund_payload(sale.items[0].item.id, 1), manager.id)
        .await
        .expect("refund");

    let result = state
        .sales_service
        .cancel_sale(refund.refund.id, &CancelSalePayload::default(), manager.id)
        .await;
    match result {
        Err(err) => assert_eq!(err.code(), "INVALID_SALE_STATUS"),
        Ok(sale) => panic!("estorno cancelado: {}", sale.sale_number),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_pending_sale_is_not_refundable(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product_id = create_product(&state, &manager, "A-001", 10).await.product.id;

    let mut payload = cash_sale(product_id, 1, dec!(118.00));
    payload.hold = true;
    let held = state.sales_service.create_sale(&payload, manager.id).await.expect("held");

    let result = state
        .sales_service
        .refund_sale(held.sale.id, &refund_payload(held.items[0].item.id, 1), manager.id)
        .await;
    match result {
        Err(err) => assert_eq!(err.code(), "SALE_NOT_REFUNDABLE"),
        Ok(refund) => panic!("estorno de venda pendente: {}", refund.refund.sale_number),
    }
    assert_eq!(stock_of(&state, product_id).await, 9);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_daily_summary_defaults_to_the_sale_number_day(pool: PgPool) {
    let state = state(pool);
    let cashier = create_user(&state, "caixa01", UserRole::Cashier).await;
    let product = create_product(&state, &cashier, "A-001", 10).await;

    let sale = state
        .sales_service
        .create_sale(&cash_sale(product.product.id, 2, dec!(236.00)), cashier.id)
        .await
        .expect("sale");

    let summary = state.dashboard_service.daily_summary(None).await.expect("summary");
    assert_eq!(&sale.sale.sale_number[2..10], summary.date.format("%Y%m%d").to_string());
    assert_eq!(summary.summary.total_sales, 1);
    assert_eq!(summary.summary.total_revenue, dec!(236.00));
}
