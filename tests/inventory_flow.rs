// tests/inventory_flow.rs
//
// Precisam de um Postgres (DATABASE_URL). Rode com `cargo test -- --ignored`.

mod common;

use pos_backend::{
    common::error::AppError,
    models::{
        auth::UserRole,
        catalog::{CreateCategoryPayload, UpdateCategoryPayload},
        inventory::{
            AdjustInventoryPayload, BulkAdjustPayload, BulkAdjustmentItem, InventoryTransactionType,
            TransactionFilter, UpdateThresholdsPayload,
        },
    },
};
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use common::{cash_sale, create_product, create_user, state, stock_of};

fn adjustment(kind: &str, quantity: i32) -> AdjustInventoryPayload {
    AdjustInventoryPayload {
        quantity,
        reason: "Contagem física".to_string(),
        adjustment_type: kind.to_string(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_initial_stock_is_recorded_in_ledger(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product = create_product(&state, &manager, "A-001", 10).await;

    let ledger = state
        .inventory_service
        .transactions(&TransactionFilter {
            product_id: Some(product.product.id),
            ..Default::default()
        })
        .await
        .expect("ledger");

    assert_eq!(ledger.transactions.len(), 1);
    let entry = &ledger.transactions[0].transaction;
    assert_eq!(entry.transaction_type, InventoryTransactionType::Purchase);
    assert_eq!(entry.quantity_change, 10);
    assert_eq!(entry.reason.as_deref(), Some("Initial stock"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_adjust_add_remove_set(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product_id = create_product(&state, &manager, "A-001", 10).await.product.id;

    let (added, _) = state
        .inventory_service
        .adjust(product_id, &adjustment("add", 5), manager.id)
        .await
        .expect("add");
    assert_eq!((added.previous_quantity, added.new_quantity, added.quantity_change), (10, 15, 5));

    // remove satura em zero
    let (removed, inventory) = state
        .inventory_service
        .adjust(product_id, &adjustment("remove", 40), manager.id)
        .await
        .expect("remove");
    assert_eq!(removed.new_quantity, 0);
    assert_eq!(removed.quantity_change, -15);
    assert_eq!(inventory.current_quantity, 0);

    let (set, _) = state
        .inventory_service
        .adjust(product_id, &adjustment("set", 7), manager.id)
        .await
        .expect("set");
    assert_eq!(set.quantity_change, 7);

    let invalid = state
        .inventory_service
        .adjust(product_id, &adjustment("transfer", 1), manager.id)
        .await;
    assert!(matches!(invalid, Err(AppError::InvalidAdjustmentType(_))));

    let negative = state
        .inventory_service
        .adjust(product_id, &adjustment("set", -1), manager.id)
        .await;
    assert!(matches!(negative, Err(AppError::NegativeQuantity)));

    assert_eq!(stock_of(&state, product_id).await, 7);
    let report = state.inventory_service.reconcile().await.expect("reconcile");
    assert!(report.consistent);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_bulk_adjust_commits_the_successful_subset(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let first = create_product(&state, &manager, "A-001", 10).await.product.id;
    let second = create_product(&state, &manager, "B-001", 4).await.product.id;
    let missing = Uuid::new_v4();

    let payload = BulkAdjustPayload {
        adjustments: vec![
            BulkAdjustmentItem { product_id: first, adjustment: adjustment("add", 3) },
            BulkAdjustmentItem { product_id: missing, adjustment: adjustment("add", 1) },
            BulkAdjustmentItem { product_id: second, adjustment: adjustment("set", -2) },
            BulkAdjustmentItem { product_id: second, adjustment: adjustment("remove", 1) },
        ],
    };

    let response = state
        .inventory_service
        .bulk_adjust(&payload, manager.id)
        .await
        .expect("bulk");

    assert_eq!(response.summary.total_adjustments, 4);
    assert_eq!(response.summary.successful, 2);
    assert_eq!(response.summary.failed, 2);
    assert_eq!(response.errors[0].product_id, missing);
    assert_eq!(response.errors[0].code, "INVENTORY_NOT_FOUND");
    assert_eq!(response.errors[1].code, "NEGATIVE_QUANTITY");

    assert_eq!(stock_of(&state, first).await, 13);
    assert_eq!(stock_of(&state, second).await, 3);

    let report = state.inventory_service.reconcile().await.expect("reconcile");
    assert!(report.consistent);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_concurrent_bulk_adjusts_in_opposite_order_both_commit(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let a = create_product(&state, &manager, "A-001", 10).await.product.id;
    let b = create_product(&state, &manager, "B-001", 10).await.product.id;

    let rounds = 20;
    for _ in 0..rounds {
        let mut handles = Vec::new();
        for order in [[a, b], [b, a]] {
            let service = state.inventory_service.clone();
            let payload = BulkAdjustPayload {
                adjustments: order
                    .iter()
                    .map(|&product_id| BulkAdjustmentItem { product_id, adjustment: adjustment("add", 1) })
                    .collect(),
            };
            let actor = manager.id;
            handles.push(tokio::spawn(async move { service.bulk_adjust(&payload, actor).await }));
        }

        for handle in handles {
            let response = handle.await.expect("join").expect("bulk sem deadlock");
            assert_eq!(response.summary.successful, 2);
        }
    }

    assert_eq!(stock_of(&state, a).await, 10 + 2 * rounds);
    assert_eq!(stock_of(&state, b).await, 10 + 2 * rounds);
    let report = state.inventory_service.reconcile().await.expect("reconcile");
    assert!(report.consistent);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_ledger_matches_stock_after_mixed_operations(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product_id = create_product(&state, &manager, "A-001", 10).await.product.id;

    state
        .sales_service
        .create_sale(&cash_sale(product_id, 3, dec!(354.00)), manager.id)
        .await
        .expect("sale");
    state
        .inventory_service
        .adjust(product_id, &adjustment("add", 2), manager.id)
        .await
        .expect("adjust");

    // Divergência provocada fora do serviço
    sqlx::query("UPDATE inventory SET current_quantity = current_quantity + 1 WHERE product_id = $1")
        .bind(product_id)
        .execute(&state.db_pool)
        .await
        .expect("drift");

    let report = state.inventory_service.reconcile().await.expect("reconcile");
    assert!(!report.consistent);
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].current_quantity, 10);
    assert_eq!(report.mismatches[0].ledger_quantity, 9);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_thresholds_require_a_field(pool: PgPool) {
    let state = state(pool);
    let manager = create_user(&state, "gerente", UserRole::Manager).await;
    let product_id = create_product(&state, &manager, "A-001", 10).await.product.id;

    let empty = state
        .inventory_service
        .update_thresholds(product_id, &UpdateThresholdsPayload { minimum_threshold: None, maximum_capacity: None })
        .await;
    assert!(matches!(empty, Err(AppError::ValidationError(_))));

    let inventory = state
        .inventory_service
        .update_thresholds(product_id, &UpdateThresholdsPayload { minimum_threshold: Some(15), maximum_capacity: None })
        .await
        .expect("thresholds");
    assert_eq!(inventory.minimum_threshold, 15);

    let alerts = state.inventory_service.alerts().await.expect("alerts");
    assert_eq!(alerts.low_stock.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_category_cannot_move_below_its_descendant(pool: PgPool) {
    let state = state(pool);
    let catalog = &state.catalog_service;

    let root = catalog
        .create_category(&CreateCategoryPayload { name: "Bebidas".into(), description: None, parent_id: None })
        .await
        .expect("root");
    let child = catalog
        .create_category(&CreateCategoryPayload { name: "Sucos".into(), description: None, parent_id: Some(root.id) })
        .await
        .expect("child");

    let cycle = catalog
        .update_category(
            root.id,
            &UpdateCategoryPayload { name: None, description: None, parent_id: Some(child.id), move_to_root: false },
        )
        .await;
    assert!(matches!(cycle, Err(AppError::ValidationError(_))));

    let moved = catalog
        .update_category(
            child.id,
            &UpdateCategoryPayload { name: None, description: None, parent_id: None, move_to_root: true },
        )
        .await
        .expect("move to root");
    assert_eq!(moved.parent_id, None);

    let tree = catalog.category_hierarchy().await.expect("tree");
    assert_eq!(tree.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer Postgres (DATABASE_URL)"]
async fn test_category_detail_lists_direct_subcategories(pool: PgPool) {
    let state = state(pool);
    let catalog = &state.catalog_service;

    let root = catalog
        .create_category(&CreateCategoryPayload { name: "Bebidas".into(), description: None, parent_id: None })
        .await
        .expect("root");
    for name in ["Sucos", "Águas"] {
        catalog
            .create_category(&CreateCategoryPayload { name: name.into(), description: None, parent_id: Some(root.id) })
            .await
            .expect("child");
    }

    let detail = catalog.get_category(root.id).await.expect("detail");
    assert_eq!(detail.category.category.id, root.id);
    assert_eq!(detail.category.product_count, 0);
    assert_eq!(detail.subcategories.len(), 2);

    let missing = catalog.get_category(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::CategoryNotFound)));
}
