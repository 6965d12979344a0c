// src/db/inventory_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::PageParams, error::AppError},
    models::inventory::{
        CategoryStockStats, Inventory, InventoryAlerts, InventoryFilter, InventoryOverviewRow,
        InventoryOverviewStats, InventoryStats, InventoryTransaction, InventoryTransactionType,
        InventoryTransactionView, LedgerMismatch, StockAlert, StockSnapshot, StockStatus,
        TransactionActivity, TransactionFilter,
    },
};

fn push_overview_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &InventoryFilter) {
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.sku ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    match filter.status {
        Some(StockStatus::LowStock) => {
            qb.push(" AND i.current_quantity <= i.minimum_threshold AND i.current_quantity > 0");
        }
        Some(StockStatus::OutOfStock) => {
            qb.push(" AND i.current_quantity = 0");
        }
        Some(StockStatus::InStock) => {
            qb.push(" AND i.current_quantity > i.minimum_threshold");
        }
        None => {}
    }
}

fn push_transaction_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    if let Some(product_id) = filter.product_id {
        qb.push(" AND t.product_id = ").push_bind(product_id);
    }
    if let Some(kind) = filter.transaction_type {
        qb.push(" AND t.transaction_type = ").push_bind(kind);
    }
}

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Escrita" (Transacionais)
    // ---
    // Estas usam o padrão genérico 'Executor' para rodar dentro de uma transação.

    pub async fn create_inventory<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        initial_quantity: i32,
        minimum_threshold: i32,
        maximum_capacity: Option<i32>,
    ) -> Result<Inventory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            INSERT INTO inventory (product_id, current_quantity, minimum_threshold, maximum_capacity)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(initial_quantity)
        .bind(minimum_threshold)
        .bind(maximum_capacity)
        .fetch_one(executor)
        .await?;
        Ok(inventory)
    }

    /// Trava (FOR UPDATE) as linhas de estoque dos produtos, sempre na ordem do
    /// product_id, e devolve o saldo junto com preço/GST/status do produto.
    pub async fn lock_stock<'e, E>(
        &self,
        executor: E,
        product_ids: &[Uuid],
    ) -> Result<Vec<StockSnapshot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, StockSnapshot>(
            r#"
            SELECT i.product_id, i.current_quantity, p.name, p.selling_price, p.gst_rate, p.status
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            WHERE i.product_id = ANY($1)
            ORDER BY i.product_id
            FOR UPDATE OF i
            "#,
        )
        .bind(product_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn lock_inventory<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<Option<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(
            "SELECT * FROM inventory WHERE product_id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(executor)
        .await?;
        Ok(inventory)
    }

    /// Soma `delta` ao saldo. Devolve None se o saldo ficaria negativo.
    pub async fn apply_quantity_change<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        delta: i32,
    ) -> Result<Option<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            UPDATE inventory
            SET current_quantity = current_quantity + $2, last_updated = NOW()
            WHERE product_id = $1 AND current_quantity + $2 >= 0
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;
        Ok(inventory)
    }

    pub async fn set_quantity<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        new_quantity: i32,
    ) -> Result<Inventory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            UPDATE inventory
            SET current_quantity = $2, last_updated = NOW()
            WHERE product_id = $1
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(new_quantity)
        .fetch_one(executor)
        .await?;
        Ok(inventory)
    }

    /// Registra uma movimentação no livro-razão (auditoria).
    #[allow(clippy::too_many_arguments)]
    pub async fn record_transaction<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        transaction_type: InventoryTransactionType,
        quantity_change: i32,
        reason: Option<&str>,
        reference_id: Option<Uuid>,
        created_by: Option<Uuid>,
    ) -> Result<InventoryTransaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, InventoryTransaction>(
            r#"
            INSERT INTO inventory_transactions
                (product_id, transaction_type, quantity_change, reason, reference_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(transaction_type)
        .bind(quantity_change)
        .bind(reason)
        .bind(reference_id)
        .bind(created_by)
        .fetch_one(executor)
        .await?;
        Ok(transaction)
    }

    pub async fn update_thresholds<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        minimum_threshold: Option<i32>,
        maximum_capacity: Option<i32>,
    ) -> Result<Option<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            UPDATE inventory SET
                minimum_threshold = COALESCE($2, minimum_threshold),
                maximum_capacity = COALESCE($3, maximum_capacity),
                last_updated = NOW()
            WHERE product_id = $1
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(minimum_threshold)
        .bind(maximum_capacity)
        .fetch_optional(executor)
        .await?;
        Ok(inventory)
    }

    // ---
    // Funções de "Leitura"
    // ---
    // Funções de leitura são simples e podem usar a pool principal.

    pub async fn list_overview(
        &self,
        filter: &InventoryFilter,
    ) -> Result<(Vec<InventoryOverviewRow>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        let page = PageParams { page: filter.page, limit: filter.limit };

        let mut count_qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COUNT(*)
            FROM products p
            JOIN inventory i ON i.product_id = p.id
            WHERE p.status = 'active'
            "#,
        );
        push_overview_filters(&mut count_qb, filter);
        let total = count_qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT p.id AS product_id, p.name, p.sku, p.selling_price,
                   c.name AS category_name,
                   i.current_quantity, i.minimum_threshold, i.maximum_capacity,
                   i.reserved_quantity, i.last_updated,
                   CASE
                       WHEN i.current_quantity = 0 THEN 'out_of_stock'
                       WHEN i.current_quantity <= i.minimum_threshold THEN 'low_stock'
                       ELSE 'in_stock'
                   END AS stock_status,
                   ROUND(i.current_quantity::NUMERIC / NULLIF(i.maximum_capacity, 0) * 100, 2)
                       AS capacity_percentage
            FROM products p
            JOIN inventory i ON i.product_id = p.id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'active'
            "#,
        );
        push_overview_filters(&mut qb, filter);
        // Mais críticos primeiro
        qb.push(
            r#"
            ORDER BY CASE
                         WHEN i.current_quantity = 0 THEN 1
                         WHEN i.current_quantity <= i.minimum_threshold THEN 2
                         ELSE 3
                     END,
                     p.name ASC
            LIMIT "#,
        )
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

        let rows = qb
            .build_query_as::<InventoryOverviewRow>()
            .fetch_all(&mut *conn)
            .await?;

        Ok((rows, total))
    }

    pub async fn alerts(&self) -> Result<InventoryAlerts, AppError> {
        let low_stock = sqlx::query_as::<_, StockAlert>(
            r#"
            SELECT p.id AS product_id, p.name, p.sku, c.name AS category_name,
                   i.current_quantity, i.minimum_threshold, 'low_stock' AS alert_type
            FROM products p
            JOIN inventory i ON i.product_id = p.id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'active'
              AND i.current_quantity <= i.minimum_threshold
              AND i.current_quantity > 0
            ORDER BY (i.current_quantity::FLOAT8 / NULLIF(i.minimum_threshold, 0)) ASC, p.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let out_of_stock = sqlx::query_as::<_, StockAlert>(
            r#"
            SELECT p.id AS product_id, p.name, p.sku, c.name AS category_name,
                   i.current_quantity, i.minimum_threshold, 'out_of_stock' AS alert_type
            FROM products p
            JOIN inventory i ON i.product_id = p.id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'active' AND i.current_quantity = 0
            ORDER BY p.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let total_alerts = low_stock.len() + out_of_stock.len();
        Ok(InventoryAlerts { low_stock, out_of_stock, total_alerts })
    }

    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<(Vec<InventoryTransactionView>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        let page = PageParams { page: filter.page, limit: filter.limit };

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM inventory_transactions t WHERE 1=1");
        push_transaction_filters(&mut count_qb, filter);
        let total = count_qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT t.*, p.name AS product_name, p.sku,
                   u.full_name AS created_by_name, s.sale_number
            FROM inventory_transactions t
            JOIN products p ON p.id = t.product_id
            LEFT JOIN users u ON u.id = t.created_by
            LEFT JOIN sales s ON s.id = t.reference_id
            WHERE 1=1
            "#,
        );
        push_transaction_filters(&mut qb, filter);
        qb.push(" ORDER BY t.created_at DESC, t.id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<InventoryTransactionView>()
            .fetch_all(&mut *conn)
            .await?;

        Ok((rows, total))
    }

    pub async fn stats(&self) -> Result<InventoryStats, AppError> {
        // Iniciamos uma transação (Snapshot consistente dos dados)
        let mut tx = self.pool.begin().await?;

        // A. Visão geral
        let overview = sqlx::query_as::<_, InventoryOverviewStats>(
            r#"
            SELECT
                COUNT(*) AS total_products,
                COALESCE(SUM(CASE WHEN i.current_quantity = 0 THEN 1 ELSE 0 END), 0) AS out_of_stock_count,
                COALESCE(SUM(CASE WHEN i.current_quantity <= i.minimum_threshold
                                   AND i.current_quantity > 0 THEN 1 ELSE 0 END), 0) AS low_stock_count,
                COALESCE(SUM(CASE WHEN i.current_quantity > i.minimum_threshold THEN 1 ELSE 0 END), 0)
                    AS in_stock_count,
                COALESCE(SUM(i.current_quantity * p.purchase_price), 0) AS total_inventory_value,
                COALESCE(SUM(i.current_quantity * p.selling_price), 0) AS total_selling_value
            FROM products p
            JOIN inventory i ON i.product_id = p.id
            WHERE p.status = 'active'
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        // B. Por categoria
        let by_category = sqlx::query_as::<_, CategoryStockStats>(
            r#"
            SELECT
                c.name AS category_name,
                COUNT(p.id) AS product_count,
                COALESCE(SUM(i.current_quantity), 0)::BIGINT AS total_quantity,
                COALESCE(SUM(i.current_quantity * p.selling_price), 0) AS category_value
            FROM categories c
            JOIN products p ON p.category_id = c.id AND p.status = 'active'
            JOIN inventory i ON i.product_id = p.id
            WHERE c.status = 'active'
            GROUP BY c.id, c.name
            ORDER BY category_value DESC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        // C. Movimentações dos últimos 7 dias
        let recent_activity = sqlx::query_as::<_, TransactionActivity>(
            r#"
            SELECT
                t.transaction_type,
                COUNT(*) AS count,
                COALESCE(SUM(ABS(t.quantity_change)), 0)::BIGINT AS total_quantity
            FROM inventory_transactions t
            WHERE t.created_at >= CURRENT_DATE - INTERVAL '7 days'
            GROUP BY t.transaction_type
            ORDER BY total_quantity DESC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(InventoryStats { overview, by_category, recent_activity })
    }

    /// Produtos cujo saldo em cache difere da soma do livro-razão.
    pub async fn ledger_mismatches(&self) -> Result<Vec<LedgerMismatch>, AppError> {
        let rows = sqlx::query_as::<_, LedgerMismatch>(
            r#"
            SELECT p.id AS product_id, p.name, p.sku, i.current_quantity,
                   COALESCE(SUM(t.quantity_change), 0)::BIGINT AS ledger_quantity
            FROM inventory i
            JOIN products p ON p.id = i.product_id
            LEFT JOIN inventory_transactions t ON t.product_id = i.product_id
            GROUP BY p.id, p.name, p.sku, i.current_quantity
            HAVING i.current_quantity <> COALESCE(SUM(t.quantity_change), 0)
            ORDER BY p.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
