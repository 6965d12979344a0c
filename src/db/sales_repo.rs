// src/db/sales_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::PageParams, error::AppError},
    models::sales::{
        NewSale, PaymentDetail, RefundItem, RefundableItem, Sale, SaleFilter, SaleItem,
        SaleItemDetail, SaleListRow, SaleStatus,
    },
    services::pricing::{PlannedPayment, PricedLine},
};

fn push_sale_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &SaleFilter) {
    if let Some(start) = filter.start_date {
        qb.push(" AND s.sale_date::date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND s.sale_date::date <= ").push_bind(end);
    }
    if let Some(cashier_id) = filter.cashier_id {
        qb.push(" AND s.cashier_id = ").push_bind(cashier_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND s.status = ").push_bind(status);
    }
}

#[derive(Clone)]
pub struct SalesRepository {
    pool: PgPool,
}

impl SalesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Numeração
    // ---

    /// Dia corrente do banco, o mesmo que `sale_date::date` usa nos relatórios.
    pub async fn current_day<'e, E>(&self, executor: E) -> Result<NaiveDate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let day = sqlx::query_scalar::<_, NaiveDate>("SELECT CURRENT_DATE")
            .fetch_one(executor)
            .await?;
        Ok(day)
    }

    /// Próximo número do dia. O UPSERT trava a linha do dia até o fim da
    /// transação, serializando vendas concorrentes.
    pub async fn next_daily_sequence<'e, E>(&self, executor: E, day: NaiveDate) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let value = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO sale_number_sequences (sale_day, last_value)
            VALUES ($1, 1)
            ON CONFLICT (sale_day)
            DO UPDATE SET last_value = sale_number_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(day)
        .fetch_one(executor)
        .await?;
        Ok(value)
    }

    // ---
    // Escrita (Transacional)
    // ---

    pub async fn insert_sale<'e, E>(&self, executor: E, sale: &NewSale) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                sale_number, original_sale_id, subtotal, gst_amount, discount_amount, total_amount,
                payment_method, status, customer_name, customer_phone, customer_email, notes, cashier_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&sale.sale_number)
        .bind(sale.original_sale_id)
        .bind(sale.subtotal)
        .bind(sale.gst_amount)
        .bind(sale.discount_amount)
        .bind(sale.total_amount)
        .bind(sale.payment_method)
        .bind(sale.status)
        .bind(&sale.customer_name)
        .bind(&sale.customer_phone)
        .bind(&sale.customer_email)
        .bind(&sale.notes)
        .bind(sale.cashier_id)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    pub async fn insert_sale_item<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        line: &PricedLine,
    ) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (
                sale_id, product_id, quantity, unit_price, discount_percentage,
                gst_rate, gst_amount, line_subtotal, total_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount_percentage)
        .bind(line.gst_rate)
        .bind(line.gst_amount)
        .bind(line.line_subtotal)
        .bind(line.total_amount)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    pub async fn insert_payment<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        payment: &PlannedPayment,
    ) -> Result<PaymentDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, PaymentDetail>(
            r#"
            INSERT INTO payment_details
                (sale_id, payment_method, amount, tendered_amount, change_amount, reference_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(payment.method)
        .bind(payment.amount)
        .bind(payment.tendered_amount)
        .bind(payment.change_amount)
        .bind(&payment.reference_number)
        .fetch_one(executor)
        .await?;
        Ok(detail)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_refund_item<'e, E>(
        &self,
        executor: E,
        refund_sale_id: Uuid,
        sale_item_id: Uuid,
        quantity: i32,
        amount: Decimal,
        gst_amount: Decimal,
        reason: Option<&str>,
    ) -> Result<RefundItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, RefundItem>(
            r#"
            INSERT INTO refund_items (refund_sale_id, sale_item_id, quantity, amount, gst_amount, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(refund_sale_id)
        .bind(sale_item_id)
        .bind(quantity)
        .bind(amount)
        .bind(gst_amount)
        .bind(reason)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    /// Troca o status somente se a venda ainda estiver em `from`.
    pub async fn transition_status<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        from: SaleStatus,
        to: SaleStatus,
        notes: Option<&str>,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales
            SET status = $3, notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(from)
        .bind(to)
        .bind(notes)
        .fetch_optional(executor)
        .await?;
        Ok(sale)
    }

    // ---
    // Leitura
    // ---

    pub async fn find_by_id<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
            .bind(sale_id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    /// Trava a venda para serializar estornos/cancelamentos concorrentes.
    pub async fn lock_by_id<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 FOR UPDATE")
            .bind(sale_id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn find_items<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Vec<SaleItemDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT si.*, p.name AS product_name, p.sku, p.unit
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = $1
            ORDER BY p.name ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn find_payments<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Vec<PaymentDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, PaymentDetail>(
            "SELECT * FROM payment_details WHERE sale_id = $1 ORDER BY created_at ASC, id",
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(payments)
    }

    /// Itens da venda com o total já estornado de cada um.
    pub async fn find_refundable_items<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Vec<RefundableItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, RefundableItem>(
            r#"
            SELECT si.*, p.name AS product_name,
                   COALESCE(r.quantity, 0)::INT AS refunded_quantity,
                   COALESCE(r.amount, 0) AS refunded_amount,
                   COALESCE(r.gst_amount, 0) AS refunded_gst
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            LEFT JOIN (
                SELECT sale_item_id,
                       SUM(quantity) AS quantity,
                       SUM(amount) AS amount,
                       SUM(gst_amount) AS gst_amount
                FROM refund_items
                GROUP BY sale_item_id
            ) r ON r.sale_item_id = si.id
            WHERE si.sale_id = $1
            "#,
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn count_refunds<'e, E>(&self, executor: E, original_sale_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sales WHERE original_sale_id = $1",
        )
        .bind(original_sale_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn list(&self, filter: &SaleFilter) -> Result<(Vec<SaleListRow>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        let page = PageParams { page: filter.page, limit: filter.limit };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM sales s WHERE 1=1");
        push_sale_filters(&mut count_qb, filter);
        let total = count_qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT s.*, u.full_name AS cashier_name,
                   (SELECT COUNT(*) FROM sale_items si WHERE si.sale_id = s.id) AS item_count
            FROM sales s
            LEFT JOIN users u ON u.id = s.cashier_id
            WHERE 1=1
            "#,
        );
        push_sale_filters(&mut qb, filter);
        qb.push(" ORDER BY s.sale_date DESC, s.sale_number DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build_query_as::<SaleListRow>().fetch_all(&mut *conn).await?;
        Ok((rows, total))
    }
}
