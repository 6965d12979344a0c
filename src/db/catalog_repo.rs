// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::{map_unique_violation, PageParams}, error::AppError},
    models::catalog::{
        Category, CategoryWithCount, CreateProductPayload, Product, ProductFilter, ProductWithStock,
        UpdateProductPayload,
    },
};

// Produto ativo + saldo + nome da categoria
const PRODUCT_WITH_STOCK_SELECT: &str = r#"
    SELECT p.*, c.name AS category_name,
           i.current_quantity, i.minimum_threshold, i.maximum_capacity
    FROM products p
    JOIN inventory i ON i.product_id = p.id
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE p.status = 'active'
"#;

fn product_conflict_message(constraint: &str) -> String {
    if constraint.contains("barcode") {
        "Já existe um produto com este código de barras.".to_string()
    } else {
        "Já existe um produto com este SKU.".to_string()
    }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.sku ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.barcode ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(category_id);
    }
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Produtos
    // ---

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        payload: &CreateProductPayload,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products
                (name, description, sku, barcode, category_id, purchase_price, selling_price, gst_rate, unit)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 'piece'))
            RETURNING *
            "#,
        )
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.sku)
        .bind(&payload.barcode)
        .bind(payload.category_id)
        .bind(payload.purchase_price)
        .bind(payload.selling_price)
        .bind(payload.gst_rate)
        .bind(&payload.unit)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, product_conflict_message))
    }

    pub async fn find_product_with_stock<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<Option<ProductWithStock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{PRODUCT_WITH_STOCK_SELECT} AND p.id = $1");
        let product = sqlx::query_as::<_, ProductWithStock>(&sql)
            .bind(product_id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    // Leituras simples usam a pool principal
    pub async fn find_by_barcode(&self, barcode: &str) -> Result<Option<ProductWithStock>, AppError> {
        let sql = format!("{PRODUCT_WITH_STOCK_SELECT} AND p.barcode = $1");
        let product = sqlx::query_as::<_, ProductWithStock>(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<ProductWithStock>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        let page = PageParams { page: filter.page, limit: filter.limit };

        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM products p WHERE p.status = 'active'",
        );
        push_product_filters(&mut count_qb, filter);
        let total = count_qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_WITH_STOCK_SELECT);
        push_product_filters(&mut qb, filter);
        qb.push(" ORDER BY p.name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let products = qb
            .build_query_as::<ProductWithStock>()
            .fetch_all(&mut *conn)
            .await?;

        Ok((products, total))
    }

    /// Atualização parcial; campos ausentes mantêm o valor atual.
    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        payload: &UpdateProductPayload,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                sku = COALESCE($4, sku),
                barcode = COALESCE($5, barcode),
                category_id = COALESCE($6, category_id),
                purchase_price = COALESCE($7, purchase_price),
                selling_price = COALESCE($8, selling_price),
                gst_rate = COALESCE($9, gst_rate),
                unit = COALESCE($10, unit),
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.sku)
        .bind(&payload.barcode)
        .bind(payload.category_id)
        .bind(payload.purchase_price)
        .bind(payload.selling_price)
        .bind(payload.gst_rate)
        .bind(&payload.unit)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, product_conflict_message))
    }

    // Soft delete: o produto continua referenciado pelas vendas antigas
    pub async fn deactivate_product<'e, E>(&self, executor: E, product_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE products SET status = 'inactive', updated_at = NOW() WHERE id = $1 AND status = 'active'",
        )
        .bind(product_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, AppError> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.*, parent.name AS parent_name,
                   (SELECT COUNT(*) FROM products p
                     WHERE p.category_id = c.id AND p.status = 'active') AS product_count
            FROM categories c
            LEFT JOIN categories parent ON parent.id = c.parent_id
            WHERE c.status = 'active'
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn find_category_with_count(&self, category_id: Uuid) -> Result<Option<CategoryWithCount>, AppError> {
        let category = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.*, parent.name AS parent_name,
                   (SELECT COUNT(*) FROM products p
                     WHERE p.category_id = c.id AND p.status = 'active') AS product_count
            FROM categories c
            LEFT JOIN categories parent ON parent.id = c.parent_id
            WHERE c.id = $1 AND c.status = 'active'
            "#,
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn list_subcategories(&self, parent_id: Uuid) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE parent_id = $1 AND status = 'active' ORDER BY name ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn all_active_categories<'e, E>(&self, executor: E) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE status = 'active' ORDER BY name ASC",
        )
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    pub async fn find_active_category<'e, E>(
        &self,
        executor: E,
        category_id: Uuid,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE id = $1 AND status = 'active'",
        )
        .bind(category_id)
        .fetch_optional(executor)
        .await?;
        Ok(category)
    }

    /// Cria uma nova categoria (raiz ou subcategoria).
    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, parent_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(parent_id)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| format!("A categoria '{}' já existe.", name)))
    }

    /// `parent_id` é o valor final do pai (None = raiz).
    pub async fn update_category<'e, E>(
        &self,
        executor: E,
        category_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                parent_id = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(category_id)
        .bind(name)
        .bind(description)
        .bind(parent_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, |_| {
                format!("A categoria '{}' já existe.", name.unwrap_or_default())
            })
        })
    }

    /// (produtos ativos, subcategorias ativas) que dependem da categoria.
    pub async fn count_category_dependents<'e, E>(
        &self,
        executor: E,
        category_id: Uuid,
    ) -> Result<(i64, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counts = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products WHERE category_id = $1 AND status = 'active'),
                (SELECT COUNT(*) FROM categories WHERE parent_id = $1 AND status = 'active')
            "#,
        )
        .bind(category_id)
        .fetch_one(executor)
        .await?;
        Ok(counts)
    }

    pub async fn deactivate_category<'e, E>(&self, executor: E, category_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE categories SET status = 'inactive', updated_at = NOW() WHERE id = $1 AND status = 'active'",
        )
        .bind(category_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
