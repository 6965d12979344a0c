// src/services/catalog_service.rs

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{PageParams, Pagination},
        error::AppError,
    },
    db::{CatalogRepository, InventoryRepository},
    models::{
        catalog::{
            build_category_tree, creates_cycle, Category, CategoryDetail, CategoryNode, CategoryWithCount,
            CreateCategoryPayload, CreateProductPayload, ProductFilter, ProductListResponse,
            ProductWithStock, UpdateCategoryPayload, UpdateProductPayload,
        },
        inventory::InventoryTransactionType,
    },
};

/// Estoque mínimo padrão quando o cadastro não informa um.
pub const DEFAULT_MINIMUM_THRESHOLD: i32 = 10;

pub const INITIAL_STOCK_REASON: &str = "Initial stock";

#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository, inventory_repo: InventoryRepository, pool: PgPool) -> Self {
        Self { catalog_repo, inventory_repo, pool }
    }

    // A categoria informada precisa existir e estar ativa
    async fn ensure_category(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        category_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(id) = category_id {
            self.catalog_repo
                .find_active_category(&mut **tx, id)
                .await?
                .ok_or(AppError::CategoryNotFound)?;
        }
        Ok(())
    }

    // ---
    // Produtos
    // ---

    /// Cria produto + saldo + lançamento inicial no livro-razão, tudo ou nada.
    pub async fn create_product(
        &self,
        payload: &CreateProductPayload,
        actor_id: Uuid,
    ) -> Result<ProductWithStock, AppError> {
        let mut tx = self.pool.begin().await?;

        self.ensure_category(&mut tx, payload.category_id).await?;

        let product = self.catalog_repo.create_product(&mut *tx, payload).await?;

        let initial_stock = payload.initial_stock.unwrap_or(0);
        self.inventory_repo
            .create_inventory(
                &mut *tx,
                product.id,
                initial_stock,
                payload.minimum_threshold.unwrap_or(DEFAULT_MINIMUM_THRESHOLD),
                payload.maximum_capacity,
            )
            .await?;

        // Mantém saldo == soma do livro-razão desde o nascimento do produto
        if initial_stock > 0 {
            self.inventory_repo
                .record_transaction(
                    &mut *tx,
                    product.id,
                    InventoryTransactionType::Purchase,
                    initial_stock,
                    Some(INITIAL_STOCK_REASON),
                    None,
                    Some(actor_id),
                )
                .await?;
        }

        let created = self
            .catalog_repo
            .find_product_with_stock(&mut *tx, product.id)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        tx.commit().await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, initial_stock, "Produto cadastrado");
        Ok(created)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductWithStock, AppError> {
        self.catalog_repo
            .find_product_with_stock(&self.pool, product_id)
            .await?
            .ok_or(AppError::ProductNotFound)
    }

    pub async fn get_product_by_barcode(&self, barcode: &str) -> Result<ProductWithStock, AppError> {
        self.catalog_repo
            .find_by_barcode(barcode.trim())
            .await?
            .ok_or(AppError::ProductNotFound)
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<ProductListResponse, AppError> {
        let (products, total) = self.catalog_repo.list_products(filter).await?;
        let params = PageParams { page: filter.page, limit: filter.limit };
        Ok(ProductListResponse { products, pagination: Pagination::new(&params, total) })
    }

    /// Alterações de preço não afetam itens de vendas já gravadas.
    pub async fn update_product(
        &self,
        product_id: Uuid,
        payload: &UpdateProductPayload,
    ) -> Result<ProductWithStock, AppError> {
        if payload.is_empty() {
            return Err(AppError::validation("body", "Nenhum campo para atualizar."));
        }

        let mut tx = self.pool.begin().await?;

        self.ensure_category(&mut tx, payload.category_id).await?;

        self.catalog_repo
            .update_product(&mut *tx, product_id, payload)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        let updated = self
            .catalog_repo
            .find_product_with_stock(&mut *tx, product_id)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), AppError> {
        let deleted = self.catalog_repo.deactivate_product(&self.pool, product_id).await?;
        if !deleted {
            return Err(AppError::ProductNotFound);
        }
        tracing::info!(product_id = %product_id, "Produto desativado");
        Ok(())
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, AppError> {
        self.catalog_repo.list_categories().await
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<CategoryDetail, AppError> {
        let category = self
            .catalog_repo
            .find_category_with_count(category_id)
            .await?
            .ok_or(AppError::CategoryNotFound)?;
        let subcategories = self.catalog_repo.list_subcategories(category_id).await?;
        Ok(CategoryDetail { category, subcategories })
    }

    pub async fn category_hierarchy(&self) -> Result<Vec<CategoryNode>, AppError> {
        let categories = self.catalog_repo.all_active_categories(&self.pool).await?;
        Ok(build_category_tree(categories))
    }

    pub async fn create_category(&self, payload: &CreateCategoryPayload) -> Result<Category, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = payload.parent_id {
            if self.catalog_repo.find_active_category(&mut *tx, parent_id).await?.is_none() {
                return Err(AppError::validation("parent_id", "Categoria pai não encontrada."));
            }
        }

        let category = self
            .catalog_repo
            .create_category(
                &mut *tx,
                payload.name.trim(),
                payload.description.as_deref(),
                payload.parent_id,
            )
            .await?;

        tx.commit().await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        payload: &UpdateCategoryPayload,
    ) -> Result<Category, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lê todas as categorias ativas de uma vez para checar ciclos em memória
        let categories = self.catalog_repo.all_active_categories(&mut *tx).await?;
        let current = categories
            .iter()
            .find(|c| c.id == category_id)
            .ok_or(AppError::CategoryNotFound)?;

        let parent_id = if payload.move_to_root {
            None
        } else {
            match payload.parent_id {
                Some(new_parent) => {
                    if !categories.iter().any(|c| c.id == new_parent) {
                        return Err(AppError::validation("parent_id", "Categoria pai não encontrada."));
                    }
                    let parents: HashMap<Uuid, Option<Uuid>> =
                        categories.iter().map(|c| (c.id, c.parent_id)).collect();
                    if creates_cycle(&parents, category_id, new_parent) {
                        return Err(AppError::validation(
                            "parent_id",
                            "A categoria não pode ficar abaixo dela mesma ou de uma subcategoria sua.",
                        ));
                    }
                    Some(new_parent)
                }
                None => current.parent_id,
            }
        };

        let category = self
            .catalog_repo
            .update_category(
                &mut *tx,
                category_id,
                payload.name.as_deref().map(str::trim),
                payload.description.as_deref(),
                parent_id,
            )
            .await?
            .ok_or(AppError::CategoryNotFound)?;

        tx.commit().await?;
        Ok(category)
    }

    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.catalog_repo
            .find_active_category(&mut *tx, category_id)
            .await?
            .ok_or(AppError::CategoryNotFound)?;

        let (products, children) = self.catalog_repo.count_category_dependents(&mut *tx, category_id).await?;
        if products > 0 {
            return Err(AppError::CategoryInUse(format!(
                "A categoria possui {} produto(s) ativo(s). Mova ou desative-os antes.",
                products
            )));
        }
        if children > 0 {
            return Err(AppError::CategoryInUse(format!(
                "A categoria possui {} subcategoria(s) ativa(s). Mova ou desative-as antes.",
                children
            )));
        }

        self.catalog_repo.deactivate_category(&mut *tx, category_id).await?;
        tx.commit().await?;
        Ok(())
    }
}
