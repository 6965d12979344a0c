// src/services/inventory_service.rs

use chrono::Utc;
use sqlx::{Acquire, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{PageParams, Pagination},
        error::AppError,
    },
    db::InventoryRepository,
    models::inventory::{
        AdjustInventoryPayload, AdjustmentOutcome, AdjustmentType, BulkAdjustFailure,
        BulkAdjustPayload, BulkAdjustResponse, BulkAdjustSuccess, BulkAdjustSummary, Inventory,
        InventoryAlerts, InventoryFilter, InventoryListResponse, InventoryStats,
        InventoryTransactionType, ReconciliationReport, TransactionFilter, TransactionListResponse,
        UpdateThresholdsPayload,
    },
};

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, pool: PgPool) -> Self {
        Self { inventory_repo, pool }
    }

    // Núcleo do ajuste: trava, calcula, grava saldo e livro-razão.
    // Roda na conexão/transação recebida; quem chama decide o commit.
    async fn apply_adjustment(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        payload: &AdjustInventoryPayload,
        actor_id: Uuid,
    ) -> Result<(AdjustmentOutcome, Inventory), AppError> {
        let adjustment_type: AdjustmentType = payload.adjustment_type.parse()?;

        let current = self
            .inventory_repo
            .lock_inventory(&mut *conn, product_id)
            .await?
            .ok_or(AppError::InventoryNotFound)?;

        let new_quantity = adjustment_type.apply(current.current_quantity, payload.quantity)?;
        let quantity_change = new_quantity - current.current_quantity;

        let inventory = self
            .inventory_repo
            .set_quantity(&mut *conn, product_id, new_quantity)
            .await?;

        // Ajuste sem efeito não gera lançamento
        if quantity_change != 0 {
            self.inventory_repo
                .record_transaction(
                    &mut *conn,
                    product_id,
                    InventoryTransactionType::Adjustment,
                    quantity_change,
                    Some(payload.reason.as_str()),
                    None,
                    Some(actor_id),
                )
                .await?;
        }

        let outcome = AdjustmentOutcome {
            previous_quantity: current.current_quantity,
            new_quantity,
            quantity_change,
            adjustment_type,
            reason: payload.reason.clone(),
        };
        Ok((outcome, inventory))
    }

    pub async fn adjust(
        &self,
        product_id: Uuid,
        payload: &AdjustInventoryPayload,
        actor_id: Uuid,
    ) -> Result<(AdjustmentOutcome, Inventory), AppError> {
        let mut tx = self.pool.begin().await?;
        let result = self.apply_adjustment(&mut tx, product_id, payload, actor_id).await?;
        tx.commit().await?;

        tracing::info!(
            product_id = %product_id,
            previous = result.0.previous_quantity,
            new = result.0.new_quantity,
            kind = result.0.adjustment_type.as_str(),
            "Estoque ajustado"
        );
        Ok(result)
    }

    /// Cada item roda em um savepoint: uma falha desfaz só aquele item.
    /// As linhas do lote são travadas antes, em ordem de product_id.
    pub async fn bulk_adjust(
        &self,
        payload: &BulkAdjustPayload,
        actor_id: Uuid,
    ) -> Result<BulkAdjustResponse, AppError> {
        let mut product_ids: Vec<Uuid> = payload.adjustments.iter().map(|a| a.product_id).collect();
        product_ids.sort();
        product_ids.dedup();

        let mut tx = self.pool.begin().await?;
        self.inventory_repo.lock_stock(&mut *tx, &product_ids).await?;

        let mut results = Vec::new();
        let mut errors = Vec::new();

        for item in &payload.adjustments {
            let mut savepoint = tx.begin().await?;

            match self
                .apply_adjustment(&mut savepoint, item.product_id, &item.adjustment, actor_id)
                .await
            {
                Ok((adjustment, _)) => {
                    savepoint.commit().await?;
                    results.push(BulkAdjustSuccess { product_id: item.product_id, adjustment });
                }
                // Erro de infraestrutura derruba o lote inteiro
                Err(e) if e.status_code().is_server_error() => return Err(e),
                Err(e) => {
                    savepoint.rollback().await?;
                    tracing::warn!(product_id = %item.product_id, code = e.code(), "Ajuste em lote rejeitado");
                    errors.push(BulkAdjustFailure {
                        product_id: item.product_id,
                        error: e.to_string(),
                        code: e.code().to_string(),
                    });
                }
            }
        }

        tx.commit().await?;

        let summary = BulkAdjustSummary {
            total_adjustments: payload.adjustments.len(),
            successful: results.len(),
            failed: errors.len(),
        };
        tracing::info!(successful = summary.successful, failed = summary.failed, "Ajuste em lote concluído");

        Ok(BulkAdjustResponse {
            message: format!("{} de {} ajustes aplicados.", summary.successful, summary.total_adjustments),
            summary,
            results,
            errors,
        })
    }

    pub async fn update_thresholds(
        &self,
        product_id: Uuid,
        payload: &UpdateThresholdsPayload,
    ) -> Result<Inventory, AppError> {
        if payload.minimum_threshold.is_none() && payload.maximum_capacity.is_none() {
            return Err(AppError::validation(
                "body",
                "Informe minimum_threshold e/ou maximum_capacity.",
            ));
        }

        self.inventory_repo
            .update_thresholds(&self.pool, product_id, payload.minimum_threshold, payload.maximum_capacity)
            .await?
            .ok_or(AppError::InventoryNotFound)
    }

    // ---
    // Leitura
    // ---

    pub async fn overview(&self, filter: &InventoryFilter) -> Result<InventoryListResponse, AppError> {
        let (inventory, total) = self.inventory_repo.list_overview(filter).await?;
        let params = PageParams { page: filter.page, limit: filter.limit };
        Ok(InventoryListResponse { inventory, pagination: Pagination::new(&params, total) })
    }

    pub async fn alerts(&self) -> Result<InventoryAlerts, AppError> {
        self.inventory_repo.alerts().await
    }

    pub async fn transactions(&self, filter: &TransactionFilter) -> Result<TransactionListResponse, AppError> {
        let (transactions, total) = self.inventory_repo.list_transactions(filter).await?;
        let params = PageParams { page: filter.page, limit: filter.limit };
        Ok(TransactionListResponse { transactions, pagination: Pagination::new(&params, total) })
    }

    pub async fn stats(&self) -> Result<InventoryStats, AppError> {
        self.inventory_repo.stats().await
    }

    /// Saldo em cache x soma do livro-razão, por produto.
    pub async fn reconcile(&self) -> Result<ReconciliationReport, AppError> {
        let mismatches = self.inventory_repo.ledger_mismatches().await?;
        if !mismatches.is_empty() {
            tracing::error!(count = mismatches.len(), "Saldo divergente do livro-razão");
        }
        Ok(ReconciliationReport {
            consistent: mismatches.is_empty(),
            mismatches,
            checked_at: Utc::now(),
        })
    }
}
