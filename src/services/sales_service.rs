// src/services/sales_service.rs
//
// Motor de vendas. Toda operação de escrita roda em uma única transação:
// qualquer erro desfaz venda, itens, pagamentos, saldo e livro-razão juntos.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::{PageParams, Pagination},
        error::AppError,
    },
    db::{InventoryRepository, SalesRepository, SettingsRepository},
    models::{
        catalog::RecordStatus,
        inventory::InventoryTransactionType,
        sales::{
            CancelSalePayload, CreateSalePayload, NewSale, Receipt, RefundPayload, RefundResponse,
            RefundedItem, Sale, SaleDetails, SaleFilter, SaleListResponse, SaleStatus,
        },
    },
    services::pricing::{
        compute_totals, format_sale_number, price_line, reconcile_payments, refund_line_amount,
        refund_sale_number, PlannedPayment, PricedLine,
    },
};

#[derive(Clone)]
pub struct SalesService {
    sales_repo: SalesRepository,
    inventory_repo: InventoryRepository,
    settings_repo: SettingsRepository,
    pool: PgPool,
}

// Soma as quantidades por produto. BTreeMap mantém a ordem do product_id,
// a mesma usada nos locks.
fn quantities_by_product<I>(lines: I) -> BTreeMap<Uuid, i64>
where
    I: IntoIterator<Item = (Uuid, i32)>,
{
    let mut totals = BTreeMap::new();
    for (product_id, quantity) in lines {
        *totals.entry(product_id).or_insert(0i64) += i64::from(quantity);
    }
    totals
}

impl SalesService {
    pub fn new(
        sales_repo: SalesRepository,
        inventory_repo: InventoryRepository,
        settings_repo: SettingsRepository,
        pool: PgPool,
    ) -> Self {
        Self { sales_repo, inventory_repo, settings_repo, pool }
    }

    // Devolve ao estoque as quantidades informadas e registra o livro-razão.
    // Os locks são tomados na ordem do product_id.
    async fn restock(
        &self,
        conn: &mut PgConnection,
        lines: &[(Uuid, i32, String)],
        transaction_type: InventoryTransactionType,
        reference_id: Uuid,
        actor_id: Uuid,
    ) -> Result<(), AppError> {
        let totals = quantities_by_product(lines.iter().map(|(id, qty, _)| (*id, *qty)));
        let product_ids: Vec<Uuid> = totals.keys().copied().collect();
        self.inventory_repo.lock_stock(&mut *conn, &product_ids).await?;

        for (product_id, quantity) in &totals {
            let delta = i32::try_from(*quantity)
                .map_err(|_| anyhow::anyhow!("Quantidade fora do limite para {}", product_id))?;
            self.inventory_repo
                .apply_quantity_change(&mut *conn, *product_id, delta)
                .await?
                .ok_or(AppError::InventoryNotFound)?;
        }

        for (product_id, quantity, reason) in lines {
            self.inventory_repo
                .record_transaction(
                    &mut *conn,
                    *product_id,
                    transaction_type,
                    *quantity,
                    Some(reason.as_str()),
                    Some(reference_id),
                    Some(actor_id),
                )
                .await?;
        }
        Ok(())
    }

    async fn load_details(&self, conn: &mut PgConnection, sale: Sale) -> Result<SaleDetails, AppError> {
        let items = self.sales_repo.find_items(&mut *conn, sale.id).await?;
        let payments = self.sales_repo.find_payments(&mut *conn, sale.id).await?;
        Ok(SaleDetails { sale, items, payments })
    }

    // ---
    // Criação
    // ---

    pub async fn create_sale(
        &self,
        payload: &CreateSalePayload,
        cashier_id: Uuid,
    ) -> Result<SaleDetails, AppError> {
        payload.validate()?;
        payload.validate_business_rules()?;

        let requested = quantities_by_product(payload.items.iter().map(|i| (i.product_id, i.quantity)));
        let product_ids: Vec<Uuid> = requested.keys().copied().collect();

        let mut tx = self.pool.begin().await?;

        // 1. Trava o estoque de todos os produtos do carrinho
        let snapshots: HashMap<Uuid, _> = self
            .inventory_repo
            .lock_stock(&mut *tx, &product_ids)
            .await?
            .into_iter()
            .map(|s| (s.product_id, s))
            .collect();

        for (product_id, required) in &requested {
            let snapshot = snapshots
                .get(product_id)
                .filter(|s| s.status == RecordStatus::Active)
                .ok_or_else(|| AppError::StockError(format!("Produto não encontrado: {}", product_id)))?;

            if *required > i64::from(snapshot.current_quantity) {
                return Err(AppError::StockError(format!(
                    "Estoque insuficiente para {}. Disponível: {}, Necessário: {}",
                    snapshot.name, snapshot.current_quantity, required
                )));
            }
        }

        // 2. Precificação (snapshot de preço e GST em cada linha)
        let lines: Vec<PricedLine> = payload
            .items
            .iter()
            .map(|item| {
                let snapshot = &snapshots[&item.product_id];
                price_line(
                    item.product_id,
                    item.unit_price.unwrap_or(snapshot.selling_price),
                    item.quantity,
                    item.discount_percentage.unwrap_or(Decimal::ZERO),
                    snapshot.gst_rate,
                )
            })
            .collect();

        // 3. Totais e 4. pagamentos
        let totals = compute_totals(&lines, payload.discount_amount.unwrap_or(Decimal::ZERO))?;
        let payments = reconcile_payments(payload.payment_method, &payload.payment_details, totals.total_amount)?;

        // 5. Numeração do dia (o UPSERT serializa caixas concorrentes)
        let today = self.sales_repo.current_day(&mut *tx).await?;
        let sequence = self.sales_repo.next_daily_sequence(&mut *tx, today).await?;
        let sale_number = format_sale_number(today, sequence);

        // 6. Gravação
        let status = if payload.hold { SaleStatus::Pending } else { SaleStatus::Completed };
        let sale = self
            .sales_repo
            .insert_sale(
                &mut *tx,
                &NewSale {
                    sale_number,
                    original_sale_id: None,
                    subtotal: totals.subtotal,
                    gst_amount: totals.gst_amount,
                    discount_amount: totals.discount_amount,
                    total_amount: totals.total_amount,
                    payment_method: payload.payment_method,
                    status,
                    customer_name: payload.customer_name.clone(),
                    customer_phone: payload.customer_phone.clone(),
                    customer_email: payload.customer_email.clone(),
                    notes: payload.notes.clone(),
                    cashier_id,
                },
            )
            .await?;

        for line in &lines {
            self.sales_repo.insert_sale_item(&mut *tx, sale.id, line).await?;
        }
        for payment in &payments {
            self.sales_repo.insert_payment(&mut *tx, sale.id, payment).await?;
        }

        for (product_id, required) in &requested {
            let delta = i32::try_from(-*required)
                .map_err(|_| anyhow::anyhow!("Quantidade fora do limite para {}", product_id))?;
            // O lock acima garante saldo; o guard do UPDATE é a última barreira
            self.inventory_repo
                .apply_quantity_change(&mut *tx, *product_id, delta)
                .await?
                .ok_or_else(|| AppError::StockError(format!("Estoque insuficiente para o produto {}", product_id)))?;
        }
        for line in &lines {
            self.inventory_repo
                .record_transaction(
                    &mut *tx,
                    line.product_id,
                    InventoryTransactionType::Sale,
                    -line.quantity,
                    None,
                    Some(sale.id),
                    Some(cashier_id),
                )
                .await?;
        }

        let details = self.load_details(&mut tx, sale).await?;
        tx.commit().await?;

        tracing::info!(
            sale_id = %details.sale.id,
            sale_number = %details.sale.sale_number,
            total = %details.sale.total_amount,
            status = details.sale.status.as_str(),
            "Venda registrada"
        );
        Ok(details)
    }

    // ---
    // Estorno
    // ---

    pub async fn refund_sale(
        &self,
        sale_id: Uuid,
        payload: &RefundPayload,
        actor_id: Uuid,
    ) -> Result<RefundResponse, AppError> {
        payload.validate()?;
        payload.validate_business_rules()?;

        let mut tx = self.pool.begin().await?;

        // Lock na venda original serializa estornos concorrentes
        let original = self
            .sales_repo
            .lock_by_id(&mut *tx, sale_id)
            .await?
            .filter(|s| s.status == SaleStatus::Completed)
            .ok_or(AppError::SaleNotRefundable)?;

        let mut refundable: HashMap<Uuid, _> = self
            .sales_repo
            .find_refundable_items(&mut *tx, sale_id)
            .await?
            .into_iter()
            .map(|r| (r.item.id, r))
            .collect();

        let default_reason = format!("Refund for sale {}", original.sale_number);
        let mut refunded_items = Vec::with_capacity(payload.items.len());
        for input in &payload.items {
            let item = refundable.get_mut(&input.sale_item_id).ok_or_else(|| {
                AppError::RefundError(format!("O item {} não pertence a esta venda.", input.sale_item_id))
            })?;

            let amount = refund_line_amount(
                item.item.total_amount,
                item.item.gst_amount,
                item.item.quantity,
                item.refunded_quantity,
                item.refunded_amount,
                item.refunded_gst,
                input.quantity,
            )?;

            // Linhas repetidas do mesmo item enxergam o que já foi pedido antes
            item.refunded_quantity += input.quantity;
            item.refunded_amount += amount.amount;
            item.refunded_gst += amount.gst_amount;

            refunded_items.push(RefundedItem {
                sale_item_id: item.item.id,
                product_id: item.item.product_id,
                product_name: item.product_name.clone(),
                quantity: input.quantity,
                amount: amount.amount,
                gst_amount: amount.gst_amount,
                reason: input.reason.clone(),
            });
        }

        let refund_total: Decimal = refunded_items.iter().map(|i| i.amount).sum();
        let refund_gst: Decimal = refunded_items.iter().map(|i| i.gst_amount).sum();

        let previous_refunds = self.sales_repo.count_refunds(&mut *tx, sale_id).await?;
        let refund = self
            .sales_repo
            .insert_sale(
                &mut *tx,
                &NewSale {
                    sale_number: refund_sale_number(&original.sale_number, previous_refunds),
                    original_sale_id: Some(sale_id),
                    subtotal: -(refund_total - refund_gst),
                    gst_amount: -refund_gst,
                    discount_amount: Decimal::ZERO,
                    total_amount: -refund_total,
                    payment_method: payload.refund_method,
                    status: SaleStatus::Refunded,
                    customer_name: original.customer_name.clone(),
                    customer_phone: original.customer_phone.clone(),
                    customer_email: original.customer_email.clone(),
                    notes: Some(default_reason.clone()),
                    cashier_id: actor_id,
                },
            )
            .await?;

        self.sales_repo
            .insert_payment(
                &mut *tx,
                refund.id,
                &PlannedPayment {
                    method: payload.refund_method,
                    amount: -refund_total,
                    tendered_amount: None,
                    change_amount: Decimal::ZERO,
                    reference_number: None,
                },
            )
            .await?;

        for item in &refunded_items {
            self.sales_repo
                .insert_refund_item(
                    &mut *tx,
                    refund.id,
                    item.sale_item_id,
                    item.quantity,
                    item.amount,
                    item.gst_amount,
                    item.reason.as_deref(),
                )
                .await?;
        }

        let restock_lines: Vec<(Uuid, i32, String)> = refunded_items
            .iter()
            .map(|i| (i.product_id, i.quantity, i.reason.clone().unwrap_or_else(|| default_reason.clone())))
            .collect();
        self.restock(&mut tx, &restock_lines, InventoryTransactionType::Return, sale_id, actor_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            sale_id = %sale_id,
            refund_id = %refund.id,
            refund_number = %refund.sale_number,
            refund_total = %refund_total,
            "Estorno registrado"
        );

        Ok(RefundResponse {
            message: "Estorno processado com sucesso.".to_string(),
            refund,
            refunded_items,
            refund_total,
        })
    }

    // ---
    // Cancelamento e conclusão (vendas em espera)
    // ---

    pub async fn cancel_sale(
        &self,
        sale_id: Uuid,
        payload: &CancelSalePayload,
        actor_id: Uuid,
    ) -> Result<Sale, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        let sale = self
            .sales_repo
            .lock_by_id(&mut *tx, sale_id)
            .await?
            .ok_or(AppError::SaleNotFound)?;

        match sale.status {
            SaleStatus::Pending => {}
            SaleStatus::Cancelled => return Err(AppError::AlreadyCancelled),
            SaleStatus::Completed => return Err(AppError::CannotCancelCompleted),
            SaleStatus::Refunded => return Err(AppError::InvalidSaleStatus(sale.status.as_str().into())),
        }

        let reason = payload.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
        let notes = reason.unwrap_or("Sale cancelled");
        let ledger_reason = match reason {
            Some(r) => format!("Sale cancelled: {}", r),
            None => "Sale cancelled".to_string(),
        };

        let cancelled = self
            .sales_repo
            .transition_status(&mut *tx, sale_id, SaleStatus::Pending, SaleStatus::Cancelled, Some(notes))
            .await?
            .ok_or_else(|| AppError::InvalidSaleStatus(sale.status.as_str().into()))?;

        let restock_lines: Vec<(Uuid, i32, String)> = self
            .sales_repo
            .find_items(&mut *tx, sale_id)
            .await?
            .into_iter()
            .map(|i| (i.item.product_id, i.item.quantity, ledger_reason.clone()))
            .collect();
        self.restock(&mut tx, &restock_lines, InventoryTransactionType::Adjustment, sale_id, actor_id)
            .await?;

        tx.commit().await?;

        tracing::info!(sale_id = %sale_id, sale_number = %cancelled.sale_number, "Venda cancelada");
        Ok(cancelled)
    }

    /// Finaliza uma venda em espera. O estoque já foi baixado na criação.
    pub async fn complete_sale(&self, sale_id: Uuid) -> Result<Sale, AppError> {
        let mut tx = self.pool.begin().await?;

        let sale = self
            .sales_repo
            .lock_by_id(&mut *tx, sale_id)
            .await?
            .ok_or(AppError::SaleNotFound)?;

        if sale.status != SaleStatus::Pending {
            return Err(AppError::InvalidSaleStatus(sale.status.as_str().into()));
        }

        let completed = self
            .sales_repo
            .transition_status(&mut *tx, sale_id, SaleStatus::Pending, SaleStatus::Completed, None)
            .await?
            .ok_or_else(|| AppError::InvalidSaleStatus(sale.status.as_str().into()))?;

        tx.commit().await?;
        tracing::info!(sale_id = %sale_id, sale_number = %completed.sale_number, "Venda em espera concluída");
        Ok(completed)
    }

    // ---
    // Leitura
    // ---

    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleDetails, AppError> {
        let mut conn = self.pool.acquire().await?;
        let sale = self
            .sales_repo
            .find_by_id(&mut *conn, sale_id)
            .await?
            .ok_or(AppError::SaleNotFound)?;
        self.load_details(&mut conn, sale).await
    }

    pub async fn list_sales(&self, filter: &SaleFilter) -> Result<SaleListResponse, AppError> {
        let (sales, total) = self.sales_repo.list(filter).await?;
        let params = PageParams { page: filter.page, limit: filter.limit };
        Ok(SaleListResponse { sales, pagination: Pagination::new(&params, total) })
    }

    /// Modelo de leitura do recibo; a renderização fica fora do serviço.
    pub async fn receipt(&self, sale_id: Uuid) -> Result<Receipt, AppError> {
        let SaleDetails { sale, items, payments } = self.get_sale(sale_id).await?;
        let shop = self.settings_repo.get_shop_settings(&self.pool).await?;
        Ok(Receipt { sale, items, payments, shop, generated_at: Utc::now() })
    }
}
