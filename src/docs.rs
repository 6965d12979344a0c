// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::register,
        handlers::auth::get_me,
        handlers::auth::change_password,
        handlers::auth::list_users,
        handlers::auth::update_user_status,

        // --- Catalog ---
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::get_product_by_barcode,
        handlers::catalog::create_product,
        handlers::catalog::update_product,
        handlers::catalog::delete_product,
        handlers::catalog::list_categories,
        handlers::catalog::get_category,
        handlers::catalog::category_hierarchy,
        handlers::catalog::create_category,
        handlers::catalog::update_category,
        handlers::catalog::delete_category,

        // --- Inventory ---
        handlers::inventory::overview,
        handlers::inventory::alerts,
        handlers::inventory::transactions,
        handlers::inventory::stats,
        handlers::inventory::reconciliation,
        handlers::inventory::adjust,
        handlers::inventory::bulk_adjust,
        handlers::inventory::update_thresholds,

        // --- Sales ---
        handlers::sales::create_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,
        handlers::sales::get_receipt,
        handlers::sales::refund_sale,
        handlers::sales::cancel_sale,
        handlers::sales::complete_sale,

        // --- Dashboard ---
        handlers::dashboard::get_sales_stats,
        handlers::dashboard::get_daily_summary,

        // --- Settings ---
        handlers::settings::get_shop_settings,
        handlers::settings::update_shop_settings,
    ),
    components(
        schemas(
            common::db_utils::Pagination,

            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::RegisterResponse,
            models::auth::ChangePasswordPayload,
            models::auth::UpdateUserStatusPayload,
            models::auth::UserListResponse,
            models::auth::UserStatusResponse,

            // --- Catalog ---
            models::catalog::RecordStatus,
            models::catalog::Category,
            models::catalog::CategoryWithCount,
            models::catalog::CategoryDetail,
            models::catalog::CategoryNode,
            models::catalog::CreateCategoryPayload,
            models::catalog::UpdateCategoryPayload,
            models::catalog::Product,
            models::catalog::ProductWithStock,
            models::catalog::CreateProductPayload,
            models::catalog::UpdateProductPayload,
            models::catalog::ProductResponse,
            models::catalog::ProductListResponse,
            models::catalog::CategoryResponse,
            models::catalog::MessageResponse,

            // --- Inventory ---
            models::inventory::Inventory,
            models::inventory::InventoryTransactionType,
            models::inventory::InventoryTransaction,
            models::inventory::InventoryTransactionView,
            models::inventory::AdjustmentType,
            models::inventory::AdjustInventoryPayload,
            models::inventory::BulkAdjustmentItem,
            models::inventory::BulkAdjustPayload,
            models::inventory::AdjustmentOutcome,
            models::inventory::AdjustInventoryResponse,
            models::inventory::BulkAdjustSuccess,
            models::inventory::BulkAdjustFailure,
            models::inventory::BulkAdjustSummary,
            models::inventory::BulkAdjustResponse,
            models::inventory::UpdateThresholdsPayload,
            models::inventory::ThresholdsResponse,
            models::inventory::StockStatus,
            models::inventory::InventoryOverviewRow,
            models::inventory::InventoryListResponse,
            models::inventory::TransactionListResponse,
            models::inventory::StockAlert,
            models::inventory::InventoryAlerts,
            models::inventory::InventoryOverviewStats,
            models::inventory::CategoryStockStats,
            models::inventory::TransactionActivity,
            models::inventory::InventoryStats,
            models::inventory::LedgerMismatch,
            models::inventory::ReconciliationReport,

            // --- Sales ---
            models::sales::SaleStatus,
            models::sales::PaymentMethod,
            models::sales::Sale,
            models::sales::SaleItem,
            models::sales::SaleItemDetail,
            models::sales::PaymentDetail,
            models::sales::RefundItem,
            models::sales::SaleListRow,
            models::sales::SaleItemInput,
            models::sales::PaymentInput,
            models::sales::CreateSalePayload,
            models::sales::RefundItemInput,
            models::sales::RefundPayload,
            models::sales::CancelSalePayload,
            models::sales::SaleDetails,
            models::sales::CreateSaleResponse,
            models::sales::RefundedItem,
            models::sales::RefundResponse,
            models::sales::SaleListResponse,
            models::sales::SaleStatusResponse,
            models::sales::Receipt,
            models::sales::ReceiptResponse,

            // --- Dashboard ---
            models::dashboard::StatsPeriod,
            models::dashboard::SalesOverview,
            models::dashboard::PaymentMethodStat,
            models::dashboard::TopProductEntry,
            models::dashboard::HourlySales,
            models::dashboard::SalesStatsBody,
            models::dashboard::SalesStats,
            models::dashboard::DailySummary,
            models::dashboard::DailySummaryResponse,

            // --- Settings ---
            models::settings::ShopSettings,
            models::settings::UpdateShopSettingsPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Catalog", description = "Produtos e Categorias"),
        (name = "Inventory", description = "Saldos, Ajustes e Livro-razão de Estoque"),
        (name = "Sales", description = "Vendas, Estornos e Recibos"),
        (name = "Dashboard", description = "Indicadores de Vendas"),
        (name = "Settings", description = "Configurações da Loja")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
