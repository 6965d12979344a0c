pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod sales_repo;
pub use sales_repo::SalesRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
