pub mod auth;
pub mod catalog_service;
pub mod dashboard_service;
pub mod inventory_service;
pub mod pricing;
pub mod sales_service;
