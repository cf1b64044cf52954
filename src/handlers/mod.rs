pub mod activity_logs;
pub mod auth;
pub mod common;
pub mod customers;
pub mod exports;
pub mod health;
pub mod orders;
pub mod products;
pub mod public;
pub mod users;

use crate::{
    auth::{SessionService, SessionSettings},
    config::AppConfig,
    db::DbPool,
    services::{
        activity_log::ActivityLogService, customers::CustomerService, exports::ExportService,
        orders::OrderService, products::ProductService, users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub customers: Arc<CustomerService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub users: Arc<UserService>,
    pub sessions: Arc<SessionService>,
    pub activity_log: Arc<ActivityLogService>,
    pub exports: Arc<ExportService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let customers = CustomerService::new(db_pool.clone());
        let products = ProductService::new(db_pool.clone());
        let orders = OrderService::new(db_pool.clone());
        let exports = ExportService::new(
            customers.clone(),
            products.clone(),
            orders.clone(),
            config.export_max_rows,
            config.company_name.clone(),
        );

        Self {
            customers: Arc::new(customers),
            products: Arc::new(products),
            orders: Arc::new(orders),
            users: Arc::new(UserService::new(db_pool.clone())),
            sessions: Arc::new(SessionService::new(
                db_pool.clone(),
                SessionSettings::from(config),
            )),
            activity_log: Arc::new(ActivityLogService::new(db_pool)),
            exports: Arc::new(exports),
        }
    }
}
