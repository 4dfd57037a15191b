pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::booking::BookingEngine;
use services::dispatch::DispatchEngine;
use services::notify::ConnectionRegistry;
use services::payment::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub notifier: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn bookings(&self) -> BookingEngine<'_> {
        BookingEngine::new(&self.db, self.gateway.as_deref(), self.config.booking_policy())
    }

    pub fn dispatch(&self) -> DispatchEngine<'_> {
        DispatchEngine::new(&self.db, self.notifier.as_ref())
    }
}
