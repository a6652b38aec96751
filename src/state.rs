use std::sync::Arc;

use crate::{
    clients::{Mailer, PaymentGateway, ResendClient, StripeClient},
    config::AppConfig,
    db::{DbPool, OrmConn},
    storage::ImageStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub storage: ImageStorage,
}

impl AppState {
    /// Wires the production HTTP clients from configuration.
    pub fn new(pool: DbPool, orm: OrmConn, config: AppConfig) -> Self {
        let payments = StripeClient::new(&config.stripe_api_base, config.stripe_secret_key.clone());
        let mailer = ResendClient::new(&config.resend_api_base, config.resend_api_key.clone());
        let storage = ImageStorage::new(&config.storage_dir, &config.storage_public_url);

        Self {
            pool,
            orm,
            config: Arc::new(config),
            payments: Arc::new(payments),
            mailer: Arc::new(mailer),
            storage,
        }
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}
