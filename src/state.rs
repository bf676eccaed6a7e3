// src/state.rs

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::catalog::CatalogResponse;
use crate::config::AppConfig;
use crate::email_service::Mailer;
use crate::visits::VisitCounter;

const CATALOG_CACHE_TTL: Duration = Duration::from_secs(60);

pub type CatalogCache = Cache<(), Arc<CatalogResponse>>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub catalog_cache: CatalogCache,
    /// `None`, gdy SMTP nie jest skonfigurowane.
    pub mailer: Option<Arc<dyn Mailer>>,
    pub visits: VisitCounter,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: AppConfig, mailer: Option<Arc<dyn Mailer>>) -> Self {
        let visits = VisitCounter::new(config.visits_file.clone());
        AppState {
            db_pool,
            config: Arc::new(config),
            catalog_cache: build_catalog_cache(),
            mailer,
            visits,
        }
    }

    /// Wywoływane po każdym zapisie w panelu administratora.
    pub async fn invalidate_catalog(&self) {
        self.catalog_cache.invalidate(&()).await;
        tracing::debug!("Unieważniono cache katalogu");
    }
}

pub fn build_catalog_cache() -> CatalogCache {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(CATALOG_CACHE_TTL)
        .build()
}
