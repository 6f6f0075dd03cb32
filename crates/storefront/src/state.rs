//! Application state shared across handlers.
//!
//! Categories and the home page merchandising rows change rarely and are read
//! on every page, so both are held in a short-lived `moka` cache. Schedule
//! windows are still checked per request against the cached rows.

use std::sync::Arc;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use bazaar_core::catalog::Category;
use bazaar_core::layout::{Banner, HomeBlock};

use crate::config::StorefrontConfig;
use crate::db::{CatalogRepository, RepositoryError};

/// Cache key for shared catalog reads.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Home,
}

/// Active banners and home blocks, before schedule filtering.
#[derive(Debug, Clone, Default)]
pub struct HomeContent {
    pub banners: Vec<Banner>,
    pub blocks: Vec<HomeBlock>,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Home(Arc<HomeContent>),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    cache: Cache<CacheKey, CacheValue>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cache,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// All categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the categories cannot be loaded.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(CatalogRepository::new(self.pool()).categories().await?);
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Active banners and home blocks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the merchandising rows cannot be loaded.
    pub async fn home_content(&self) -> Result<Arc<HomeContent>, RepositoryError> {
        if let Some(CacheValue::Home(content)) = self.inner.cache.get(&CacheKey::Home).await {
            debug!("Cache hit for home content");
            return Ok(content);
        }

        let catalog = CatalogRepository::new(self.pool());
        let content = Arc::new(HomeContent {
            banners: catalog.banners().await?,
            blocks: catalog.home_blocks().await?,
        });
        self.inner
            .cache
            .insert(CacheKey::Home, CacheValue::Home(Arc::clone(&content)))
            .await;
        Ok(content)
    }
}
