use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::cache::ViewCache;
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::storage::{LocalObjectStore, ObjectStore};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub store: Arc<dyn ObjectStore>,
    pub catalog: CatalogClient,
    pub views: Arc<ViewCache>,
}

impl AppState {
    /// Wire the filesystem store and catalog client described by `config`
    /// around an already migrated pool.
    pub fn new(db: DbPool, config: Config) -> anyhow::Result<Self> {
        let store = LocalObjectStore::new(config.storage_path(), config.public_url());
        let catalog = CatalogClient::new(&config.catalog)?;
        Ok(Self {
            db,
            config,
            store: Arc::new(store),
            catalog,
            views: Arc::new(ViewCache::new()),
        })
    }
}
