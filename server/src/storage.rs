mod sqlite;

pub use sqlite::SqliteStore;

use crate::config::Config;
use joblib::{JobStore, MemoryStore, Timed};
use std::sync::Arc;
use tracing::info;

/// Open the store selected by `config`, bounded by the configured deadline.
pub async fn open(config: &Config) -> Result<Arc<dyn JobStore>, sqlx::Error> {
    let limit = config.store_timeout();
    match &config.database_url {
        Some(url) => {
            let store = SqliteStore::open(url).await?;
            info!(%url, "job records persisted to sqlite");
            Ok(Arc::new(Timed::new(store, limit)))
        }
        None => {
            info!("no database configured, job records are kept in memory");
            Ok(Arc::new(Timed::new(MemoryStore::new(), limit)))
        }
    }
}
