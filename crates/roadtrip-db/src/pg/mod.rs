//! PostgreSQL store implementation

mod resource;
mod subscription;
mod transaction;
mod user;

pub use transaction::PgTransaction;

use async_trait::async_trait;

use crate::error::DbResult;
use crate::store::{Store, Transaction};
use crate::DbPool;

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    /// Create a store from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction::new(tx)))
    }
}
