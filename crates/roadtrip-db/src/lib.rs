//! Roadtrip DB - Storage abstractions
//!
//! Unit-of-work storage layer for the subscription engine. Every engine
//! operation opens one [`Transaction`] from a [`Store`], performs its reads and
//! writes through it, and commits. Dropping a transaction without committing
//! discards all of its writes.
//!
//! Two implementations are provided:
//! - [`PgStore`]: PostgreSQL via SQLx
//! - [`InMemoryStore`]: serialized in-process store used by tests
//!
//! # Example
//!
//! ```rust,ignore
//! use roadtrip_db::{create_pool, PgStore, Store};
//!
//! let pool = create_pool("postgres://localhost/roadtrip").await?;
//! let store = PgStore::new(pool);
//!
//! let mut tx = store.begin().await?;
//! let user = tx.find_user_by_email("user@example.com").await?;
//! tx.commit().await?;
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::{FailPoint, InMemoryStore};
pub use pg::PgStore;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use store::*;
