pub mod connection;
pub mod memory;
pub mod models;
pub mod query_builder;
pub mod record;
pub mod resource;
pub mod store;

use std::sync::Arc;

use crate::config::{Backend, DatabaseConfig};

pub use connection::PgStore;
pub use memory::MemoryStore;
pub use record::{ChangeSet, Record, RecordError};
pub use resource::{Projection, Resource};
pub use store::{DatabaseError, Session, Store};

/// Build the store selected by `DATABASE_BACKEND`
pub fn store_from_config(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
    match config.backend {
        Backend::Postgres => Ok(Arc::new(PgStore::from_config(config)?)),
        Backend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
