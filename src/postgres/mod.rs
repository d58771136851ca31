//! PostgreSQL access for the user directory.

mod pool;

pub use pool::{mask_database_url, PostgresPool, PostgresPoolError};
