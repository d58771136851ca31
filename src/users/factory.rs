use std::sync::Arc;

use crate::postgres::PostgresPool;

use super::{InMemoryUserDirectory, PostgresUserDirectory, UserDirectory};

/// Postgres-backed directory when a pool is available, otherwise an empty
/// in-memory one.
pub fn create_user_directory(pool: Option<PostgresPool>) -> Arc<dyn UserDirectory> {
    match pool {
        Some(pool) => {
            tracing::info!(url = %pool.masked_url(), "Using PostgreSQL user directory");
            Arc::new(PostgresUserDirectory::new(pool))
        }
        None => {
            tracing::warn!("No database configured, using in-memory user directory");
            Arc::new(InMemoryUserDirectory::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_pool_uses_memory() {
        assert_eq!(create_user_directory(None).backend_name(), "memory");
    }
}
