//! Database connection management

use bytehub_core::{StoreConfig, StoreError, StoreResult};
use bytehub_migrations::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tracing::{debug, info};

pub type DbConnection = DatabaseConnection;

/// Pool options for a catalog database.
///
/// In-memory SQLite databases exist per connection, so their pool is pinned
/// to a single connection that is never recycled.
pub fn connect_options(config: &StoreConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(config.database_url.clone());
    if config.database_url.contains(":memory:") {
        opt.max_connections(1)
            .min_connections(1)
            .idle_timeout(std::time::Duration::from_secs(u32::MAX as u64))
            .max_lifetime(std::time::Duration::from_secs(u32::MAX as u64));
    } else {
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections);
    }
    opt.sqlx_logging(false);
    opt
}

/// Connect to the catalog database and bring its schema up to date
pub async fn establish_connection(config: &StoreConfig) -> StoreResult<Arc<DbConnection>> {
    debug!("Connecting to catalog database {}", config.database_url);

    let db = Database::connect(connect_options(config))
        .await
        .map_err(|e| StoreError::Database {
            reason: e.to_string(),
        })?;

    // Run migrations
    Migrator::up(&db, None)
        .await
        .map_err(|e| StoreError::Database {
            reason: e.to_string(),
        })?;

    info!("Catalog database ready");
    Ok(Arc::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ConnectionTrait;

    #[tokio::test]
    async fn test_establish_connection_with_migrations() -> anyhow::Result<()> {
        let db = establish_connection(&StoreConfig::new("sqlite::memory:")).await?;

        let result = sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Sqlite,
            "SELECT COUNT(*) FROM namespaces".to_owned(),
        );
        let query_result = db.query_one(result).await?;
        assert!(query_result.is_some());

        Ok(())
    }

    #[test]
    fn test_connect_options_for_file_database() {
        let mut config = StoreConfig::new("sqlite://bytehub.db?mode=rwc");
        config.max_connections = 7;
        let opt = connect_options(&config);
        assert_eq!(opt.get_max_connections(), Some(7));

        let opt = connect_options(&StoreConfig::new("sqlite::memory:"));
        assert_eq!(opt.get_max_connections(), Some(1));
    }
}
