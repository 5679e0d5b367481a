//! Test utilities for database integration tests
//!
//! Every [`TestDatabase`] is a private in-memory SQLite catalog with the
//! schema already migrated, so tests never share state.

use crate::{connect_options, DbConnection};
use bytehub_core::StoreConfig;
use bytehub_migrations::Migrator;
use sea_orm::{ConnectionTrait, Database, Statement};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

pub const TEST_DATABASE_URL: &str = "sqlite::memory:";

/// Isolated, migrated catalog database
pub struct TestDatabase {
    pub db: Arc<DbConnection>,
    pub database_url: String,
}

impl TestDatabase {
    /// Create a fresh in-memory database and run all migrations
    pub async fn new() -> anyhow::Result<Self> {
        let test_db = Self::without_migrations().await?;

        Migrator::up(&*test_db.db, None)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

        Ok(test_db)
    }

    /// Create a fresh in-memory database with no schema
    pub async fn without_migrations() -> anyhow::Result<Self> {
        let config = StoreConfig::new(TEST_DATABASE_URL);
        let db = Database::connect(connect_options(&config))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create test database: {}", e))?;

        let test_db = TestDatabase {
            db: Arc::new(db),
            database_url: config.database_url,
        };

        test_db
            .test_connection()
            .await
            .map_err(|e| anyhow::anyhow!("Initial connection test failed: {}", e))?;

        Ok(test_db)
    }

    /// Shared handle to the connection
    pub fn connection(&self) -> Arc<DbConnection> {
        Arc::clone(&self.db)
    }

    /// Verify the connection answers a trivial query
    pub async fn test_connection(&self) -> anyhow::Result<()> {
        let stmt = Statement::from_string(self.db.get_database_backend(), "SELECT 1".to_owned());
        self.db.query_one(stmt).await?;
        Ok(())
    }

    /// Remove every catalog row, features first to respect the foreign key
    pub async fn cleanup_all_tables(&self) -> anyhow::Result<()> {
        for table in ["features", "namespaces"] {
            let stmt = Statement::from_string(
                self.db.get_database_backend(),
                format!("DELETE FROM {}", table),
            );
            self.db.execute(stmt).await?;
        }
        Ok(())
    }
}
