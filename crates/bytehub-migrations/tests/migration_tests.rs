use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::{MigratorTrait, SchemaManager};

use bytehub_migrations::Migrator;

/// In-memory SQLite exists per connection, so the pool holds exactly one
async fn connect() -> anyhow::Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    Ok(Database::connect(opt).await?)
}

/// Test that migrations can be applied successfully
#[tokio::test]
async fn test_migration_up() -> anyhow::Result<()> {
    let db = connect().await?;

    Migrator::up(&db, None).await?;

    let manager = SchemaManager::new(&db);
    assert!(manager.has_table("namespaces").await?);
    assert!(manager.has_table("features").await?);
    assert!(manager.has_column("features", "partition").await?);

    Ok(())
}

/// Test that migrations can be rolled back successfully
#[tokio::test]
async fn test_migration_down() -> anyhow::Result<()> {
    let db = connect().await?;

    Migrator::up(&db, None).await?;
    Migrator::down(&db, None).await?;

    let manager = SchemaManager::new(&db);
    assert!(!manager.has_table("namespaces").await?);
    assert!(!manager.has_table("features").await?);

    Ok(())
}

/// Applying migrations twice is a no-op the second time
#[tokio::test]
async fn test_migration_idempotent() -> anyhow::Result<()> {
    let db = connect().await?;

    Migrator::up(&db, None).await?;
    Migrator::up(&db, None).await?;

    let pending = Migrator::get_pending_migrations(&db).await?;
    assert!(pending.is_empty());

    Ok(())
}
