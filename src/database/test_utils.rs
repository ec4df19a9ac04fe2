#[cfg(test)]
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

#[cfg(test)]
pub async fn setup_test_db() -> DatabaseConnection {
    // In-memory SQLite; a single connection keeps every query on the same
    // database instance.
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1);

    let db = Database::connect(opt)
        .await
        .expect("Failed to connect to test database");

    // Run migrations
    use sea_orm_migration::MigratorTrait;
    crate::database::migrations::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}
