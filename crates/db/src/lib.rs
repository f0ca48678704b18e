//! Postgres persistence for suppliers, invite codes and generation jobs.
//!
//! Repositories are zero-sized structs taking `&PgPool`; the store traits in
//! [`store`] put them behind object-safe seams so the pipeline and HTTP
//! layers can run against [`memory::MemoryStore`] in tests.

use sqlx::postgres::PgPoolOptions;

pub mod cas;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
