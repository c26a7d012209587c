use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;

pub mod models;
pub mod schema;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'a> = PooledConnection<'a, AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Error)]
pub enum DbSetupError {
    /// Transient: the pool could not establish a connection (endpoint down, auth failure
    /// resolved by operator, etc). Retried by the caller at process start.
    #[error("failed to connect to the event store: {0}")]
    Connection(String),
    /// Fatal: pending migrations failed to apply; the schema is in an unknown state.
    #[error("failed to run pending migrations: {0}")]
    Migration(String),
}

/// Builds the connection pool and applies any pending migrations.
///
/// Migrations run on a blocking synchronous connection, per `diesel_migrations`, even though
/// the pool itself serves async connections; this only happens once at start-up.
pub async fn setup_db_pool(database_url: &str) -> Result<DbPool, DbSetupError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder()
        .build(config)
        .await
        .map_err(|e| DbSetupError::Connection(e.to_string()))?;

    run_pending_migrations(database_url)?;

    Ok(pool)
}

fn run_pending_migrations(database_url: &str) -> Result<(), DbSetupError> {
    use diesel::Connection;

    let mut conn = diesel::pg::PgConnection::establish(database_url)
        .map_err(|e| DbSetupError::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DbSetupError::Migration(e.to_string()))?;
    Ok(())
}
