use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::PostgresConfig;

/// Schema migrations compiled into the binary
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Type alias for PostgreSQL connection pool
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Type alias for pooled connection
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Shared handle to the price database pool
#[derive(Clone)]
pub struct DatabasePool {
    pool: Arc<PgPool>,
}

impl DatabasePool {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Check out a connection, waiting up to the pool's connection timeout
    pub fn get_conn(&self) -> Result<PgPooledConnection, DatabaseError> {
        self.pool
            .get()
            .map_err(|e| DatabaseError::ConnectionPoolError(e.to_string()))
    }

    /// Apply pending embedded migrations, returning how many ran
    pub fn run_migrations(&self) -> Result<usize, DatabaseError> {
        let mut pooled = self.get_conn()?;
        let conn: &mut PgConnection = &mut pooled;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

        Ok(applied.len())
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    ConnectionPoolError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Invalid event time {value} for {stock_name}")]
    InvalidTimestamp { stock_name: String, value: f64 },

    #[error("Diesel error: {0}")]
    DieselError(#[from] diesel::result::Error),
}

/// Build the connection pool for the price database
///
/// The pool is created without opening a connection, so the service starts
/// even while PostgreSQL is still coming up. Connections are opened on first
/// use; a flush that cannot get one fails like any other storage error.
pub fn establish_connection_pool(config: &PostgresConfig) -> Result<DatabasePool, DatabaseError> {
    tracing::info!(
        "Creating database pool for {}:{}/{} (max size {})",
        config.host,
        config.port,
        config.database,
        config.pool_size
    );

    if config.pool_size == 0 {
        return Err(DatabaseError::ConnectionPoolError(
            "pool size must be at least 1".to_string(),
        ));
    }

    let manager = ConnectionManager::<PgConnection>::new(config.database_url());
    let pool = r2d2::Pool::builder()
        .max_size(config.pool_size)
        .min_idle(Some(0))
        .connection_timeout(Duration::from_secs(10))
        .build_unchecked(manager);

    Ok(DatabasePool::new(pool))
}
