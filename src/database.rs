use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

/// Пул соединений с Postgres для реляционного варианта хранилища.
#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        info!(pool_size, "Postgres pool ready");

        Ok(Database { pool })
    }

    /// Схема каталога: `films` и `schedules` (см. `src/migrations`).
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running catalog migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Catalog schema is up to date");
        Ok(())
    }
}
