// reserve атомарен: добавляются все ключи или ни одного

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, StorageDriver};
use crate::database::Database;
use crate::error::StoreError;
use crate::models::{Film, FilmDocument, SeatKey, Showing, ShowingRef};
use crate::redis_client::RedisClient;

pub mod memory;
pub mod postgres;
pub mod redis_store;

pub use memory::MemoryFilmsRepository;
pub use postgres::PgFilmsRepository;
pub use redis_store::RedisFilmsRepository;

#[async_trait]
pub trait FilmsRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Film>, StoreError>;

    /// `None`, если фильма нет.
    async fn find_schedule(&self, film_id: &str) -> Result<Option<Vec<Showing>>, StoreError>;

    /// Добавляет фильм с расписанием. Возвращает `false`, если фильм уже есть.
    async fn create(&self, document: FilmDocument) -> Result<bool, StoreError>;

    async fn resolve_showing(&self, showing: &ShowingRef) -> Result<Showing, StoreError>;

    /// Занимает все места разом или возвращает `SeatConflict` ровно с уже занятыми ключами.
    async fn reserve(&self, showing: &ShowingRef, seats: &BTreeSet<SeatKey>) -> Result<(), StoreError>;

    /// Освобождает места, отсутствующие ключи игнорируются.
    async fn release(&self, showing: &ShowingRef, seats: &BTreeSet<SeatKey>) -> Result<(), StoreError>;
}

/// Поднимает хранилище, выбранное через `DATABASE_DRIVER`.
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn FilmsRepository>> {
    use anyhow::Context;

    let repository: Arc<dyn FilmsRepository> = match config.database.driver {
        StorageDriver::Memory => {
            info!("Using in-memory storage");
            Arc::new(MemoryFilmsRepository::new())
        }
        StorageDriver::Postgres => {
            let url = config.database.url.as_deref().context("DATABASE_URL must be set for postgres driver")?;
            let db = Database::new(url, config.database.pool_size)
                .await
                .context("Failed to connect to database")?;
            info!("Database connected");
            db.run_migrations().await.context("Failed to run migrations")?;
            Arc::new(PgFilmsRepository::new(db))
        }
        StorageDriver::Redis => {
            let url = config.redis.url.as_deref().context("REDIS_URL must be set for redis driver")?;
            let redis = RedisClient::new(url).await.context("Failed to connect to Redis")?;
            redis.ping().await.context("Redis did not answer PING")?;
            info!("Redis connected");
            Arc::new(RedisFilmsRepository::new(redis))
        }
    };

    Ok(repository)
}

/// Ключи из `seats`, которые уже есть в `taken`.
pub(crate) fn conflicting(taken: &BTreeSet<SeatKey>, seats: &BTreeSet<SeatKey>) -> Vec<SeatKey> {
    seats.intersection(taken).cloned().collect()
}
