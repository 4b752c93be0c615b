// Резерв - один условный UPDATE, Postgres перепроверяет условие под блокировкой строки

use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::FilmsRepository;
use crate::database::Database;
use crate::error::StoreError;
use crate::models::{Film, FilmDocument, SeatKey, Showing, ShowingRef};

/// Сколько раз повторять резерв, если конфликт исчез между `UPDATE` и диагностикой.
const MAX_RESERVE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct PgFilmsRepository {
    db: Database,
}

#[derive(sqlx::FromRow)]
struct FilmRow {
    id: String,
    title: String,
    description: String,
    about: String,
    tags: Vec<String>,
    image: String,
    cover: String,
    rating: f64,
    director: String,
}

impl From<FilmRow> for Film {
    fn from(row: FilmRow) -> Self {
        Film {
            id: row.id,
            title: row.title,
            description: row.description,
            about: row.about,
            tags: row.tags,
            image: row.image,
            cover: row.cover,
            rating: row.rating,
            director: row.director,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShowingRow {
    id: String,
    daytime: String,
    hall: i32,
    rows: i32,
    seats: i32,
    price: f64,
    taken: Vec<String>,
}

impl TryFrom<ShowingRow> for Showing {
    type Error = StoreError;

    fn try_from(row: ShowingRow) -> Result<Self, Self::Error> {
        let positive = |value: i32, name: &str| {
            u32::try_from(value).map_err(|_| StoreError::Corrupted(format!("schedule {}: negative {}", row.id, name)))
        };
        Ok(Showing {
            hall: positive(row.hall, "hall")?,
            rows: positive(row.rows, "rows")?,
            seats: positive(row.seats, "seats")?,
            price: row.price,
            taken: row.taken.into_iter().map(SeatKey::from_stored).collect(),
            daytime: row.daytime.clone(),
            id: row.id.clone(),
        })
    }
}

impl PgFilmsRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn film_exists(&self, film_id: &str) -> Result<bool, StoreError> {
        Ok(sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM films WHERE id = $1)")
            .bind(film_id)
            .fetch_one(&self.db.pool)
            .await?)
    }

    /// Сеанс не найден: уточняем, чего именно нет - фильма или сеанса.
    async fn not_found(&self, showing: &ShowingRef) -> StoreError {
        match self.film_exists(&showing.film).await {
            Ok(true) => StoreError::ShowingNotFound(showing.clone()),
            Ok(false) => StoreError::FilmNotFound(showing.film.clone()),
            Err(e) => e,
        }
    }
}

fn to_array(seats: &BTreeSet<SeatKey>) -> Vec<String> {
    seats.iter().map(|k| k.as_str().to_owned()).collect()
}

#[async_trait]
impl FilmsRepository for PgFilmsRepository {
    async fn find_all(&self) -> Result<Vec<Film>, StoreError> {
        let rows = sqlx::query_as::<_, FilmRow>(
            "SELECT id, title, description, about, tags, image, cover, rating, director
             FROM films
             ORDER BY position",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows.into_iter().map(Film::from).collect())
    }

    async fn find_schedule(&self, film_id: &str) -> Result<Option<Vec<Showing>>, StoreError> {
        if !self.film_exists(film_id).await? {
            return Ok(None);
        }
        let rows = sqlx::query_as::<_, ShowingRow>(
            "SELECT id, daytime, hall, rows, seats, price, taken
             FROM schedules
             WHERE film_id = $1
             ORDER BY position",
        )
        .bind(film_id)
        .fetch_all(&self.db.pool)
        .await?;
        let showings = rows.into_iter().map(Showing::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok(Some(showings))
    }

    async fn create(&self, document: FilmDocument) -> Result<bool, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let film = &document.film;

        let inserted = sqlx::query_scalar::<_, String>(
            "INSERT INTO films (id, title, description, about, tags, image, cover, rating, director)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO NOTHING
             RETURNING id",
        )
        .bind(&film.id)
        .bind(&film.title)
        .bind(&film.description)
        .bind(&film.about)
        .bind(&film.tags)
        .bind(&film.image)
        .bind(&film.cover)
        .bind(film.rating)
        .bind(&film.director)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        for (position, showing) in document.schedule.iter().enumerate() {
            sqlx::query(
                "INSERT INTO schedules (id, film_id, position, daytime, hall, rows, seats, price, taken)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(&showing.id)
            .bind(&film.id)
            .bind(position as i32)
            .bind(&showing.daytime)
            .bind(showing.hall as i32)
            .bind(showing.rows as i32)
            .bind(showing.seats as i32)
            .bind(showing.price)
            .bind(to_array(&showing.taken))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn resolve_showing(&self, showing: &ShowingRef) -> Result<Showing, StoreError> {
        let row = sqlx::query_as::<_, ShowingRow>(
            "SELECT id, daytime, hall, rows, seats, price, taken
             FROM schedules
             WHERE film_id = $1 AND daytime = $2",
        )
        .bind(&showing.film)
        .bind(&showing.daytime)
        .fetch_optional(&self.db.pool)
        .await?;

        match row {
            Some(row) => Showing::try_from(row),
            None => Err(self.not_found(showing).await),
        }
    }

    async fn reserve(&self, showing: &ShowingRef, seats: &BTreeSet<SeatKey>) -> Result<(), StoreError> {
        let keys = to_array(seats);

        for attempt in 1..=MAX_RESERVE_ATTEMPTS {
            // Добавляем ключи, только если ни один из них ещё не занят
            let updated = sqlx::query_scalar::<_, String>(
                "UPDATE schedules
                 SET taken = taken || $3::text[]
                 WHERE film_id = $1 AND daytime = $2 AND NOT (taken && $3::text[])
                 RETURNING id",
            )
            .bind(&showing.film)
            .bind(&showing.daytime)
            .bind(&keys)
            .fetch_optional(&self.db.pool)
            .await?;

            if updated.is_some() {
                return Ok(());
            }

            let conflicts = sqlx::query_scalar::<_, Vec<String>>(
                "SELECT ARRAY(SELECT k FROM unnest(taken) AS k WHERE k = ANY($3::text[]) ORDER BY k)
                 FROM schedules
                 WHERE film_id = $1 AND daytime = $2",
            )
            .bind(&showing.film)
            .bind(&showing.daytime)
            .bind(&keys)
            .fetch_optional(&self.db.pool)
            .await?;

            match conflicts {
                None => return Err(self.not_found(showing).await),
                Some(conflicts) if !conflicts.is_empty() => {
                    let mut conflicts: Vec<SeatKey> = conflicts.into_iter().map(SeatKey::from_stored).collect();
                    conflicts.sort();
                    conflicts.dedup();
                    return Err(StoreError::SeatConflict(conflicts));
                }
                // Места успели освободить параллельным откатом - пробуем ещё раз
                Some(_) => debug!(%showing, attempt, "Conflict vanished before diagnosis, retrying"),
            }
        }

        warn!(%showing, "Reservation gave up after {} attempts", MAX_RESERVE_ATTEMPTS);
        Err(StoreError::Contention(showing.clone()))
    }

    async fn release(&self, showing: &ShowingRef, seats: &BTreeSet<SeatKey>) -> Result<(), StoreError> {
        let released = sqlx::query_scalar::<_, String>(
            "UPDATE schedules
             SET taken = ARRAY(SELECT k FROM unnest(taken) AS k WHERE NOT (k = ANY($3::text[])))
             WHERE film_id = $1 AND daytime = $2
             RETURNING id",
        )
        .bind(&showing.film)
        .bind(&showing.daytime)
        .bind(to_array(seats))
        .fetch_optional(&self.db.pool)
        .await?;

        match released {
            Some(_) => Ok(()),
            None => Err(self.not_found(showing).await),
        }
    }
}
