use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{conflicting, FilmsRepository};
use crate::error::StoreError;
use crate::models::{Film, FilmDocument, SeatKey, Showing, ShowingRef};

/// Хранилище в памяти процесса. Каждый сеанс держит свой мьютекс,
/// так что проверка и запись занятых мест идут строго по очереди
/// в пределах сеанса и не мешают другим сеансам.
#[derive(Default)]
pub struct MemoryFilmsRepository {
    films: RwLock<Vec<FilmEntry>>,
}

struct FilmEntry {
    film: Film,
    schedule: Vec<ShowingSlot>,
}

struct ShowingSlot {
    // taken тут всегда пустой, настоящее множество лежит под мьютексом
    showing: Showing,
    taken: Arc<Mutex<BTreeSet<SeatKey>>>,
}

impl ShowingSlot {
    async fn snapshot(&self) -> Showing {
        Showing { taken: self.taken.lock().await.clone(), ..self.showing.clone() }
    }
}

impl MemoryFilmsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn taken_set(&self, showing: &ShowingRef) -> Result<Arc<Mutex<BTreeSet<SeatKey>>>, StoreError> {
        let films = self.films.read().await;
        let entry = films
            .iter()
            .find(|e| e.film.id == showing.film)
            .ok_or_else(|| StoreError::FilmNotFound(showing.film.clone()))?;
        entry
            .schedule
            .iter()
            .find(|s| s.showing.daytime == showing.daytime)
            .map(|s| s.taken.clone())
            .ok_or_else(|| StoreError::ShowingNotFound(showing.clone()))
    }
}

#[async_trait]
impl FilmsRepository for MemoryFilmsRepository {
    async fn find_all(&self) -> Result<Vec<Film>, StoreError> {
        Ok(self.films.read().await.iter().map(|e| e.film.clone()).collect())
    }

    async fn find_schedule(&self, film_id: &str) -> Result<Option<Vec<Showing>>, StoreError> {
        let films = self.films.read().await;
        let Some(entry) = films.iter().find(|e| e.film.id == film_id) else {
            return Ok(None);
        };
        let mut showings = Vec::with_capacity(entry.schedule.len());
        for slot in &entry.schedule {
            showings.push(slot.snapshot().await);
        }
        Ok(Some(showings))
    }

    async fn create(&self, document: FilmDocument) -> Result<bool, StoreError> {
        let mut films = self.films.write().await;
        if films.iter().any(|e| e.film.id == document.film.id) {
            return Ok(false);
        }
        let schedule = document
            .schedule
            .into_iter()
            .map(|mut showing| {
                let taken = std::mem::take(&mut showing.taken);
                ShowingSlot { showing, taken: Arc::new(Mutex::new(taken)) }
            })
            .collect();
        films.push(FilmEntry { film: document.film, schedule });
        Ok(true)
    }

    async fn resolve_showing(&self, showing: &ShowingRef) -> Result<Showing, StoreError> {
        let films = self.films.read().await;
        let entry = films
            .iter()
            .find(|e| e.film.id == showing.film)
            .ok_or_else(|| StoreError::FilmNotFound(showing.film.clone()))?;
        let slot = entry
            .schedule
            .iter()
            .find(|s| s.showing.daytime == showing.daytime)
            .ok_or_else(|| StoreError::ShowingNotFound(showing.clone()))?;
        Ok(slot.snapshot().await)
    }

    async fn reserve(&self, showing: &ShowingRef, seats: &BTreeSet<SeatKey>) -> Result<(), StoreError> {
        let taken = self.taken_set(showing).await?;
        let mut taken = taken.lock().await;

        let conflicts = conflicting(&taken, seats);
        if !conflicts.is_empty() {
            return Err(StoreError::SeatConflict(conflicts));
        }
        taken.extend(seats.iter().cloned());
        Ok(())
    }

    async fn release(&self, showing: &ShowingRef, seats: &BTreeSet<SeatKey>) -> Result<(), StoreError> {
        let taken = self.taken_set(showing).await?;
        let mut taken = taken.lock().await;
        for seat in seats {
            taken.remove(seat);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAYTIME: &str = "2025-11-16T19:00:00Z";

    fn document() -> FilmDocument {
        FilmDocument {
            film: Film {
                id: "film-1".into(),
                title: "Архитекторы общения".into(),
                description: String::new(),
                about: String::new(),
                tags: vec!["Документальный".into()],
                image: String::new(),
                cover: String::new(),
                rating: 2.9,
                director: "Итан Райт".into(),
            },
            schedule: vec![Showing {
                id: "session-1".into(),
                daytime: DAYTIME.into(),
                hall: 1,
                rows: 5,
                seats: 10,
                price: 350.0,
                taken: BTreeSet::from([SeatKey::encode(1, 1)]),
            }],
        }
    }

    fn keys(pairs: &[(u32, u32)]) -> BTreeSet<SeatKey> {
        pairs.iter().map(|&(r, s)| SeatKey::encode(r, s)).collect()
    }

    #[tokio::test]
    async fn create_is_idempotent_and_keeps_seeded_seats() {
        let repo = MemoryFilmsRepository::new();
        assert!(repo.create(document()).await.unwrap());
        assert!(!repo.create(document()).await.unwrap());

        let showing = repo.resolve_showing(&ShowingRef::new("film-1", DAYTIME)).await.unwrap();
        assert_eq!(showing.taken, keys(&[(1, 1)]));
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn conflict_reports_only_taken_keys_and_changes_nothing() {
        let repo = MemoryFilmsRepository::new();
        repo.create(document()).await.unwrap();
        let showing = ShowingRef::new("film-1", DAYTIME);

        let err = repo.reserve(&showing, &keys(&[(1, 1), (2, 2)])).await.unwrap_err();
        assert!(matches!(err, StoreError::SeatConflict(ref k) if *k == vec![SeatKey::encode(1, 1)]));

        let after = repo.resolve_showing(&showing).await.unwrap();
        assert_eq!(after.taken, keys(&[(1, 1)]));
    }

    #[tokio::test]
    async fn release_frees_reserved_seats() {
        let repo = MemoryFilmsRepository::new();
        repo.create(document()).await.unwrap();
        let showing = ShowingRef::new("film-1", DAYTIME);

        repo.reserve(&showing, &keys(&[(3, 3)])).await.unwrap();
        repo.release(&showing, &keys(&[(3, 3), (4, 4)])).await.unwrap();

        let after = repo.resolve_showing(&showing).await.unwrap();
        assert_eq!(after.taken, keys(&[(1, 1)]));
    }

    #[tokio::test]
    async fn unknown_film_and_showing_are_distinguished() {
        let repo = MemoryFilmsRepository::new();
        repo.create(document()).await.unwrap();

        let err = repo.reserve(&ShowingRef::new("nope", DAYTIME), &keys(&[(1, 2)])).await.unwrap_err();
        assert!(matches!(err, StoreError::FilmNotFound(_)));

        let err = repo
            .reserve(&ShowingRef::new("film-1", "2030-01-01T00:00:00Z"), &keys(&[(1, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ShowingNotFound(_)));
        assert_eq!(repo.find_schedule("nope").await.unwrap(), None);
    }
}
