#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use afisha::error::StoreError;
use afisha::models::{Film, FilmDocument, SeatKey, Showing, ShowingRef, TicketRequest};
use afisha::repository::FilmsRepository;
use serde_json::Value;
use uuid::Uuid;

pub const EVENING: &str = "2025-11-16T19:00:00+03:00";
pub const NIGHT: &str = "2025-11-16T22:00:00+03:00";

/// Фильм с двумя сеансами в зале 4x10. Идентификаторы уникальны,
/// так что наборы можно гонять по одной и той же базе повторно.
pub fn film_document() -> FilmDocument {
    let film_id = format!("film-{}", Uuid::new_v4());
    let showing = |daytime: &str, taken: &[(u32, u32)]| Showing {
        id: Uuid::new_v4().to_string(),
        daytime: daytime.to_string(),
        hall: 1,
        rows: 4,
        seats: 10,
        price: 350.0,
        taken: keys(taken),
    };

    FilmDocument {
        film: Film {
            id: film_id,
            title: "Сон в летний день".to_string(),
            description: "Фэнтези".to_string(),
            about: String::new(),
            tags: vec!["Рекомендуемые".to_string()],
            image: "/bg6s.jpg".to_string(),
            cover: "/bg6c.jpg".to_string(),
            rating: 8.1,
            director: "Амелия Хьюз".to_string(),
        },
        schedule: vec![showing(EVENING, &[(1, 1)]), showing(NIGHT, &[])],
    }
}

pub fn keys(pairs: &[(u32, u32)]) -> BTreeSet<SeatKey> {
    pairs.iter().map(|&(row, seat)| SeatKey::encode(row, seat)).collect()
}

pub fn ticket(film: &str, daytime: &str, row: i64, seat: i64) -> TicketRequest {
    TicketRequest {
        film: Some(film.to_string()),
        session: Some(format!("session-{}", daytime)),
        daytime: Some(daytime.to_string()),
        row: Some(Value::from(row)),
        seat: Some(Value::from(seat)),
        price: Some(Value::from(350.0_f64)),
    }
}

pub async fn taken(repo: &dyn FilmsRepository, showing: &ShowingRef) -> BTreeSet<SeatKey> {
    repo.resolve_showing(showing).await.unwrap().taken
}

/// Общий контракт хранилища, прогоняется на каждом бэкенде.
pub async fn store_contract(repo: Arc<dyn FilmsRepository>) {
    let document = film_document();
    let film_id = document.film.id.clone();
    let evening = ShowingRef::new(&film_id, EVENING);
    let night = ShowingRef::new(&film_id, NIGHT);

    // create: второй раз фильм не добавляется
    assert!(repo.create(document.clone()).await.unwrap());
    assert!(!repo.create(document.clone()).await.unwrap());

    // каталог
    let films = repo.find_all().await.unwrap();
    assert!(films.iter().any(|f| f == &document.film));
    let schedule = repo.find_schedule(&film_id).await.unwrap().unwrap();
    assert_eq!(schedule.len(), 2);
    let seeded = schedule.iter().find(|s| s.daytime == EVENING).unwrap();
    assert_eq!(seeded.taken, keys(&[(1, 1)]));
    assert_eq!(seeded.rows, 4);
    assert_eq!(seeded.seats, 10);
    assert!(repo.find_schedule("no-such-film").await.unwrap().is_none());

    // разрешение сеанса
    assert!(matches!(
        repo.resolve_showing(&ShowingRef::new("no-such-film", EVENING)).await,
        Err(StoreError::FilmNotFound(_))
    ));
    assert!(matches!(
        repo.resolve_showing(&ShowingRef::new(&film_id, "2030-01-01T00:00:00Z")).await,
        Err(StoreError::ShowingNotFound(_))
    ));
    assert!(matches!(
        repo.reserve(&ShowingRef::new(&film_id, "2030-01-01T00:00:00Z"), &keys(&[(1, 1)])).await,
        Err(StoreError::ShowingNotFound(_))
    ));

    // резерв всё или ничего
    repo.reserve(&evening, &keys(&[(2, 1), (2, 2)])).await.unwrap();
    match repo.reserve(&evening, &keys(&[(1, 1), (2, 2), (3, 3)])).await {
        Err(StoreError::SeatConflict(conflicts)) => {
            assert_eq!(conflicts, vec![SeatKey::encode(1, 1), SeatKey::encode(2, 2)])
        }
        other => panic!("expected seat conflict, got {:?}", other),
    }
    assert_eq!(taken(repo.as_ref(), &evening).await, keys(&[(1, 1), (2, 1), (2, 2)]));

    // сеансы независимы
    repo.reserve(&night, &keys(&[(2, 2)])).await.unwrap();
    assert_eq!(taken(repo.as_ref(), &night).await, keys(&[(2, 2)]));

    // освобождение, отсутствующие ключи игнорируются
    repo.release(&evening, &keys(&[(2, 1), (4, 10)])).await.unwrap();
    assert_eq!(taken(repo.as_ref(), &evening).await, keys(&[(1, 1), (2, 2)]));
    repo.reserve(&evening, &keys(&[(2, 1)])).await.unwrap();

    concurrent_reservations(repo.clone(), &night).await;
}

/// Одно место берёт ровно один из параллельных запросов,
/// непересекающиеся запросы не теряют друг друга.
async fn concurrent_reservations(repo: Arc<dyn FilmsRepository>, showing: &ShowingRef) {
    let contested = keys(&[(4, 1)]);
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let repo = repo.clone();
            let showing = showing.clone();
            let seats = contested.clone();
            tokio::spawn(async move { repo.reserve(&showing, &seats).await })
        })
        .collect();
    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => winners += 1,
            Err(StoreError::SeatConflict(conflicts)) => assert_eq!(conflicts, vec![SeatKey::encode(4, 1)]),
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(winners, 1);

    let handles: Vec<_> = (1..=10)
        .map(|seat| {
            let repo = repo.clone();
            let showing = showing.clone();
            tokio::spawn(async move { repo.reserve(&showing, &keys(&[(3, seat)])).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let taken = taken(repo.as_ref(), showing).await;
    for seat in 1..=10 {
        assert!(taken.contains(&SeatKey::encode(3, seat)));
    }
    assert_eq!(taken.len(), 12);
}
