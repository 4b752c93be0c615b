// Фильм и расписание - JSON-строки, занятые места сеанса - отдельный SET

use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::BTreeSet;

use super::FilmsRepository;
use crate::error::StoreError;
use crate::models::{Film, FilmDocument, SeatKey, Showing, ShowingRef};
use crate::redis_client::RedisClient;

const FILMS_KEY: &str = "afisha:films";

// KEYS[1] - множество занятых мест, ARGV - запрошенные ключи.
// Возвращает уже занятые ключи; если их нет, добавляет все.
const RESERVE_SCRIPT: &str = r#"
local conflicts = {}
for _, seat in ipairs(ARGV) do
  if redis.call('SISMEMBER', KEYS[1], seat) == 1 then
    table.insert(conflicts, seat)
  end
end
if #conflicts == 0 then
  redis.call('SADD', KEYS[1], unpack(ARGV))
end
return conflicts
"#;

// KEYS: фильм, расписание, список фильмов, затем множества занятых мест.
// ARGV: JSON фильма, JSON расписания, id фильма, затем JSON-массивы мест для KEYS[4..].
// Ключ фильма пишется последним: если скрипт упал на полпути, фильма нет
// и повторное сидирование дописывает всё заново.
const CREATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
for i = 4, #KEYS do
  for _, seat in ipairs(cjson.decode(ARGV[i])) do
    redis.call('SADD', KEYS[i], seat)
  end
end
redis.call('SET', KEYS[2], ARGV[2])
redis.call('LREM', KEYS[3], 0, ARGV[3])
redis.call('RPUSH', KEYS[3], ARGV[3])
redis.call('SET', KEYS[1], ARGV[1])
return 1
"#;

fn film_key(film_id: &str) -> String {
    format!("afisha:film:{}", film_id)
}

fn schedule_key(film_id: &str) -> String {
    format!("afisha:film:{}:schedule", film_id)
}

fn taken_key(showing_id: &str) -> String {
    format!("afisha:showing:{}:taken", showing_id)
}

fn to_args(seats: &BTreeSet<SeatKey>) -> Vec<String> {
    seats.iter().map(|k| k.as_str().to_owned()).collect()
}

pub struct RedisFilmsRepository {
    redis: RedisClient,
    reserve_script: redis::Script,
    create_script: redis::Script,
}

impl RedisFilmsRepository {
    pub fn new(redis: RedisClient) -> Self {
        Self {
            redis,
            reserve_script: redis::Script::new(RESERVE_SCRIPT),
            create_script: redis::Script::new(CREATE_SCRIPT),
        }
    }

    /// Описание сеанса без занятых мест. Расписание после сидирования не меняется,
    /// поэтому читать его отдельно от резерва безопасно.
    async fn showing_meta(&self, showing: &ShowingRef) -> Result<Showing, StoreError> {
        let mut conn = self.redis.conn.clone();
        let (film, schedule): (Option<String>, Option<String>) = redis::pipe()
            .get(film_key(&showing.film))
            .get(schedule_key(&showing.film))
            .query_async(&mut conn)
            .await?;

        if film.is_none() {
            return Err(StoreError::FilmNotFound(showing.film.clone()));
        }
        let schedule: Vec<Showing> = match schedule {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        schedule
            .into_iter()
            .find(|s| s.daytime == showing.daytime)
            .ok_or_else(|| StoreError::ShowingNotFound(showing.clone()))
    }

    async fn taken(&self, showing_id: &str) -> Result<BTreeSet<SeatKey>, StoreError> {
        let mut conn = self.redis.conn.clone();
        let members: Vec<String> = conn.smembers(taken_key(showing_id)).await?;
        Ok(members.into_iter().map(SeatKey::from_stored).collect())
    }
}

#[async_trait]
impl FilmsRepository for RedisFilmsRepository {
    async fn find_all(&self) -> Result<Vec<Film>, StoreError> {
        let mut conn = self.redis.conn.clone();
        let ids: Vec<String> = conn.lrange(FILMS_KEY, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.get(film_key(id));
        }
        let raw: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        raw.into_iter()
            .flatten()
            .map(|json| serde_json::from_str::<Film>(&json).map_err(StoreError::from))
            .collect()
    }

    async fn find_schedule(&self, film_id: &str) -> Result<Option<Vec<Showing>>, StoreError> {
        let mut conn = self.redis.conn.clone();
        let (film, schedule): (Option<String>, Option<String>) = redis::pipe()
            .get(film_key(film_id))
            .get(schedule_key(film_id))
            .query_async(&mut conn)
            .await?;

        if film.is_none() {
            return Ok(None);
        }
        let mut showings: Vec<Showing> = match schedule {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        if showings.is_empty() {
            return Ok(Some(showings));
        }

        // Все множества занятых мест одним запросом
        let mut pipe = redis::pipe();
        for showing in &showings {
            pipe.smembers(taken_key(&showing.id));
        }
        let taken: Vec<Vec<String>> = pipe.query_async(&mut conn).await?;
        for (showing, members) in showings.iter_mut().zip(taken) {
            showing.taken = members.into_iter().map(SeatKey::from_stored).collect();
        }
        Ok(Some(showings))
    }

    async fn create(&self, document: FilmDocument) -> Result<bool, StoreError> {
        let film_id = document.film.id.clone();
        let film_json = serde_json::to_string(&document.film)?;
        let seeded: Vec<(String, String)> = document
            .schedule
            .iter()
            .filter(|s| !s.taken.is_empty())
            .map(|s| -> Result<(String, String), StoreError> {
                Ok((taken_key(&s.id), serde_json::to_string(&to_args(&s.taken))?))
            })
            .collect::<Result<_, _>>()?;
        let schedule: Vec<Showing> = document
            .schedule
            .into_iter()
            .map(|s| Showing { taken: BTreeSet::new(), ..s })
            .collect();

        let mut invocation = self.create_script.prepare_invoke();
        invocation
            .key(film_key(&film_id))
            .key(schedule_key(&film_id))
            .key(FILMS_KEY)
            .arg(film_json)
            .arg(serde_json::to_string(&schedule)?)
            .arg(&film_id);
        for (key, seats) in seeded {
            invocation.key(key).arg(seats);
        }

        let mut conn = self.redis.conn.clone();
        let created: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(created == 1)
    }

    async fn resolve_showing(&self, showing: &ShowingRef) -> Result<Showing, StoreError> {
        let mut meta = self.showing_meta(showing).await?;
        meta.taken = self.taken(&meta.id).await?;
        Ok(meta)
    }

    async fn reserve(&self, showing: &ShowingRef, seats: &BTreeSet<SeatKey>) -> Result<(), StoreError> {
        let meta = self.showing_meta(showing).await?;
        if seats.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis.conn.clone();
        let conflicts: Vec<String> = self
            .reserve_script
            .key(taken_key(&meta.id))
            .arg(to_args(seats))
            .invoke_async(&mut conn)
            .await?;

        if conflicts.is_empty() {
            Ok(())
        } else {
            let mut conflicts: Vec<SeatKey> = conflicts.into_iter().map(SeatKey::from_stored).collect();
            conflicts.sort();
            Err(StoreError::SeatConflict(conflicts))
        }
    }

    async fn release(&self, showing: &ShowingRef, seats: &BTreeSet<SeatKey>) -> Result<(), StoreError> {
        let meta = self.showing_meta(showing).await?;
        if seats.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis.conn.clone();
        let _: i64 = conn.srem(taken_key(&meta.id), to_args(seats)).await?;
        Ok(())
    }
}
