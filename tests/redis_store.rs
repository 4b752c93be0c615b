// Запускается, только если задан TEST_REDIS_URL

mod common;

use redis::AsyncCommands;
use std::sync::Arc;

use afisha::redis_client::RedisClient;
use afisha::repository::{FilmsRepository, RedisFilmsRepository};

async fn client() -> Option<RedisClient> {
    let Ok(url) = std::env::var("TEST_REDIS_URL") else {
        eprintln!("TEST_REDIS_URL is not set, skipping redis store tests");
        return None;
    };
    let redis = RedisClient::new(&url).await.unwrap();
    redis.ping().await.unwrap();
    Some(redis)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn redis_store_honours_contract() {
    let Some(redis) = client().await else { return };
    common::store_contract(Arc::new(RedisFilmsRepository::new(redis))).await;
}

#[tokio::test]
async fn failed_create_leaves_film_absent_and_retryable() {
    let Some(redis) = client().await else { return };
    let mut conn = redis.conn.clone();
    let repo = RedisFilmsRepository::new(redis);

    let document = common::film_document();
    let film_id = document.film.id.clone();
    // множество мест подменено строкой, SADD упадёт с WRONGTYPE
    let taken_key = format!("afisha:showing:{}:taken", document.schedule[0].id);
    let _: () = conn.set(&taken_key, "junk").await.unwrap();

    assert!(repo.create(document.clone()).await.is_err());
    assert!(repo.find_schedule(&film_id).await.unwrap().is_none());
    assert!(repo.find_all().await.unwrap().iter().all(|f| f.id != film_id));

    let _: i64 = conn.del(&taken_key).await.unwrap();
    assert!(repo.create(document.clone()).await.unwrap());
    let schedule = repo.find_schedule(&film_id).await.unwrap().unwrap();
    assert_eq!(schedule.len(), 2);
    assert_eq!(repo.find_all().await.unwrap().iter().filter(|f| f.id == film_id).count(), 1);
}
