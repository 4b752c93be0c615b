use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::BookingError;
use crate::models::{Film, Showing};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/films", get(list_films))
        .route("/films/{id}/schedule", get(film_schedule))
}

/// Список в формате `{ total, items }`.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self { total: items.len(), items }
    }
}

pub async fn list_films(State(state): State<Arc<AppState>>) -> Result<Json<ListResponse<Film>>, BookingError> {
    let films = state.films.find_all().await?;
    Ok(Json(films.into()))
}

pub async fn film_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ListResponse<Showing>>, BookingError> {
    // Для неизвестного фильма отдаём пустое расписание
    let schedule = match state.films.find_schedule(&id).await? {
        Some(schedule) => schedule,
        None => {
            debug!(film = %id, "Schedule requested for unknown film");
            Vec::new()
        }
    };
    Ok(Json(schedule.into()))
}
