use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::models::{SeatKey, ShowingRef};

/// Ошибки структурной проверки заказа. `index` - позиция билета в запросе.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Не указаны билеты для бронирования")]
    EmptyBatch,
    #[error("Не указан фильм, сеанс или время (билет #{index})")]
    MissingReference { index: usize },
    #[error("Неправильный формат места или цены (билет #{index})")]
    MalformedSeatOrPrice { index: usize },
    #[error("Некорректные координаты места (билет #{index}: ряд {row}, место {seat})")]
    InvalidSeatCoordinates { index: usize, row: i64, seat: i64 },
}

/// Ошибки хранилища сеансов.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("film {0} not found")]
    FilmNotFound(String),
    #[error("showing {0} not found")]
    ShowingNotFound(ShowingRef),
    #[error("seats already taken: {}", join_keys(.0))]
    SeatConflict(Vec<SeatKey>),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("corrupted record: {0}")]
    Corrupted(String),
    #[error("reservation on {0} kept losing races, giving up")]
    Contention(ShowingRef),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupted(err.to_string())
    }
}

/// Машиночитаемый вид ошибки, уходит клиенту в поле `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    EmptyBatch,
    MissingReference,
    MalformedSeatOrPrice,
    InvalidSeatCoordinates,
    SessionNotFound,
    FilmNotFound,
    SeatsAlreadyTaken,
    MalformedRequest,
    Storage,
    Internal,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Сеанс не найден: {0}")]
    SessionNotFound(ShowingRef),
    #[error("Фильм не найден: {0}")]
    FilmNotFound(String),
    #[error("Одно или несколько мест уже заняты: {}", join_keys(.seats))]
    SeatsAlreadyTaken { showing: ShowingRef, seats: Vec<SeatKey> },
    #[error("Некорректное тело запроса: {0}")]
    MalformedRequest(String),
    #[error("Ошибка хранилища: {0}")]
    Storage(StoreError),
    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Validation(ValidationError::EmptyBatch) => ErrorKind::EmptyBatch,
            BookingError::Validation(ValidationError::MissingReference { .. }) => ErrorKind::MissingReference,
            BookingError::Validation(ValidationError::MalformedSeatOrPrice { .. }) => ErrorKind::MalformedSeatOrPrice,
            BookingError::Validation(ValidationError::InvalidSeatCoordinates { .. }) => {
                ErrorKind::InvalidSeatCoordinates
            }
            BookingError::SessionNotFound(_) => ErrorKind::SessionNotFound,
            BookingError::FilmNotFound(_) => ErrorKind::FilmNotFound,
            BookingError::SeatsAlreadyTaken { .. } => ErrorKind::SeatsAlreadyTaken,
            BookingError::MalformedRequest(_) => ErrorKind::MalformedRequest,
            BookingError::Storage(_) => ErrorKind::Storage,
            BookingError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::EmptyBatch
            | ErrorKind::MissingReference
            | ErrorKind::MalformedSeatOrPrice
            | ErrorKind::InvalidSeatCoordinates
            | ErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
            ErrorKind::SessionNotFound | ErrorKind::FilmNotFound => StatusCode::NOT_FOUND,
            ErrorKind::SeatsAlreadyTaken => StatusCode::CONFLICT,
            ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::FilmNotFound(film) => BookingError::FilmNotFound(film),
            StoreError::ShowingNotFound(showing) => BookingError::SessionNotFound(showing),
            other => BookingError::Storage(other),
        }
    }
}

impl From<JsonRejection> for BookingError {
    fn from(rejection: JsonRejection) -> Self {
        BookingError::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Подробности сбоев хранилища остаются в логах
            BookingError::Storage(err) => {
                tracing::error!(error = ?err, "booking failed on storage");
                "Ошибка хранилища".to_string()
            }
            BookingError::Internal(msg) => {
                tracing::error!(error = %msg, "booking failed");
                "Внутренняя ошибка сервера".to_string()
            }
            other => other.to_string(),
        };

        let mut error = json!({
            "kind": self.kind(),
            "message": message,
            "status": status.as_u16(),
        });
        if let BookingError::SeatsAlreadyTaken { seats, .. } = &self {
            error["seats"] = json!(seats);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

fn join_keys(keys: &[SeatKey]) -> String {
    keys.iter().map(SeatKey::as_str).collect::<Vec<_>>().join(", ")
}
