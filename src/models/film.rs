use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::SeatKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub director: String,
}

/// Сеанс фильма вместе с картой занятых мест.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Showing {
    pub id: String,
    pub daytime: String,
    pub hall: u32,
    pub rows: u32,
    pub seats: u32,
    pub price: f64,
    #[serde(default)]
    pub taken: BTreeSet<SeatKey>,
}

impl Showing {
    pub fn contains_seat(&self, row: u32, seat: u32) -> bool {
        (1..=self.rows).contains(&row) && (1..=self.seats).contains(&seat)
    }
}

/// Документ каталога: фильм со своим расписанием (формат файла сидирования).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmDocument {
    #[serde(flatten)]
    pub film: Film,
    #[serde(default)]
    pub schedule: Vec<Showing>,
}

/// Ссылка на сеанс: фильм + время начала.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShowingRef {
    pub film: String,
    pub daytime: String,
}

impl ShowingRef {
    pub fn new(film: impl Into<String>, daytime: impl Into<String>) -> Self {
        Self { film: film.into(), daytime: daytime.into() }
    }
}

impl fmt::Display for ShowingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.film, self.daytime)
    }
}
