use anyhow::{bail, ensure, Context};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::models::FilmDocument;
use crate::repository::FilmsRepository;

pub async fn load_catalog(path: &Path) -> anyhow::Result<Vec<FilmDocument>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let documents: Vec<FilmDocument> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse catalog {}", path.display()))?;
    Ok(documents)
}

/// Добавляет отсутствующие фильмы, существующие не трогает.
/// Если хоть один документ некорректен, в хранилище ничего не пишется.
pub async fn seed_catalog(films: &dyn FilmsRepository, documents: Vec<FilmDocument>) -> anyhow::Result<usize> {
    for document in &documents {
        check_document(document)?;
    }

    let mut created = 0;
    for document in documents {
        let id = document.film.id.clone();
        if films.create(document).await.with_context(|| format!("failed to seed film {}", id))? {
            created += 1;
        }
    }
    info!("Catalog seeded: {} new films", created);
    Ok(created)
}

fn check_document(document: &FilmDocument) -> anyhow::Result<()> {
    let film = &document.film;
    ensure!(!film.id.trim().is_empty(), "film without id in catalog");

    let mut daytimes = HashSet::new();
    for showing in &document.schedule {
        ensure!(
            showing.rows >= 1 && showing.seats >= 1,
            "film {}: showing {} has an empty hall",
            film.id,
            showing.id
        );
        ensure!(
            daytimes.insert(showing.daytime.as_str()),
            "film {}: duplicate showing time {}",
            film.id,
            showing.daytime
        );
        for key in &showing.taken {
            match key.decode() {
                Some((row, seat)) if showing.contains_seat(row, seat) => {}
                _ => bail!("film {}: showing {} has invalid taken seat '{}'", film.id, showing.id, key),
            }
        }
    }
    Ok(())
}
