pub mod films;
pub mod order;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(films::routes())
        .merge(order::routes())
}
