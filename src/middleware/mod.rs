use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;

/// CORS для фронтенда. Если `FRONTEND_URL` не задан, разрешаем любой origin.
pub fn cors_layer(app: &AppConfig) -> anyhow::Result<CorsLayer> {
    let Some(frontend) = app.frontend_url.as_deref() else {
        return Ok(CorsLayer::permissive());
    };

    let origin = HeaderValue::from_str(frontend.trim_end_matches('/'))
        .with_context(|| format!("invalid FRONTEND_URL '{}'", frontend))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT]))
}
