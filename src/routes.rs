// src/routes.rs

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{config::AppState, handlers};

// Monta o router completo (usado pelo main e pelos testes de integração).
pub fn build_router(app_state: AppState) -> anyhow::Result<Router> {
    let config = app_state.config.clone();

    let origin: HeaderValue = config
        .cors_origin
        .parse()
        .with_context(|| format!("CORS_ORIGIN inválida: '{}'", config.cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let item_routes = Router::new()
        .route("/api/items"
               ,get(handlers::items::list_items)
               .post(handlers::items::create_item)
        )
        .route("/api/items/{id}"
               ,get(handlers::items::get_item)
               .put(handlers::items::update_item)
               .delete(handlers::items::delete_item)
        )
        .route("/api/items/{id}/stock"
               ,patch(handlers::items::update_stock)
               .put(handlers::items::update_stock)
        );

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(item_routes)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    Ok(app)
}

async fn route_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Rota não encontrada." })))
}
