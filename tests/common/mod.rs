use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use inventory_backend::config::{AppState, Config, StorageBackend};
use inventory_backend::db::MemoryItemRepository;
use inventory_backend::routes::build_router;
use inventory_backend::storage::LocalImageStore;

pub const BOUNDARY: &str = "----estoque-test-boundary";

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Configuração de teste: repositório em memória e uploads no diretório dado.
pub fn test_config(upload_dir: &Path) -> Config {
    Config {
        storage_backend: StorageBackend::Memory,
        database_url: None,
        db_max_connections: 1,
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_dir: upload_dir.to_path_buf(),
        public_base_url: "http://localhost:5000".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
        max_upload_bytes: 1024 * 1024,
    }
}

/// Mesmo router do main, sobre um repositório em memória.
pub fn build_test_app(upload_dir: &Path) -> Router {
    let config = test_config(upload_dir);
    let images = Arc::new(LocalImageStore::new(upload_dir, &config.uploads_url()));
    let state = AppState::from_parts(config, None, Arc::new(MemoryItemRepository::new()), images);
    build_router(state).expect("router de teste")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn send_json(app: &Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Corpo multipart/form-data montado à mão: campos de texto + arquivos em `images`.
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let part = format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n");
        body.extend_from_slice(part.as_bytes());
    }
    for (file_name, bytes) in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let header = format!(
            "Content-Disposition: form-data; name=\"images\"; filename=\"{file_name}\"\r\n\
             Content-Type: image/png\r\n\r\n"
        );
        body.extend_from_slice(header.as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn send_multipart(
    app: &Router,
    method: Method,
    uri: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &[u8])],
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(fields, files)))
        .unwrap();
    send(app, request).await
}

/// Cria um item válido pelo formulário e devolve o JSON retornado.
pub async fn create_item(app: &Router, name: &str, units: &str) -> Value {
    let response = send_multipart(
        app,
        Method::POST,
        "/api/items",
        &[
            ("itemName", name),
            ("itemCode", ""),
            ("category", "Geral"),
            ("totalUnits", units),
            ("purchasePrice", "100"),
            ("gstRate", "18"),
            ("isInclusive", "false"),
            ("lowStockWarning", "false"),
            ("lowStockQuantity", ""),
        ],
        &[("foto.png", PNG_BYTES)],
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await
}
