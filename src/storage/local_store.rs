// src/storage/local_store.rs

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    storage::image_store::{ImageKind, ImageStore, UploadedImage},
};

// Grava as imagens num diretório local, servido pelo próprio servidor em /uploads.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    /// `public_base_url` é o prefixo das URLs devolvidas (ex: http://localhost:5000/uploads).
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    // Nome: <millis>-<8 hex>.<ext>
    fn file_name_for(kind: ImageKind) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}.{}", Utc::now().timestamp_millis(), &suffix[..8], kind.extension())
    }

    /// Só aceita nomes simples gerados por nós, nunca caminhos.
    fn local_path_of(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(&self.public_base_url)?.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return None;
        }
        Some(self.root.join(name))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, image: &UploadedImage, kind: ImageKind) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::ImageStorage(format!("falha ao criar {:?}: {e}", self.root)))?;

        let name = Self::file_name_for(kind);
        let path = self.root.join(&name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| AppError::ImageStorage(format!("falha ao gravar {path:?}: {e}")))?;

        // O Content-Type declarado só vai para o log; o formato vale pelo conteúdo.
        tracing::debug!(
            original = %image.file_name,
            declared = image.content_type.as_deref().unwrap_or("-"),
            detected = kind.extension(),
            stored = %name,
            bytes = image.bytes.len(),
            "Imagem gravada"
        );
        Ok(format!("{}/{}", self.public_base_url, name))
    }

    async fn remove(&self, url: &str) -> Result<(), AppError> {
        let Some(path) = self.local_path_of(url) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::ImageStorage(format!("falha ao remover {path:?}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn png() -> UploadedImage {
        UploadedImage {
            file_name: "produto.png".into(),
            content_type: Some("image/png".into()),
            bytes: Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
        }
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            LocalImageStore::new(dir.path().join("uploads"), "http://localhost:5000/uploads/");

        let url = store.store(&png(), ImageKind::Png).await.unwrap();

        assert!(url.starts_with("http://localhost:5000/uploads/"));
        assert!(url.ends_with(".png"));
        let path = store.local_path_of(&url).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), png().bytes.to_vec());
    }

    #[tokio::test]
    async fn remove_deletes_file_and_tolerates_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "http://img.test/uploads");

        let url = store.store(&png(), ImageKind::Png).await.unwrap();
        let path = store.local_path_of(&url).unwrap();

        store.remove(&url).await.unwrap();
        assert!(!path.exists());
        store.remove(&url).await.unwrap();
    }

    #[test]
    fn foreign_or_nested_urls_are_ignored() {
        let store = LocalImageStore::new("/tmp/uploads", "http://img.test/uploads");
        assert!(store.local_path_of("https://s3.amazonaws.com/x.png").is_none());
        assert!(store.local_path_of("http://img.test/uploads/../etc/passwd").is_none());
        assert!(store.local_path_of("http://img.test/uploads/").is_none());
        assert!(store.local_path_of("http://img.test/uploads/a.png").is_some());
    }
}
