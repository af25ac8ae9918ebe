// src/storage/image_store.rs

use async_trait::async_trait;
use axum::body::Bytes;
use image::ImageFormat;

use crate::{common::error::AppError, models::item::field_error};

/// Arquivo recebido no campo `images` do multipart.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Formatos aceitos (o formulário só oferece jpg/jpeg/png).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
        }
    }
}

impl UploadedImage {
    /// Identifica o formato pelo conteúdo, não pelo nome nem pelo Content-Type.
    pub fn detect_kind(&self) -> Result<ImageKind, AppError> {
        match image::guess_format(&self.bytes) {
            Ok(ImageFormat::Png) => Ok(ImageKind::Png),
            Ok(ImageFormat::Jpeg) => Ok(ImageKind::Jpeg),
            _ => {
                let mut errors = validator::ValidationErrors::new();
                errors.add(
                    "images",
                    field_error(
                        "InvalidImageType",
                        format!(
                            "'{}' não é uma imagem válida (jpg, jpeg, png).",
                            self.file_name
                        ),
                    ),
                );
                Err(AppError::ValidationError(errors))
            }
        }
    }
}

/// Onde as imagens dos itens ficam guardadas.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Grava a imagem e devolve a URL pública.
    async fn store(&self, image: &UploadedImage, kind: ImageKind) -> Result<String, AppError>;

    /// Remove uma imagem gravada antes. URL desconhecida não é erro.
    async fn remove(&self, url: &str) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    fn upload(bytes: &'static [u8]) -> UploadedImage {
        UploadedImage {
            file_name: "foto".into(),
            content_type: Some("image/png".into()),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn detects_png_and_jpeg_by_content() {
        assert_eq!(upload(PNG_HEADER).detect_kind().unwrap(), ImageKind::Png);
        assert_eq!(upload(JPEG_HEADER).detect_kind().unwrap(), ImageKind::Jpeg);
        assert_eq!(ImageKind::Jpeg.extension(), "jpg");
    }

    #[test]
    fn rejects_non_images_even_with_image_content_type() {
        let err = upload(b"%PDF-1.7 not an image").detect_kind().unwrap_err();
        match err {
            AppError::ValidationError(errors) => {
                assert!(errors.field_errors().contains_key("images"));
            }
            other => panic!("esperava erro de validação, veio {other:?}"),
        }
    }
}
