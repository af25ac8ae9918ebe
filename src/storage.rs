pub mod image_store;
pub use image_store::{ImageKind, ImageStore, UploadedImage};
pub mod local_store;
pub use local_store::LocalImageStore;
