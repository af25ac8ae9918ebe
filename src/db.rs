pub mod item_repo;
pub use item_repo::{ItemStore, PgItemRepository};
pub mod memory_repo;
pub use memory_repo::MemoryItemRepository;
