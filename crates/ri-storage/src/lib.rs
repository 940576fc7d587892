pub mod error;
mod database;
mod file_path_cache;
mod manager;
mod schema;
mod transaction;

pub use database::{IncludedFileStatus, StoredLocation, SymbolDatabase};
pub use error::StorageError;
pub use file_path_cache::FilePathCache;
pub use manager::StorageManager;
pub use transaction::WriteTransaction;
