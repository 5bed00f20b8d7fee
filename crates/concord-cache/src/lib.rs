pub mod error;
pub mod memory;
pub mod provider;
pub mod reader;
pub mod sqlite;

pub use error::CacheError;
pub use memory::MemoryCache;
pub use provider::{DatasetProvider, StaticProvider};
pub use reader::CacheReader;
pub use sqlite::SqliteReader;
