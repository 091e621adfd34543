pub mod error;
pub mod store;
pub mod memory;
pub mod redb_store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use redb_store::RedbStore;
pub use store::{JobStore, PathField};
