//! Storage backends

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use traits::{
    session_from_parts, DispatchStorage, SessionStorage, Storage, StorageResult, UserStorage,
    WorkflowStorage,
};
