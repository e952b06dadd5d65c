//! Persistence layer — key-value backends and the profile store.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod profile;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use profile::ProfileStore;
pub use traits::KeyValueStore;
