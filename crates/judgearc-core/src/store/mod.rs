//! Judgment record store backends.

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
