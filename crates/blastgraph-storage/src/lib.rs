//! Storage abstraction for the blastgraph dependency graph.
//!
//! Provides the [`GraphStore`] trait defining the storage contract that all
//! backends implement, the [`InMemoryStore`] and [`SqliteStore`] backends,
//! and the [`RetryingStore`] retry boundary.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`traits`]: GraphStore trait definition and the transaction helper
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: migrations and connection setup
//! - [`sqlite`]: SqliteStore implementation
//! - [`retry`]: RetryPolicy and RetryingStore

pub mod error;
pub mod memory;
pub mod retry;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use memory::InMemoryStore;
pub use retry::{RetryPolicy, RetryingStore};
pub use sqlite::SqliteStore;
pub use traits::{run_in_transaction, GraphStore};
