//! KeyDesk Store - Durable custody state
//!
//! SQLite-based persistence for:
//! - The append-only entry log (badge scans, borrows, returns)
//! - The key status registry
//!
//! ## Architecture
//!
//! This crate implements the `IEntryStore` port from `keydesk-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`SqliteEntryStore`] - Full `IEntryStore` implementation, including
//!   database setup (file or in-memory, schema prepared on open)
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use keydesk_store::SqliteEntryStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = SqliteEntryStore::open(Path::new("/home/user/.local/share/keydesk/keydesk.db")).await?;
//! // Use store as IEntryStore...
//! # Ok(())
//! # }
//! ```

pub mod store;

pub use store::SqliteEntryStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
