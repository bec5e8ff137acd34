//! Domain entities and business logic
//!
//! This module contains the core domain types for KeyDesk:
//! - Newtypes for type-safe identifiers and validated domain values
//! - Key range and status types
//! - Entry records for the custody log
//! - Scan input classification
//! - Session tracking for the active student
//! - Domain-specific error types

pub mod entry;
pub mod errors;
pub mod key;
pub mod newtypes;
pub mod scan;
pub mod session;

// Re-export commonly used types
pub use entry::{EntryRecord, KeyEvent};
pub use errors::{CustodyError, DomainError};
pub use key::{KeyRange, KeyStatus};
pub use newtypes::{EntryId, KeyId, StudentId};
pub use scan::ScanInput;
pub use session::StudentSession;
