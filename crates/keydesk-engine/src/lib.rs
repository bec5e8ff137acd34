//! KeyDesk Engine - the key-custody state machine
//!
//! Provides:
//! - `CustodyCache`: in-memory partition of the key range into available
//!   and borrowed sets
//! - `CustodyEngine`: scan processing (badge and key events) against the
//!   cache and the entry log
//! - `AuditLog`: facade over the entry store for recording and querying
//!   custody events
//! - `MirrorWriter`: background task mirroring cache transitions into the
//!   durable key registry
//!
//! ## Modules
//!
//! - [`cache`] - The available/borrowed key partition
//! - [`engine`] - Scan orchestration and transition rules
//! - [`audit`] - Entry log facade
//! - [`mirror`] - Asynchronous registry mirror queue

pub mod audit;
pub mod cache;
pub mod engine;
pub mod mirror;

pub use audit::AuditLog;
pub use cache::CustodyCache;
pub use engine::{CustodyEngine, KeyStatusRow, DEFAULT_LOG_LIMIT};
pub use mirror::{MirrorHandle, MirrorUpdate, MirrorWriter};
