//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IEntryStore`] - Persistent storage for the entry log and the key
//!   status registry

pub mod entry_store;

pub use entry_store::{EntryFilter, IEntryStore, KeyFieldFilter};
