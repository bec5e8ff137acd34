//! KeyDesk Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `EntryRecord`, `StudentSession`, `KeyRange`, scan input parsing
//! - **Port definitions** - Traits for adapters: `IEntryStore`
//! - **Error taxonomy** - `DomainError` for validation, `CustodyError` for scan processing
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! The custody engine (in `keydesk-engine`) orchestrates domain entities
//! through the port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
