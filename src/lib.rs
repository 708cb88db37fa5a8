//! beeline — read-only access to local Beeper chats
//!
//! ## Module Organization
//!
//! - `adapters/`: storage access (the index database, platform bridge stores)
//! - `services/`: pure logic (conversation classification, text rendering)
//! - `cli/`: command surface (thin wrappers over the store)
//! - `config/`: database path discovery
//! - `types/`: data structures and errors

pub mod adapters;
pub mod cli;
pub mod config;
pub mod services;
pub mod types;

pub use adapters::bridge::BridgeLookup;
pub use adapters::sqlite::Store;
pub use types::error::{BeelineError, Result};
