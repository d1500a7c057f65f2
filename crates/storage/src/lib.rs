//! Storage abstraction and implementations for Questlog.
//!
//! This crate provides the trait the gamification engine is written
//! against, an in-memory backend for tests and dev mode, and a SQLite
//! backend (feature `sqlite`) for durable use.

#![warn(missing_docs)]

pub mod memory;
pub mod trait_;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
pub use trait_::{GamificationStore, Result, StorageError};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
