//! # beli-db: SQLite Persistence for Beli Sync
//!
//! Durable key-value storage for the offline mutation queue, backed by SQLite
//! through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   beli-sync ── KeyValueStore ──► beli-db (THIS CRATE) ──► SQLite file  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use beli_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/beli-sync.db")).await?;
//! db.kv().set("beli-sync-store", "{}").await?;
//! let raw = db.kv().get("beli-sync-store").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::kv::KvRepository;
