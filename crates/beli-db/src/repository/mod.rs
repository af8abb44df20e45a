//! # Repository Module
//!
//! Database repository implementations for the sync store.
//!
//! ## Available Repositories
//!
//! - [`kv::KvRepository`] - String key to string value documents

pub mod kv;
