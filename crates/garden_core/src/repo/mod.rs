//! Persistence collaborators for garden documents.
//!
//! # Responsibility
//! - Define the key-value contract the service layer writes snapshots to.
//! - Provide SQLite and in-memory implementations.
//!
//! # Invariants
//! - Stores are synchronous; a successful `persist` is durable for the
//!   backend's definition of durable before it returns.

pub mod kv_repo;
pub mod memory_repo;
