//! SQLite storage layer.
//!
//! `Backend` implementation backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod backend;
pub mod pool;
