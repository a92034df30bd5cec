//! Infrastructure layer for rolekeep.
//!
//! Contains implementations of the `Backend` trait defined in
//! `rolekeep-core` (an in-process `DashMap` store and a SQLite store with
//! split read/write pools) plus configuration loading.

pub mod backend;
pub mod config;
pub mod memory;
pub mod sqlite;
