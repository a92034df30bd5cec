//! Shared domain types for rolekeep.
//!
//! This crate contains the types used across the workspace: the
//! `ServiceRole` capability set and its `RoleV1` encoding, global
//! configuration, and the error enums returned by backends, marshalers
//! and the role store.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod role;
