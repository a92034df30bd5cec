//! Storage abstractions for rolekeep.
//!
//! Defines the hierarchical key-value backend trait, the time source it
//! carries, and TTL arithmetic shared by backends and services.
//! Implementations live in rolekeep-infra.

pub mod backend;
pub mod clock;
pub mod ttl;
