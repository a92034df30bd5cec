//! Business logic and backend trait definitions for rolekeep.
//!
//! This crate defines the "ports" (the `Backend` and `Clock` traits and the
//! role marshaler) that the infrastructure layer implements or consumes, and
//! the `RoleStore` service built on top of them. It depends only on
//! `rolekeep-types` -- never on `rolekeep-infra` or any database crate.

pub mod marshal;
pub mod service;
pub mod storage;
