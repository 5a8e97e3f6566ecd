//! Vitrina Core - Shared types library.
//!
//! This crate provides common types used across all Vitrina components:
//! - `admin` - Admin API service (catalog, uploads, header config)
//! - `cli` - Command-line tools for secrets and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no storage access. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product records, header configuration, and their validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
