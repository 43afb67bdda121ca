//! Marigold Core - Shared types library.
//!
//! This crate provides common types used across all Marigold components:
//! - `server` - The HTTP/JSON commerce API
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, coupon enums, variant
//!   selections, and money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
