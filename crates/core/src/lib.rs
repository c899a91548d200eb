//! Velvet Fig Core - Shared types library.
//!
//! This crate provides common types used across all Velvet Fig components:
//! - `storefront` - Catalog, cart, checkout, and order services
//! - `integration-tests` - End-to-end flows over the in-memory backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no
//! runtime dependency. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
