//! Storefront management client library.
//!
//! The crate is layered bottom-up:
//! - [`models`]: wire and domain types shared by every layer
//! - [`config`]: endpoint and timeout configuration
//! - [`api`]: typed REST wrappers over the platform backend
//! - [`storage`]: file-backed persistence of credentials
//! - [`session`]: the authenticated session and multi-store context,
//!   the only stateful layer and the intended entry point

pub mod api;
pub mod config;
pub mod models;
pub mod session;
pub mod storage;
