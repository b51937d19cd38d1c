//! Souk Storefront library.
//!
//! The order-placement HTTP service as a library, so the binary, the CLI and
//! the integration tests share one router, one set of stores and one
//! configuration layer.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
