//! Library crate for the badminton board, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Board persistence and store backends.
pub mod dao;
/// Request, response and event payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Business services behind the routes.
pub mod services;
/// Shared application state and board rules.
pub mod state;
