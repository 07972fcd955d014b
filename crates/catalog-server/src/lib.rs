//! `Catalog` HTTP server.
//!
//! Wires the deploy pipeline from `catalog-core` to its Vault and Marathon
//! HTTP clients and exposes it as an Axum service at `POST /service/{name}`.

pub mod clients;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
