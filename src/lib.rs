//! Student enrollment and course rating service.
//!
//! Students register and log in to receive a bearer token, then enroll in
//! seeded courses and rate each course once. The [`registrar::Registrar`]
//! ties the credential store, the token issuer and the storage layer
//! together; [`api`] exposes it over HTTP.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod registrar;

pub use error::Error;
