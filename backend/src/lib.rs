//! Minbar media backend: signed downloads and uploads for stored media references

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]
#![warn(missing_docs)]

/// S3-compatible object storage
pub mod media_storage;

/// Request middleware
pub mod middleware;

/// HTTP routes
pub mod routes;

/// Server setup
pub mod server;

/// Shared types
pub mod types;
