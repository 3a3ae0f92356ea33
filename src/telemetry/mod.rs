//! Simulated network-monitoring telemetry written through a PostgREST endpoint.

pub mod config;
pub mod error;
pub mod generators;
pub mod models;
pub mod rest_client;
pub mod runner;
pub mod store;
