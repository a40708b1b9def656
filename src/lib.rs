#![warn(missing_docs)]
//! Pulse is the admission and anomaly-notification core of a performance
//! monitoring platform: it gates and persists high-volume telemetry from
//! untrusted clients, and turns a precomputed anomaly feed into deduplicated,
//! multi-channel webhook alerts.

pub mod config;
pub mod http_client;
pub mod http_server;
pub mod ingestion;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod pipeline;
pub mod rate_limiter;
pub mod test_helpers;
