//! Shortener - a URL shortener service
//!
//! Per-browser history via a signed identity cookie, batch creation, and
//! asynchronous soft deletion through a bounded worker pool.
//!
//! # Architecture
//! - `storage`: file journal and relational backends behind `UrlStorage`
//! - `repository`: timeouts, short id allocation and conflict read-back
//! - `dispatcher`: bounded delete queue with a Running/Draining/Stopped lifecycle
//! - `api`: HTTP handlers, identity middleware and error mapping
//! - `config`: TOML + environment + command-line configuration
//! - `runtime`: startup wiring, server mode and graceful shutdown
//! - `system`: logging and OS signals

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod repository;
pub mod runtime;
pub mod storage;
pub mod system;
pub mod utils;
