//! System-level modules
//!
//! - Logging initialization
//! - OS shutdown signals

pub mod logging;
pub mod signal;
