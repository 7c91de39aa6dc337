//! Server middleware
//!
//! Provides lifecycle logging.

pub mod logging;
