//! Message relay
//!
//! Routing of decoded client records and fan-out of the results.

pub mod broadcast;
pub mod router;

pub use broadcast::{FanoutReport, fan_out};
pub use router::{ConnectionState, RouteOutcome, Router};
