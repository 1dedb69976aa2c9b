//! Output Encoder & Scheduler
//!
//! Encodes the vehicle state into display packets and decides when each one
//! goes out on the link.

pub mod messages;
mod scheduler;

pub use messages::{build_message, calibrated_steering, Channel};
pub use scheduler::{OutputScheduler, SchedulerConfig};
