//! # canbox Core Library
//!
//! Core functionality for the canbox CAN-to-display gateway.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Vehicle profile loading and validation (JSON frame/field descriptions)
//! - A configuration-driven CAN frame decoding engine
//! - The shared vehicle state store
//! - The head-unit serial protocol: framing, checksums, handshake and scheduling
//! - A bus health supervisor that forces a restart on a wedged transport
//!
//! ## Example
//!
//! ```rust,ignore
//! use canbox_core::prelude::*;
//!
//! let profile = canbox_core::profile::load_file("vehicle.json")?;
//! let link = SerialLink::open("/dev/ttyUSB0", 38400)?;
//! let bus = ReplayBus::from_file("capture.txt")?;
//!
//! let mut gateway = Gateway::new(bus, link, Calibration::default())
//!     .with_restarter(Box::new(my_restarter));
//! gateway.activate(profile);
//!
//! loop {
//!     if let CycleOutcome::Restart(_) = gateway.run_cycle() {
//!         break;
//!     }
//! }
//! ```

pub mod bus;
pub mod calibration;
pub mod clock;
pub mod codec;
pub mod decoder;
pub mod diagnostics;
pub mod gateway;
pub mod output;
pub mod profile;
pub mod protocol;
pub mod supervisor;
pub mod vehicle;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bus::{BusStatus, CanBus, CanFrame, ControllerState, ReplayBus};
    pub use crate::calibration::Calibration;
    pub use crate::clock::{Clock, ManualClock, MonotonicClock};
    pub use crate::decoder::DecodingEngine;
    pub use crate::diagnostics::Diagnostics;
    pub use crate::gateway::{CycleOutcome, Gateway};
    pub use crate::output::{Channel, OutputScheduler, SchedulerConfig};
    pub use crate::profile::{OutputField, Profile, ValidationError};
    pub use crate::protocol::{DisplayLink, LinkError, Packet, SerialLink};
    pub use crate::supervisor::{BusHealth, BusSupervisor, RestartReason, Restarter, SupervisorConfig};
    pub use crate::vehicle::VehicleState;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
