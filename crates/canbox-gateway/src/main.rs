//! canbox gateway
//!
//! Reads vehicle telemetry from a CAN interface (or a recorded capture),
//! decodes it through a vehicle profile and drives the head-unit display
//! over its serial link. Without a live profile the display is fed from
//! synthetic data.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use canbox_core::bus::{CanBus, ReplayBus};
use canbox_core::calibration::Calibration;
use canbox_core::gateway::{CycleOutcome, Gateway};
use canbox_core::profile::{self, Profile};
use canbox_core::protocol::{self, SerialLink};

mod demo;
mod restart;
mod transport;

use demo::SyntheticGenerator;
use restart::ProcessRestarter;
use transport::IdleBus;

/// Sleep when a cycle had nothing to do
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// CAN-to-display telemetry gateway
#[derive(Parser, Debug)]
#[command(name = "canbox-gateway")]
#[command(about = "Translate vehicle CAN telemetry into head-unit display frames", long_about = None)]
#[command(version)]
struct Args {
    /// Vehicle profile document (JSON); synthetic data when absent
    #[arg(short, long, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Calibration file (JSON); defaults when absent
    #[arg(short, long, value_name = "FILE")]
    calibration: Option<PathBuf>,

    /// Serial port of the display; first USB adapter when absent
    #[arg(short, long, value_name = "PORT")]
    display_port: Option<String>,

    /// Display link speed
    #[arg(short, long, default_value_t = protocol::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// SocketCAN interface to read (e.g. can0)
    #[arg(long, value_name = "IFACE")]
    can_interface: Option<String>,

    /// Replay a text capture instead of reading a live bus
    #[arg(long, value_name = "FILE", conflicts_with = "can_interface")]
    replay: Option<PathBuf>,

    /// Minimum spacing between replayed frames
    #[arg(long, value_name = "MS", default_value_t = 10)]
    replay_interval_ms: u64,

    /// Loop the replay capture
    #[arg(long, requires = "replay")]
    replay_loop: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    tracing::info!(
        "canbox gateway v{}, core v{}",
        env!("CARGO_PKG_VERSION"),
        canbox_core::VERSION
    );

    let calibration = load_calibration(args.calibration.as_deref())?;
    let profile = load_profile(args.profile.as_deref());
    let link = open_display(args.display_port.as_deref(), args.baud)?;
    let bus = open_bus(&args)?;

    let mut gateway =
        Gateway::new(bus, link, calibration).with_restarter(Box::new(ProcessRestarter));
    gateway.activate(profile);

    let mut generator = SyntheticGenerator::new();
    loop {
        let outcome = gateway.run_cycle();

        if gateway.is_simulated() {
            let now = gateway.now_ms();
            generator.update(gateway.state_mut(), now);
        }

        match outcome {
            CycleOutcome::Restart(reason) => {
                bail!("gateway stopped: {}", reason);
            }
            CycleOutcome::Completed {
                handled: None,
                sent: 0,
            } => std::thread::sleep(IDLE_SLEEP),
            CycleOutcome::Completed { .. } => {}
        }
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides the `-v` level
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_calibration(path: Option<&Path>) -> Result<Calibration> {
    match path {
        Some(path) => {
            let calibration = Calibration::from_file(path)
                .with_context(|| format!("loading calibration {}", path.display()))?;
            tracing::info!("Calibration loaded from {}", path.display());
            Ok(calibration)
        }
        None => {
            tracing::info!("No calibration file, using defaults");
            Ok(Calibration::default())
        }
    }
}

/// Load the profile; any problem falls back to synthetic data so the
/// display keeps working
fn load_profile(path: Option<&Path>) -> Profile {
    let Some(path) = path else {
        tracing::info!("No profile given, running on synthetic data");
        return Profile::simulated();
    };
    match profile::load_file(path) {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Profile {} rejected: {}; running on synthetic data", path.display(), e);
            Profile::simulated()
        }
    }
}

fn open_display(port: Option<&str>, baud: u32) -> Result<SerialLink> {
    let name = match port {
        Some(name) => name.to_string(),
        None => match protocol::list_ports().into_iter().next() {
            Some(info) => info.name,
            None => bail!("no serial port found for the display; pass --display-port"),
        },
    };
    SerialLink::open(&name, baud).with_context(|| format!("opening display link {}", name))
}

fn open_bus(args: &Args) -> Result<Box<dyn CanBus>> {
    if let Some(path) = &args.replay {
        let bus = ReplayBus::from_file(path)
            .with_context(|| format!("loading capture {}", path.display()))?
            .with_interval(Duration::from_millis(args.replay_interval_ms))
            .looping(args.replay_loop);
        return Ok(Box::new(bus));
    }

    if let Some(interface) = &args.can_interface {
        return open_socketcan(interface);
    }

    tracing::info!("No CAN source configured");
    Ok(Box::new(IdleBus))
}

#[cfg(all(feature = "socketcan", target_os = "linux"))]
fn open_socketcan(interface: &str) -> Result<Box<dyn CanBus>> {
    let bus = transport::SocketCanBus::open(interface)
        .with_context(|| format!("opening CAN interface {}", interface))?;
    Ok(Box::new(bus))
}

#[cfg(not(all(feature = "socketcan", target_os = "linux")))]
fn open_socketcan(interface: &str) -> Result<Box<dyn CanBus>> {
    bail!(
        "cannot open {}: built without SocketCAN support (enable the `socketcan` feature on Linux)",
        interface
    )
}
