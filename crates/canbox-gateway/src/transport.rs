//! Upstream bus construction

use canbox_core::bus::{BusError, BusStatus, CanBus, CanFrame, ControllerState};

/// Bus that never delivers a frame, for bench runs on synthetic data
#[derive(Debug, Default)]
pub struct IdleBus;

impl CanBus for IdleBus {
    fn poll_frame(&mut self) -> Result<Option<CanFrame>, BusError> {
        Ok(None)
    }

    fn status(&mut self) -> BusStatus {
        BusStatus::default()
    }
}

// linux/can/error.h
const CAN_ERR_CRTL: u32 = 0x0000_0004;
const CAN_ERR_BUSOFF: u32 = 0x0000_0040;
const CAN_ERR_CNT: u32 = 0x0000_0200;
const CAN_ERR_CRTL_RX_WARNING: u8 = 0x04;
const CAN_ERR_CRTL_TX_WARNING: u8 = 0x08;
const CAN_ERR_CRTL_RX_PASSIVE: u8 = 0x10;
const CAN_ERR_CRTL_TX_PASSIVE: u8 = 0x20;

/// Fold a SocketCAN error frame into the bus status
///
/// The receive counter in `data[7]` is only valid when the frame carries the
/// counter class bit.
#[cfg_attr(not(all(feature = "socketcan", target_os = "linux")), allow(dead_code))]
fn apply_error_frame(status: &mut BusStatus, class: u32, data: &[u8]) {
    status.bus_errors = status.bus_errors.saturating_add(1);
    if class & CAN_ERR_CNT != 0 {
        if let Some(rx) = data.get(7) {
            status.rx_errors = u32::from(*rx);
        }
    }

    if class & CAN_ERR_BUSOFF != 0 {
        status.state = ControllerState::BusOff;
    } else if class & CAN_ERR_CRTL != 0 {
        let detail = data.get(1).copied().unwrap_or(0);
        if detail & (CAN_ERR_CRTL_RX_PASSIVE | CAN_ERR_CRTL_TX_PASSIVE) != 0 {
            status.state = ControllerState::ErrorPassive;
        } else if detail & (CAN_ERR_CRTL_RX_WARNING | CAN_ERR_CRTL_TX_WARNING) != 0 {
            status.state = ControllerState::ErrorWarning;
        }
    }
}

#[cfg(all(feature = "socketcan", target_os = "linux"))]
pub use self::socket::SocketCanBus;

#[cfg(all(feature = "socketcan", target_os = "linux"))]
mod socket {
    use canbox_core::bus::{BusError, BusStatus, CanBus, CanFrame, ControllerState};
    use canbox_core::profile::MAX_STANDARD_ID;
    use socketcan::{CanSocket, EmbeddedFrame, Frame, Socket, SocketOptions};

    const ENODEV: i32 = 19;
    const ENETDOWN: i32 = 100;

    /// Linux SocketCAN interface, read without blocking
    pub struct SocketCanBus {
        socket: CanSocket,
        interface: String,
        status: BusStatus,
    }

    impl SocketCanBus {
        /// Open `interface` (e.g. `can0`) with error frames enabled
        pub fn open(interface: &str) -> Result<Self, BusError> {
            let open_failed = |e: std::io::Error| BusError::OpenFailed {
                interface: interface.to_string(),
                message: e.to_string(),
            };
            let socket = CanSocket::open(interface).map_err(|e| open_failed(e.into()))?;
            socket.set_nonblocking(true).map_err(open_failed)?;
            socket.set_error_filter_accept_all().map_err(open_failed)?;
            tracing::info!("CAN interface {} open", interface);
            Ok(Self {
                socket,
                interface: interface.to_string(),
                status: BusStatus::default(),
            })
        }

        fn record_error_frame(&mut self, class: u32, data: &[u8]) {
            super::apply_error_frame(&mut self.status, class, data);
            tracing::debug!(
                "{}: error frame class {:#x}, state {:?}",
                self.interface,
                class,
                self.status.state
            );
        }
    }

    impl CanBus for SocketCanBus {
        fn poll_frame(&mut self) -> Result<Option<CanFrame>, BusError> {
            match self.socket.read_frame() {
                Ok(socketcan::CanFrame::Error(err)) => {
                    self.record_error_frame(err.raw_id(), err.data());
                    Ok(None)
                }
                Ok(frame) => {
                    let id = frame.raw_id();
                    if frame.is_extended() || frame.is_remote_frame() || id > u32::from(MAX_STANDARD_ID) {
                        return Ok(None);
                    }
                    Ok(Some(CanFrame::new(id as u16, frame.data())))
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
                Err(e) if matches!(e.raw_os_error(), Some(ENETDOWN) | Some(ENODEV)) => {
                    self.status.state = ControllerState::Disconnected;
                    Err(BusError::Disconnected)
                }
                Err(e) => Err(e.into()),
            }
        }

        fn status(&mut self) -> BusStatus {
            self.status
        }
    }
}
