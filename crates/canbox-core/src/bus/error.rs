//! CAN transport errors

use thiserror::Error;

/// Errors raised by a [`CanBus`](super::CanBus) implementation
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Failed to open CAN interface {interface}: {message}")]
    OpenFailed { interface: String, message: String },

    #[error("Malformed capture line {line}: {content}")]
    MalformedCapture { line: usize, content: String },

    #[error("CAN transport disconnected")]
    Disconnected,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
