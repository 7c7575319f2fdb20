/*!
Error handling for the QKD post-processing engine.

Every failure that ends a run surfaces as an [`Error`]. Policy outcomes
(QBER above threshold, verification mismatch, zero-length key) are not
errors; they are reported through `QkdResult`.
*/

use std::io;
use thiserror::Error;

/// Result type for the QKD protocol
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the QKD protocol
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from the underlying transport
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Authentication tag failure or malformed envelope (limited details)
    #[error("Message integrity check failed")]
    Integrity(#[source] IntegrityError),

    /// Unexpected message at this point of the exchange
    #[error("Protocol desynchronized: expected {expected}, but got {actual}")]
    ProtocolDesync {
        expected: String,
        actual: String,
    },

    /// Caller or internal contract broken (bad index, empty block, wrong seed length)
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Peer closed the transport
    #[error("Transport closed by peer")]
    TransportClosed,

    /// Unsupported frame version
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Timeout error
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),
}

/// Integrity errors with limited details to avoid helping an attacker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Tag did not verify
    #[error("Authentication tag mismatch")]
    TagMismatch,

    /// Envelope or payload could not be decoded
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
}

impl Error {
    /// Whether the error came from a tampered or corrupted message
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Integrity(_))
    }

    /// Whether the error is a desynchronized exchange
    pub fn is_desync(&self) -> bool {
        matches!(self, Error::ProtocolDesync { .. })
    }

    /// Whether the error is a broken contract
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::ContractViolation(_))
    }
}

/// Create a contract violation error
#[macro_export]
macro_rules! contract_err {
    ($msg:expr) => {
        Err($crate::core::error::Error::ContractViolation($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        Err($crate::core::error::Error::ContractViolation(format!($fmt, $($arg)*)))
    };
}

/// Create a protocol desync error
#[macro_export]
macro_rules! desync_err {
    ($expected:expr, $actual:expr) => {
        Err($crate::core::error::Error::ProtocolDesync {
            expected: $expected.to_string(),
            actual: $actual.to_string(),
        })
    };
}

/// Create an integrity error
#[macro_export]
macro_rules! integrity_err {
    ($err:expr) => {
        Err($crate::core::error::Error::Integrity($err))
    };
}

/// Create a malformed envelope error
pub(crate) fn malformed<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::Integrity(IntegrityError::MalformedEnvelope(msg.into())))
}

/// Convert from Error to io::Error (for compatibility)
impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Io(io_error) => io_error,
            Error::Integrity(_) => {
                io::Error::new(io::ErrorKind::PermissionDenied, "Integrity error")
            }
            Error::ProtocolDesync { expected, actual } => io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Protocol desynchronized: expected {}, but got {}", expected, actual),
            ),
            Error::ContractViolation(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            Error::InvalidConfig(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            Error::TransportClosed => {
                io::Error::new(io::ErrorKind::ConnectionAborted, "Transport closed by peer")
            }
            Error::UnsupportedVersion(ver) => io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported protocol version: {}", ver),
            ),
            Error::Timeout(ms) => io::Error::new(
                io::ErrorKind::TimedOut,
                format!("Operation timed out after {} ms", ms),
            ),
        }
    }
}
