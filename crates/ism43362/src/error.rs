//! Error types for the ISM43362 driver.

use embedded_hal::{digital, spi};
use thiserror::Error;

/// Errors that can occur while talking to the module.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// A precondition failed before anything was put on the bus.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The SPI bus reported a transfer failure.
    #[error("SPI transfer failed: {0}")]
    Spi(spi::ErrorKind),

    /// A chip-select, reset or ready pin could not be driven or read.
    #[error("pin access failed: {0}")]
    Pin(digital::ErrorKind),

    /// The response did not fit; `captured` bytes were kept.
    #[error("response buffer too small: captured {captured} bytes")]
    RespBufferTooSmall {
        /// Bytes kept in the response buffer.
        captured: usize,
    },

    /// The response did not contain the `\r\nOK\r\n` terminator.
    #[error("response did not contain the OK terminator")]
    BadResponse,

    /// The response had the terminator but a field did not match its grammar.
    #[error("malformed response: bad {field}")]
    Malformed {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The module did not print the expected boot banner after reset.
    #[error("wrong boot banner after reset")]
    WrongInitMsg,

    /// A received packet was larger than the caller's buffer.
    #[error("packet of {received} bytes truncated to {copied}")]
    PacketBufferTooSmall {
        /// Payload bytes reported by the module.
        received: usize,
        /// Bytes copied into the caller's buffer.
        copied: usize,
    },

    /// A bounded ready wait gave up.
    #[error("module did not signal ready after {polls} polls")]
    ReadyTimeout {
        /// Number of polls performed.
        polls: u32,
    },
}

impl DriverError {
    /// Collapse this error into the six-value return code taxonomy.
    pub fn code(&self) -> ReturnCode {
        match self {
            DriverError::InvalidArgument(_)
            | DriverError::Spi(_)
            | DriverError::Pin(_)
            | DriverError::ReadyTimeout { .. } => ReturnCode::Error,
            DriverError::RespBufferTooSmall { .. } => ReturnCode::RespBufferTooSmall,
            DriverError::BadResponse | DriverError::Malformed { .. } => ReturnCode::BadResponse,
            DriverError::WrongInitMsg => ReturnCode::WrongInitMsg,
            DriverError::PacketBufferTooSmall { .. } => ReturnCode::PacketBufferTooSmall,
        }
    }

    /// Whether the caller still received usable (truncated) data.
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            DriverError::RespBufferTooSmall { .. } | DriverError::PacketBufferTooSmall { .. }
        )
    }

    pub(crate) fn spi<E: spi::Error>(err: E) -> Self {
        DriverError::Spi(err.kind())
    }

    pub(crate) fn pin<E: digital::Error>(err: E) -> Self {
        DriverError::Pin(err.kind())
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Outcome of a driver operation, as a closed set of codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    /// Operation succeeded.
    Ok,
    /// Precondition, validation or bus failure.
    Error,
    /// The response buffer filled before the module stopped sending.
    RespBufferTooSmall,
    /// The terminator was missing or the response was badly formatted.
    BadResponse,
    /// The boot banner did not match after reset.
    WrongInitMsg,
    /// A received payload was truncated to the caller's buffer.
    PacketBufferTooSmall,
}

impl ReturnCode {
    /// Code for the outcome of any driver operation.
    pub fn of<T>(result: &DriverResult<T>) -> ReturnCode {
        match result {
            Ok(_) => ReturnCode::Ok,
            Err(err) => err.code(),
        }
    }

    /// Whether this is the success code.
    pub fn is_ok(&self) -> bool {
        matches!(self, ReturnCode::Ok)
    }
}

impl core::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReturnCode::Ok => write!(f, "OK"),
            ReturnCode::Error => write!(f, "generic error"),
            ReturnCode::RespBufferTooSmall => write!(f, "response buffer is too small"),
            ReturnCode::BadResponse => {
                write!(f, "response didn't contain OK string or badly formatted")
            }
            ReturnCode::WrongInitMsg => write!(f, "didn't get initial cursor"),
            ReturnCode::PacketBufferTooSmall => write!(f, "packet received too large for buffer"),
        }
    }
}

impl From<&DriverError> for ReturnCode {
    fn from(err: &DriverError) -> Self {
        err.code()
    }
}

impl From<DriverError> for ReturnCode {
    fn from(err: DriverError) -> Self {
        err.code()
    }
}
