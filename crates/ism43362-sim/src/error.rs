//! Faults raised by the simulated bus and pins.

use embedded_hal::{digital, spi};
use thiserror::Error;

/// Failure injected into the simulated hardware.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    /// An SPI transfer was made to fail.
    #[error("injected SPI fault")]
    Bus,
    /// A pin access was made to fail.
    #[error("injected pin fault")]
    Pin,
}

impl spi::Error for SimFault {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

impl digital::Error for SimFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}
