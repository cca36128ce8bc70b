//! ISM43362 WiFi Module Driver
//!
//! This crate drives an Inventek ISM43362 WiFi module over SPI using the
//! module's AT command set. It is `no_std` (with `alloc`) and written against
//! the `embedded-hal` 1.0 traits, so it runs on any board that provides a
//! 16-bit SPI bus, two output pins and an input pin wired to the module's
//! data-ready line.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → module): ASCII lines such as `C1=<ssid>\r\n`,
//!   clocked out as 16-bit words. Odd-length commands are padded with `'\n'`.
//! - **Handshake**: the module raises its ready line once it has a response;
//!   the board's interrupt handler raises a [`ReadySignal`].
//! - **Responses** (module → host): read word by word for as long as the
//!   ready line stays high. Success is the presence of `\r\nOK\r\n`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ism43362::{Ism43362, JoinWifiConfig, ReadySignal, SecurityMode};
//!
//! static MODULE_READY: ReadySignal = ReadySignal::new();
//!
//! let mut wifi = Ism43362::new(spi, cs, reset, ready_line, delay, &MODULE_READY);
//! wifi.reset()?;
//! wifi.join_network(&JoinWifiConfig::new("lab-ap", "secret", SecurityMode::Wpa2))?;
//! wifi.send(b"hello")?;
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod commands;
pub mod decoder;
mod engine;
mod error;
pub mod framer;
mod ready;
mod response;
mod types;
mod wifi;

pub use commands::*;
pub use engine::*;
pub use error::*;
pub use ready::*;
pub use response::*;
pub use types::*;
pub use wifi::*;
