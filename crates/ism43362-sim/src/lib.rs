//! Simulated ISM43362 Module
//!
//! A host-side stand-in for the WiFi module that implements the
//! `embedded-hal` bus, pin and delay traits the driver consumes. It runs the
//! driver against a command interpreter instead of hardware, records what
//! went over the wire and can be scripted to fail, stay silent or misbehave.
//!
//! # Behaviour
//!
//! - Bytes written while chip-select is low form one command window. When
//!   chip-select is released the window is interpreted, the response is
//!   queued and the ready signal is raised.
//! - The ready line reads high while queued response bytes remain. Responses
//!   of odd length are completed with the 0x15 fill byte.
//! - Releasing reset queues the boot banner.
//! - Delays are recorded, never slept.
//!
//! # Example
//!
//! ```rust,ignore
//! use ism43362_sim::SimModule;
//!
//! let sim = SimModule::new();
//! let mut wifi = sim.driver();
//! wifi.reset()?;
//! wifi.send(b"ping")?;
//! assert_eq!(sim.sent_payloads(), vec![b"ping".to_vec()]);
//! ```

mod error;
mod firmware;

pub use error::*;
pub use firmware::*;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};
use ism43362::framer::{self, RESPONSE_FILL_BYTE, WORD_SIZE};
use ism43362::{Ism43362, ReadySignal, BOOT_BANNER};
use tracing::{debug, trace};

/// Driver type wired to a [`SimModule`].
pub type SimDriver<'a> = Ism43362<'a, SimSpi, SimChipSelect, SimReset, SimReadyLine, SimDelay>;

/// Shared state behind all the simulated peripherals.
#[derive(Debug)]
struct SimState {
    firmware: Firmware,
    selected: bool,
    window: Vec<u8>,
    outbound: VecDeque<u8>,
    reset_held: bool,
    banner: Vec<u8>,
    silent: bool,
    raise_on_write: bool,
    spi_fault: bool,
    ready_line_fault: bool,
    wire_log: Vec<Vec<u8>>,
    commands: Vec<String>,
    delays_ns: Vec<u64>,
}

impl SimState {
    fn new() -> Self {
        SimState {
            firmware: Firmware::new(),
            selected: false,
            window: Vec::new(),
            outbound: VecDeque::new(),
            reset_held: false,
            banner: BOOT_BANNER.to_vec(),
            silent: false,
            raise_on_write: false,
            spi_fault: false,
            ready_line_fault: false,
            wire_log: Vec::new(),
            commands: Vec::new(),
            delays_ns: Vec::new(),
        }
    }

    fn queue_response(&mut self, mut response: Vec<u8>) {
        if response.len() % WORD_SIZE == 1 {
            response.push(RESPONSE_FILL_BYTE);
        }
        // A new response replaces anything the host left unread.
        self.outbound.clear();
        self.outbound.extend(response);
    }

    /// Interpret the command window closed by releasing chip-select.
    ///
    /// Returns whether the ready signal should be raised.
    fn close_window(&mut self) -> bool {
        if self.window.is_empty() {
            return false;
        }
        let window = std::mem::take(&mut self.window);
        trace!("SimModule: window {:?}", window.escape_ascii().to_string());
        let command = ParsedCommand::parse(&window);
        self.wire_log.push(window);
        self.commands.push(command.head.clone());

        let response = self.firmware.handle(&command);
        self.queue_response(response);
        !self.silent
    }

    fn take_spi_fault(&mut self) -> Result<(), SimFault> {
        if std::mem::take(&mut self.spi_fault) {
            return Err(SimFault::Bus);
        }
        Ok(())
    }
}

/// A simulated module and the handles to script and inspect it.
#[derive(Debug, Clone)]
pub struct SimModule {
    state: Rc<RefCell<SimState>>,
    ready: Rc<ReadySignal>,
}

impl Default for SimModule {
    fn default() -> Self {
        Self::new()
    }
}

impl SimModule {
    /// Create a module that answers every command with OK.
    pub fn new() -> Self {
        SimModule {
            state: Rc::new(RefCell::new(SimState::new())),
            ready: Rc::new(ReadySignal::new()),
        }
    }

    /// The signal the simulated ready interrupt raises.
    pub fn ready_signal(&self) -> &ReadySignal {
        &self.ready
    }

    /// Build a driver wired to this module.
    pub fn driver(&self) -> SimDriver<'_> {
        Ism43362::new(
            SimSpi {
                state: Rc::clone(&self.state),
                ready: Rc::clone(&self.ready),
            },
            SimChipSelect {
                state: Rc::clone(&self.state),
                ready: Rc::clone(&self.ready),
            },
            SimReset {
                state: Rc::clone(&self.state),
                ready: Rc::clone(&self.ready),
            },
            SimReadyLine {
                state: Rc::clone(&self.state),
            },
            SimDelay {
                state: Rc::clone(&self.state),
            },
            &self.ready,
        )
    }

    // ========================================================================
    // Scripting
    // ========================================================================

    /// Answer `response` verbatim to a command head (`C1=lab`) or code (`C1`).
    pub fn respond_to(&self, command: &str, response: &[u8]) {
        self.state.borrow_mut().firmware.respond_to(command, response);
    }

    /// Make a command head or code fail with an error response.
    pub fn fail_on(&self, command: &str) {
        self.state.borrow_mut().firmware.fail_on(command);
    }

    /// Replace the bytes printed after reset.
    pub fn set_banner(&self, banner: &[u8]) {
        self.state.borrow_mut().banner = banner.to_vec();
    }

    /// Stop raising the ready signal after commands.
    pub fn set_silent(&self, silent: bool) {
        self.state.borrow_mut().silent = silent;
    }

    /// Raise the ready signal on every written word, as a glitching line would.
    pub fn raise_on_write(&self, enabled: bool) {
        self.state.borrow_mut().raise_on_write = enabled;
    }

    /// Queue a payload for the next data read.
    pub fn push_inbound(&self, data: &[u8]) {
        self.state.borrow_mut().firmware.push_inbound(data);
    }

    /// Queue an accepted TCP client for the next message poll.
    pub fn accept_connection(&self, ip: Ipv4Addr, port: u16) {
        self.state.borrow_mut().firmware.accept_connection(ip, port);
    }

    /// Fail the next SPI transfer.
    pub fn inject_spi_fault(&self) {
        self.state.borrow_mut().spi_fault = true;
    }

    /// Fail the next read of the ready line.
    pub fn inject_ready_line_fault(&self) {
        self.state.borrow_mut().ready_line_fault = true;
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Command heads in the order they were received.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    /// Raw bytes of every command window, padding included.
    pub fn wire_log(&self) -> Vec<Vec<u8>> {
        self.state.borrow().wire_log.clone()
    }

    /// Payloads received through data sends.
    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        self.state.borrow().firmware.sent_payloads().to_vec()
    }

    /// Value last written for a setting code such as `C1`.
    pub fn setting(&self, code: &str) -> Option<String> {
        self.state.borrow().firmware.setting(code).map(str::to_string)
    }

    /// Whether the module has joined a network since its last reset.
    pub fn is_connected(&self) -> bool {
        self.state.borrow().firmware.is_connected()
    }

    /// Every delay requested by the driver, in nanoseconds.
    pub fn delays(&self) -> Vec<u64> {
        self.state.borrow().delays_ns.clone()
    }

    /// Whether chip-select is currently asserted.
    pub fn is_selected(&self) -> bool {
        self.state.borrow().selected
    }

    /// Response bytes not yet read by the host.
    pub fn pending_bytes(&self) -> usize {
        self.state.borrow().outbound.len()
    }
}

// ============================================================================
// SPI bus
// ============================================================================

/// Simulated 16-bit SPI bus.
#[derive(Debug)]
pub struct SimSpi {
    state: Rc<RefCell<SimState>>,
    ready: Rc<ReadySignal>,
}

impl SimSpi {
    fn write_words(&mut self, words: &[u16]) -> Result<(), SimFault> {
        let mut state = self.state.borrow_mut();
        state.take_spi_fault()?;
        for &word in words {
            if state.selected {
                state.window.extend_from_slice(&framer::bytes_from_word(word));
            }
            if state.raise_on_write {
                self.ready.raise();
            }
        }
        Ok(())
    }

    fn read_words(&mut self, words: &mut [u16]) -> Result<(), SimFault> {
        let mut state = self.state.borrow_mut();
        state.take_spi_fault()?;
        for word in words.iter_mut() {
            let first = state.outbound.pop_front().unwrap_or(RESPONSE_FILL_BYTE);
            let second = state.outbound.pop_front().unwrap_or(RESPONSE_FILL_BYTE);
            *word = framer::word_from_bytes([first, second]);
        }
        Ok(())
    }
}

impl spi::ErrorType for SimSpi {
    type Error = SimFault;
}

impl SpiBus<u16> for SimSpi {
    fn read(&mut self, words: &mut [u16]) -> Result<(), Self::Error> {
        self.read_words(words)
    }

    fn write(&mut self, words: &[u16]) -> Result<(), Self::Error> {
        self.write_words(words)
    }

    fn transfer(&mut self, read: &mut [u16], write: &[u16]) -> Result<(), Self::Error> {
        self.write_words(write)?;
        self.read_words(read)
    }

    fn transfer_in_place(&mut self, words: &mut [u16]) -> Result<(), Self::Error> {
        self.write_words(words)?;
        self.read_words(words)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ============================================================================
// Pins
// ============================================================================

/// Simulated chip-select line, active low.
#[derive(Debug)]
pub struct SimChipSelect {
    state: Rc<RefCell<SimState>>,
    ready: Rc<ReadySignal>,
}

impl digital::ErrorType for SimChipSelect {
    type Error = Infallible;
}

impl OutputPin for SimChipSelect {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().selected = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let was_selected = std::mem::replace(&mut state.selected, false);
        if was_selected && state.close_window() {
            self.ready.raise();
        }
        Ok(())
    }
}

/// Simulated reset line, active low.
#[derive(Debug)]
pub struct SimReset {
    state: Rc<RefCell<SimState>>,
    ready: Rc<ReadySignal>,
}

impl digital::ErrorType for SimReset {
    type Error = Infallible;
}

impl OutputPin for SimReset {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.reset_held = true;
        state.outbound.clear();
        state.window.clear();
        state.firmware.reboot();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if std::mem::replace(&mut state.reset_held, false) {
            debug!("SimModule: booted");
            state.outbound = state.banner.iter().copied().collect();
            self.ready.raise();
        }
        Ok(())
    }
}

/// Simulated data-ready line, high while response bytes are queued.
#[derive(Debug)]
pub struct SimReadyLine {
    state: Rc<RefCell<SimState>>,
}

impl digital::ErrorType for SimReadyLine {
    type Error = SimFault;
}

impl InputPin for SimReadyLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut state = self.state.borrow_mut();
        if std::mem::take(&mut state.ready_line_fault) {
            return Err(SimFault::Pin);
        }
        Ok(!state.outbound.is_empty())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

// ============================================================================
// Delay
// ============================================================================

/// Delay provider that records requests instead of sleeping.
#[derive(Debug)]
pub struct SimDelay {
    state: Rc<RefCell<SimState>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.state.borrow_mut().delays_ns.push(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.state.borrow_mut().delays_ns.push(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.state.borrow_mut().delays_ns.push(u64::from(ms) * 1_000_000);
    }
}
