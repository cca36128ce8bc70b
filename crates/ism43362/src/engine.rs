//! Command transaction engine.
//!
//! One transaction is a write phase, a ready handshake and a read phase:
//!
//! 1. Assert chip-select, clock out the framed command, clear the ready
//!    flag, release chip-select.
//! 2. Block until the ready interrupt fires once, consuming the flag.
//! 3. Assert chip-select and read words for as long as the ready line stays
//!    high, stopping early if the response buffer is full.
//!
//! The engine is not reentrant. It owns the bus and pins, so the borrow
//! checker serializes transactions; sharing it across contexts requires an
//! external lock.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use log::{debug, trace, warn};

use crate::commands::Command;
use crate::error::{DriverError, DriverResult};
use crate::framer::{self, WORD_SIZE};
use crate::ready::{ReadySignal, SpinWait, WaitReady};
use crate::response::CommandResponse;

/// Bytes the module prints once it has booted: two fill bytes and a prompt.
pub const BOOT_BANNER: [u8; 6] = [0x15, 0x15, b'\r', b'\n', b'>', b' '];

/// Response capacity used for mode switches.
pub(crate) const MODE_RESPONSE_CAPACITY: usize = 100;

/// Delays applied around resets and transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// How long the reset line is held low, in milliseconds.
    pub reset_hold_ms: u32,
    /// How long to wait for the module to boot after reset, in milliseconds.
    pub reset_settle_ms: u32,
    /// Pause after every transaction, in microseconds.
    pub settle_delay_us: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            reset_hold_ms: 50,
            reset_settle_ms: 500,
            settle_delay_us: 1000,
        }
    }
}

/// What the driver knows about the module's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleMode {
    /// Not reset yet, or the last reset failed.
    #[default]
    Uninitialized,
    /// Booted and accepting commands.
    CommandReady,
    /// Joined a network.
    Connected,
}

/// Driver for one ISM43362 module.
///
/// - `SPI`: the bus, in 16-bit word mode
/// - `CS`: chip-select, active low
/// - `RST`: reset, active low
/// - `RDY`: the module's data-ready line
/// - `D`: delay provider
/// - `W`: how to wait for the ready interrupt
pub struct Ism43362<'a, SPI, CS, RST, RDY, D, W = SpinWait> {
    pub(crate) spi: SPI,
    pub(crate) cs: CS,
    pub(crate) reset_pin: RST,
    pub(crate) ready_line: RDY,
    pub(crate) delay: D,
    pub(crate) ready: &'a ReadySignal,
    pub(crate) waiter: W,
    pub(crate) timing: TimingConfig,
    pub(crate) mode: ModuleMode,
}

impl<'a, SPI, CS, RST, RDY, D> Ism43362<'a, SPI, CS, RST, RDY, D, SpinWait>
where
    SPI: SpiBus<u16>,
    CS: OutputPin,
    RST: OutputPin,
    RDY: InputPin,
    D: DelayNs,
{
    /// Create a driver that waits for the ready interrupt without a timeout.
    ///
    /// `ready` must be the signal raised by the ready line's interrupt.
    pub fn new(spi: SPI, cs: CS, reset_pin: RST, ready_line: RDY, delay: D, ready: &'a ReadySignal) -> Self {
        Ism43362 {
            spi,
            cs,
            reset_pin,
            ready_line,
            delay,
            ready,
            waiter: SpinWait,
            timing: TimingConfig::default(),
            mode: ModuleMode::Uninitialized,
        }
    }
}

impl<'a, SPI, CS, RST, RDY, D, W> Ism43362<'a, SPI, CS, RST, RDY, D, W>
where
    SPI: SpiBus<u16>,
    CS: OutputPin,
    RST: OutputPin,
    RDY: InputPin,
    D: DelayNs,
    W: WaitReady,
{
    /// Replace the ready wait strategy, e.g. with a [`crate::BoundedSpin`].
    pub fn with_waiter<W2: WaitReady>(self, waiter: W2) -> Ism43362<'a, SPI, CS, RST, RDY, D, W2> {
        Ism43362 {
            spi: self.spi,
            cs: self.cs,
            reset_pin: self.reset_pin,
            ready_line: self.ready_line,
            delay: self.delay,
            ready: self.ready,
            waiter,
            timing: self.timing,
            mode: self.mode,
        }
    }

    /// Replace the reset and settle timings.
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Get the timings in use.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Get the tracked module state.
    pub fn mode(&self) -> ModuleMode {
        self.mode
    }

    /// Give back the bus, pins and delay.
    pub fn release(self) -> (SPI, CS, RST, RDY, D) {
        (self.spi, self.cs, self.reset_pin, self.ready_line, self.delay)
    }

    // ========================================================================
    // Reset and modes
    // ========================================================================

    /// Hardware-reset the module and check its boot banner.
    ///
    /// Pulses reset low, waits for the module to boot, then reads at most
    /// [`BOOT_BANNER`]`.len()` bytes while the ready line is high. Any
    /// mismatch, or more bytes than the banner, is [`DriverError::WrongInitMsg`].
    pub fn reset(&mut self) -> DriverResult<()> {
        self.reset_pin.set_low().map_err(DriverError::pin)?;
        self.delay.delay_ms(self.timing.reset_hold_ms);
        self.reset_pin.set_high().map_err(DriverError::pin)?;
        self.delay.delay_ms(self.timing.reset_settle_ms);

        let mut banner = [0u8; BOOT_BANNER.len()];
        self.select()?;
        let read = self.read_banner(&mut banner);
        let deselected = self.deselect();
        self.ready.clear();
        let overflow = read?;
        deselected?;

        if overflow || banner != BOOT_BANNER {
            warn!("ism43362: unexpected boot banner {:02x?} (overflow: {})", banner, overflow);
            self.mode = ModuleMode::Uninitialized;
            return Err(DriverError::WrongInitMsg);
        }

        debug!("ism43362: module ready");
        self.mode = ModuleMode::CommandReady;
        Ok(())
    }

    /// Returns whether the module kept sending past the banner length.
    fn read_banner(&mut self, banner: &mut [u8; BOOT_BANNER.len()]) -> DriverResult<bool> {
        let mut read = 0;
        while self.ready_line.is_high().map_err(DriverError::pin)? {
            if read >= banner.len() {
                return Ok(true);
            }
            let word = self.read_word()?;
            banner[read..read + WORD_SIZE].copy_from_slice(&word);
            read += WORD_SIZE;
        }
        Ok(false)
    }

    /// Switch the module to command mode (`$$$`).
    pub fn enter_command_mode(&mut self) -> DriverResult<()> {
        let mut response = CommandResponse::<MODE_RESPONSE_CAPACITY>::new();
        self.execute(&Command::EnterCommandMode, &mut response)
    }

    /// Switch the module to machine mode (`---`).
    pub fn enter_machine_mode(&mut self) -> DriverResult<()> {
        let mut response = CommandResponse::<MODE_RESPONSE_CAPACITY>::new();
        self.execute(&Command::EnterMachineMode, &mut response)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Send a text command and capture the response.
    pub fn execute_text_command<const N: usize>(
        &mut self,
        text: &str,
        response: &mut CommandResponse<N>,
    ) -> DriverResult<()> {
        self.transact(text.as_bytes(), response)
    }

    /// Encode and run a [`Command`].
    pub fn execute<const N: usize>(
        &mut self,
        command: &Command<'_>,
        response: &mut CommandResponse<N>,
    ) -> DriverResult<()> {
        debug!("ism43362: {}", command.to_command_string());
        self.transact(&command.encode(), response)
    }

    /// Run one full command/response exchange.
    ///
    /// The response buffer always ends up NUL-terminated at the captured
    /// length. The outcome is, in order of precedence:
    ///
    /// - [`DriverError::RespBufferTooSmall`] if the buffer filled while the
    ///   module was still sending (the captured bytes are kept);
    /// - [`DriverError::BadResponse`] if `\r\nOK\r\n` was not captured;
    /// - `Ok(())` otherwise.
    ///
    /// Blocks until the ready interrupt fires; with the default
    /// [`SpinWait`] this never times out.
    pub fn transact<const N: usize>(
        &mut self,
        command: &[u8],
        response: &mut CommandResponse<N>,
    ) -> DriverResult<()> {
        if command.is_empty() {
            return Err(DriverError::InvalidArgument("empty command"));
        }
        response.clear();
        trace!("ism43362: tx {:02x?}", command);

        self.write_phase(command)?;
        self.waiter.wait(self.ready)?;
        let buffer_full = self.read_phase(response);
        response.terminate();
        self.delay.delay_us(self.timing.settle_delay_us);
        let buffer_full = buffer_full?;

        trace!("ism43362: rx {:02x?}", response.as_bytes());
        if buffer_full {
            debug!("ism43362: response truncated at {} bytes", response.len());
            return Err(DriverError::RespBufferTooSmall {
                captured: response.len(),
            });
        }
        if !response.contains_ok() {
            debug!("ism43362: response without OK terminator");
            return Err(DriverError::BadResponse);
        }
        Ok(())
    }

    fn write_phase(&mut self, command: &[u8]) -> DriverResult<()> {
        self.select()?;
        let sent = self.write_command(command);
        // Writing can itself pulse the ready line; only a later assertion
        // means the response is waiting.
        self.ready.clear();
        let deselected = self.deselect();
        sent?;
        deselected
    }

    fn write_command(&mut self, command: &[u8]) -> DriverResult<()> {
        for word in framer::body_words(command) {
            self.spi.write(&[word]).map_err(DriverError::spi)?;
        }
        if let Some(pad) = framer::padding_word(command) {
            self.spi.write(&[pad]).map_err(DriverError::spi)?;
        }
        self.spi.flush().map_err(DriverError::spi)
    }

    /// Returns whether reading stopped because the buffer was full.
    fn read_phase<const N: usize>(&mut self, response: &mut CommandResponse<N>) -> DriverResult<bool> {
        self.select()?;
        let drained = self.drain_into(response);
        let deselected = self.deselect();
        let full = drained?;
        deselected?;
        Ok(full)
    }

    fn drain_into<const N: usize>(&mut self, response: &mut CommandResponse<N>) -> DriverResult<bool> {
        while self.ready_line.is_high().map_err(DriverError::pin)? {
            if !response.has_room_for_word() {
                return Ok(true);
            }
            let word = self.read_word()?;
            response.push_word(word);
        }
        Ok(false)
    }

    fn read_word(&mut self) -> DriverResult<[u8; WORD_SIZE]> {
        let mut word = [0u16; 1];
        self.spi.read(&mut word).map_err(DriverError::spi)?;
        Ok(framer::bytes_from_word(word[0]))
    }

    fn select(&mut self) -> DriverResult<()> {
        self.cs.set_low().map_err(DriverError::pin)
    }

    fn deselect(&mut self) -> DriverResult<()> {
        self.cs.set_high().map_err(DriverError::pin)
    }
}
