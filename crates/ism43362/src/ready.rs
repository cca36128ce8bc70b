//! Ready signal shared between the ready-line interrupt and the driver.
//!
//! The module raises its ready line when it has accepted a command and has a
//! response waiting. The board's edge interrupt calls [`ReadySignal::raise`];
//! the driver consumes the flag from the polling context. The flag holds a
//! single bit: two assertions before one consumption collapse into one.
//!
//! ```rust,ignore
//! static MODULE_READY: ReadySignal = ReadySignal::new();
//!
//! #[interrupt]
//! fn EXTI1() {
//!     MODULE_READY.raise();
//! }
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::{DriverError, DriverResult};

/// Single-bit ready flag, written from interrupt context.
#[derive(Debug, Default)]
pub struct ReadySignal {
    raised: AtomicBool,
}

impl ReadySignal {
    /// Create a cleared signal. Usable in a `static`.
    pub const fn new() -> Self {
        ReadySignal {
            raised: AtomicBool::new(false),
        }
    }

    /// Set the flag. Called from the ready-line interrupt handler.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Whether the flag is currently set.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Drop any pending assertion.
    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }

    /// Consume the flag: returns true and clears it if it was set.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }
}

/// Strategy for blocking until the module signals ready.
///
/// Implementations must return only after consuming exactly one assertion
/// of the signal (or failing).
pub trait WaitReady {
    /// Block until `signal` is raised, then clear it.
    fn wait(&mut self, signal: &ReadySignal) -> DriverResult<()>;
}

/// Busy-poll with no timeout.
///
/// This is the default. If the module never raises its ready line the
/// calling context blocks forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinWait;

impl WaitReady for SpinWait {
    fn wait(&mut self, signal: &ReadySignal) -> DriverResult<()> {
        while !signal.take() {
            core::hint::spin_loop();
        }
        Ok(())
    }
}

/// Busy-poll at most `max_polls` times before giving up.
#[derive(Debug, Clone, Copy)]
pub struct BoundedSpin {
    max_polls: u32,
}

impl BoundedSpin {
    /// Create a bounded wait that polls the flag at most `max_polls` times.
    pub fn new(max_polls: u32) -> Self {
        BoundedSpin { max_polls }
    }

    /// Get the poll budget.
    pub fn max_polls(&self) -> u32 {
        self.max_polls
    }
}

impl WaitReady for BoundedSpin {
    fn wait(&mut self, signal: &ReadySignal) -> DriverResult<()> {
        for _ in 0..self.max_polls {
            if signal.take() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(DriverError::ReadyTimeout {
            polls: self.max_polls,
        })
    }
}
