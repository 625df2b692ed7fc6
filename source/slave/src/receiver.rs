//! Frame receiver
//!
//! Reception is split into two arms. First a single byte is requested;
//! its arrival is the start-of-frame signal. Then the remaining bytes are
//! requested in one go. There is no delimiter and no length prefix, so
//! the only other way back to the start-of-frame point is the timeout
//! supervisor, which gives up on a frame whose remainder never shows up.
//!
//! This type only tracks the cursor, the buffer, the timeout counter, and
//! whether a receive is currently armed at the link layer. Arming and
//! aborting the link layer is done by [`Slave`][crate::Slave], based on
//! what the methods here return.

use crate::frame::{Request, REQUEST_LEN};

/// Where the receiver is within a frame
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Waiting for the first byte of a new frame. The line may stay idle
    /// here forever.
    WaitFirstByte,
    /// The first byte arrived, the rest of the frame is armed.
    Remainder,
}

/// What to do after bytes were accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Arm the link layer for this many more bytes
    Arm(usize),
    /// The buffer holds a complete (not yet validated) frame
    Complete(Request),
}

/// The link layer delivered a different number of bytes than was armed
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnexpectedLength {
    /// Bytes armed
    pub expected: usize,
    /// Bytes delivered
    pub got: usize,
}

/// Reception cursor, request buffer and timeout counter
#[derive(Debug)]
pub struct Receiver {
    state: RxState,
    buf: [u8; REQUEST_LEN],
    elapsed: u16,
    timeout_ticks: u16,
    armed: bool,
}

impl Receiver {
    /// Create a receiver that gives up on a frame after `timeout_ticks`
    /// ticks in [RxState::Remainder]. Zero is treated as one.
    pub const fn new(timeout_ticks: u16) -> Self {
        Self {
            state: RxState::WaitFirstByte,
            buf: [0u8; REQUEST_LEN],
            elapsed: 0,
            timeout_ticks: if timeout_ticks == 0 { 1 } else { timeout_ticks },
            armed: false,
        }
    }

    /// Go back to the start-of-frame point.
    ///
    /// Clears the buffer and the timeout counter. Returns how many bytes
    /// the link layer must be armed for.
    pub fn restart(&mut self) -> usize {
        self.buf = [0u8; REQUEST_LEN];
        self.state = RxState::WaitFirstByte;
        self.elapsed = 0;
        self.expected()
    }

    /// Number of bytes the current arm is waiting for
    pub fn expected(&self) -> usize {
        match self.state {
            RxState::WaitFirstByte => 1,
            RxState::Remainder => REQUEST_LEN - 1,
        }
    }

    /// Record whether the link layer currently holds an armed receive
    #[inline]
    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    /// Whether the link layer currently holds an armed receive
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Take bytes delivered by the link layer
    ///
    /// A delivery always completes the armed receive. On a length mismatch
    /// nothing is stored; the caller is expected to
    /// [restart][Receiver::restart].
    pub fn accept(&mut self, data: &[u8]) -> Result<Step, UnexpectedLength> {
        self.armed = false;
        let expected = self.expected();
        if data.len() != expected {
            return Err(UnexpectedLength {
                expected,
                got: data.len(),
            });
        }
        match self.state {
            RxState::WaitFirstByte => {
                self.buf[0] = data[0];
                self.state = RxState::Remainder;
                self.elapsed = 0;
                Ok(Step::Arm(self.expected()))
            }
            RxState::Remainder => {
                self.buf[1..].copy_from_slice(data);
                Ok(Step::Complete(Request::from_bytes(self.buf)))
            }
        }
    }

    /// Advance the timeout supervisor by one tick.
    ///
    /// Returns `true` when the caller must resynchronize: either the
    /// in-flight frame has run out of time, or nothing is armed at the
    /// link layer (a previous arm failed) and arming must be retried.
    pub fn tick(&mut self) -> bool {
        if !self.armed {
            self.elapsed = 0;
            return true;
        }
        match self.state {
            RxState::WaitFirstByte => {
                self.elapsed = 0;
                false
            }
            RxState::Remainder => {
                self.elapsed = self.elapsed.saturating_add(1);
                if self.elapsed >= self.timeout_ticks {
                    self.elapsed = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Current cursor position
    #[inline]
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Ticks spent in the current frame so far
    #[inline]
    pub fn elapsed(&self) -> u16 {
        self.elapsed
    }

    /// Configured time budget, in ticks
    #[inline]
    pub fn timeout_ticks(&self) -> u16 {
        self.timeout_ticks
    }
}
