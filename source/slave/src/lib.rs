//! # Truncated RTU Slave
//!
//! This is the slave side of a small Modbus-RTU-like protocol, run over a
//! single point-to-point UART link on a microcontroller. The controller
//! sends fixed-length command frames; this device checks them, switches
//! up to four output lines, and answers with a fixed-length telemetry
//! frame.
//!
//! ## Exchange
//!
//! Every exchange is one request followed by at most one response:
//!
//! 1. The controller sends a 3-byte request: address and command nibbles,
//!    four requested output bits, and a CRC-8.
//! 2. If the address is ours AND the CRC-8 matches, the command is
//!    carried out, and an 8-byte response is sent back: temperature,
//!    voltage, output and button states, the latched error code, and a
//!    CRC-16.
//! 3. If either check fails, the frame is dropped silently. Nothing is
//!    sent, nothing is latched.
//!
//! Unknown commands in an otherwise valid frame ARE answered, with the
//! "incorrect command" error code latched.
//!
//! See [frame] for the exact bit layouts.
//!
//! ## Framing
//!
//! There is no delimiter and no length prefix. Reception is armed for a
//! single byte; when it arrives, the frame has started, and the remaining
//! two bytes are armed in one operation. A 1 ms tick supervises the
//! remainder: if it does not arrive within the configured budget (10 ms
//! by default), the receive is aborted and the receiver goes back to
//! waiting for a first byte.
//!
//! After every complete frame, valid or not, the receiver re-arms
//! immediately.
//!
//! ## Execution model
//!
//! Nothing here blocks, allocates, or waits. All processing happens in
//! short handlers, called from two kinds of interrupt:
//!
//! * link layer receive-complete and error notifications
//! * a periodic timer tick
//!
//! All state lives in one [Slave] value, passed by `&mut` to each entry
//! point. The handlers of one [Slave] MUST NOT preempt each other: either
//! run them at the same interrupt priority, or wrap the [Slave] in a
//! [SharedSlave] with a
//! [`CriticalSectionRawMutex`][embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex].
//!
//! ## Errors
//!
//! * Transport faults (parity, noise, framing, overrun, DMA) are reported
//!   through [Slave::on_link_fault] and latched as an error code.
//! * Protocol faults (wrong address, bad CRC) are dropped without a reply.
//! * An unknown command is latched as [ErrorCode::IncorrectCommand].
//!
//! The latched code is visible to the controller in every response, and is
//! only cleared by an `ERROR_RESET` request.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod crc;
pub mod dispatch;
pub mod frame;
pub mod latch;
pub mod receiver;
pub mod response;
pub mod shared;
pub mod slave;

pub use crate::{
    frame::{Command, DeviceAddress, Led, Request, Response},
    latch::{ErrorCode, LinkFault},
    shared::{InitError, SharedSlave},
    slave::{Slave, SlaveCfg},
};

/// An error returned by the [Slave] entry points
///
/// None of these are fatal. Either the receiver has already been re-armed,
/// or, if arming itself failed, the next [Slave::on_tick] retries it.
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub enum Error<E> {
    /// Some error from the underlying link layer driver
    Link(E),
    /// The driver delivered a different number of bytes than was armed
    Length {
        /// Bytes armed
        expected: usize,
        /// Bytes delivered
        got: usize,
    },
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Self::Link(value)
    }
}

/// A trait representing the UART/DMA driver
///
/// All methods are called from interrupt context and MUST return
/// promptly. Completion is reported back by the driver calling
/// [Slave::on_receive_complete] or [Slave::on_link_fault].
pub trait LinkLayer {
    /// The error type of the underlying driver
    type Error;

    /// Arm an interrupt driven receive of exactly `len` bytes.
    ///
    /// Once all of them have arrived, the driver passes them to
    /// [Slave::on_receive_complete]. Only called when no receive is armed:
    /// a pending one has either been delivered or cancelled through
    /// [LinkLayer::abort_receive] first.
    fn begin_receive(&mut self, len: usize) -> Result<(), Self::Error>;

    /// Start sending `frame`.
    ///
    /// The driver must copy `frame` into its own transmit storage and
    /// return without waiting for the transmission to finish.
    fn begin_transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Cancel an in-flight receive, if any.
    ///
    /// Must not affect an in-flight transmit.
    fn abort_receive(&mut self);
}

/// A trait representing the four actuator output pins
pub trait OutputLines {
    /// Drive the pin for `led` to the given electrical level
    fn set_line(&mut self, led: Led, level: bool);
}
