//! Command dispatch
//!
//! Runs once per validated request. Dispatch never drops a frame: every
//! command that reaches this point gets a response afterwards.

use crate::{
    frame::{Command, Led, Request, LED_COUNT},
    latch::{ErrorCode, ErrorLatch},
    OutputLines,
};

/// What a dispatched request did
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `SEND_DATA`: nothing changed
    Polled,
    /// `UPDATE_OUTPUTS`: all four outputs were applied
    OutputsUpdated,
    /// `ERROR_RESET`: the latch was cleared
    ErrorCleared,
    /// Unrecognized command nibble, now latched as an error
    UnknownCommand(u8),
}

/// The output pins together with the logical state last applied to them
///
/// Writing a pin and recording its state happen in the same call, so the
/// response mirror bits always match what was driven.
#[derive(Debug)]
pub struct Actuators {
    states: [bool; LED_COUNT],
    active_low: bool,
}

impl Actuators {
    /// All outputs off. Pins are not touched until [Actuators::reset].
    pub const fn new(active_low: bool) -> Self {
        Self {
            states: [false; LED_COUNT],
            active_low,
        }
    }

    /// Drive every output to "off", so pins and mirror agree from the start
    pub fn reset<O: OutputLines>(&mut self, out: &mut O) {
        for led in Led::ALL {
            self.apply(out, led, false);
        }
    }

    /// Switch one output, updating its mirror bit
    pub fn apply<O: OutputLines>(&mut self, out: &mut O, led: Led, on: bool) {
        out.set_line(led, on != self.active_low);
        self.states[led.index()] = on;
    }

    /// Logical state of all outputs, in [Led::ALL] order
    #[inline]
    pub fn states(&self) -> [bool; LED_COUNT] {
        self.states
    }
}

/// Carry out a validated request
pub fn dispatch<O: OutputLines>(
    req: &Request,
    actuators: &mut Actuators,
    out: &mut O,
    latch: &mut ErrorLatch,
) -> Outcome {
    match req.command() {
        Command::SendData => Outcome::Polled,
        Command::UpdateOutputs => {
            for led in Led::ALL {
                actuators.apply(out, led, req.led_on(led));
            }
            Outcome::OutputsUpdated
        }
        Command::ErrorReset => {
            latch.clear();
            Outcome::ErrorCleared
        }
        Command::Unknown(raw) => {
            latch.set(ErrorCode::IncorrectCommand);
            Outcome::UnknownCommand(raw)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame::DeviceAddress;

    const ADDR: DeviceAddress = DeviceAddress::must(0x01);

    #[derive(Default)]
    struct Pins {
        levels: [Option<bool>; LED_COUNT],
        writes: usize,
    }

    impl OutputLines for Pins {
        fn set_line(&mut self, led: Led, level: bool) {
            self.levels[led.index()] = Some(level);
            self.writes += 1;
        }
    }

    #[test]
    fn poll_changes_nothing() {
        let mut act = Actuators::new(false);
        let mut pins = Pins::default();
        let mut latch = ErrorLatch::new();
        latch.set(ErrorCode::UartFrame);

        let req = Request::new(ADDR, Command::SendData, [true; LED_COUNT]);
        assert_eq!(dispatch(&req, &mut act, &mut pins, &mut latch), Outcome::Polled);
        assert_eq!(pins.writes, 0);
        assert_eq!(act.states(), [false; LED_COUNT]);
        assert_eq!(latch.get(), ErrorCode::UartFrame);
    }

    #[test]
    fn update_drives_pins_and_mirror() {
        let mut act = Actuators::new(false);
        let mut pins = Pins::default();
        let mut latch = ErrorLatch::new();

        let req = Request::new(ADDR, Command::UpdateOutputs, [true, false, true, true]);
        assert_eq!(
            dispatch(&req, &mut act, &mut pins, &mut latch),
            Outcome::OutputsUpdated
        );
        assert_eq!(act.states(), [true, false, true, true]);
        assert_eq!(
            pins.levels,
            [Some(true), Some(false), Some(true), Some(true)]
        );
    }

    #[test]
    fn active_low_inverts_pins_only() {
        let mut act = Actuators::new(true);
        let mut pins = Pins::default();
        let mut latch = ErrorLatch::new();

        let req = Request::new(ADDR, Command::UpdateOutputs, [true, false, false, false]);
        dispatch(&req, &mut act, &mut pins, &mut latch);
        assert_eq!(act.states(), [true, false, false, false]);
        assert_eq!(
            pins.levels,
            [Some(false), Some(true), Some(true), Some(true)]
        );
    }

    #[test]
    fn reset_turns_everything_off() {
        let mut act = Actuators::new(true);
        let mut pins = Pins::default();
        act.reset(&mut pins);
        assert_eq!(pins.levels, [Some(true); LED_COUNT]);
        assert_eq!(act.states(), [false; LED_COUNT]);
    }

    #[test]
    fn error_reset_and_unknown() {
        let mut act = Actuators::new(false);
        let mut pins = Pins::default();
        let mut latch = ErrorLatch::new();

        let bad = Request::new(ADDR, Command::Unknown(0x7), [true; LED_COUNT]);
        assert_eq!(
            dispatch(&bad, &mut act, &mut pins, &mut latch),
            Outcome::UnknownCommand(0x7)
        );
        assert_eq!(latch.get(), ErrorCode::IncorrectCommand);
        assert_eq!(pins.writes, 0);

        let reset = Request::new(ADDR, Command::ErrorReset, [false; LED_COUNT]);
        assert_eq!(
            dispatch(&reset, &mut act, &mut pins, &mut latch),
            Outcome::ErrorCleared
        );
        assert_eq!(latch.get(), ErrorCode::None);
    }
}
