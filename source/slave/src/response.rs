//! Response builder and telemetry staging
//!
//! Telemetry values are staged by the application whenever it likes, and
//! only read here. The response is rebuilt from scratch for every reply,
//! so it always carries the outputs and error code as they are at the
//! moment of transmission.

use crate::{
    dispatch::Actuators,
    frame::{Response, RESPONSE_LEN},
    latch::ErrorLatch,
};

/// Values staged by the application for the next response
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Telemetry {
    /// Device temperature, in whatever unit the application and the
    /// controller agree on
    pub temperature: i16,
    /// Supply voltage
    pub voltage: u16,
    /// Momentary input
    pub button1: bool,
}

impl Telemetry {
    /// All zero
    pub const fn new() -> Self {
        Self {
            temperature: 0,
            voltage: 0,
            button1: false,
        }
    }
}

/// Compose a response from the current state
pub fn compose(telemetry: &Telemetry, actuators: &Actuators, latch: &ErrorLatch) -> Response {
    Response {
        temperature: telemetry.temperature,
        voltage: telemetry.voltage,
        leds: actuators.states(),
        button1: telemetry.button1,
        error: latch.get(),
    }
}

/// Compose a response and pack it, CRC included
pub fn build(
    telemetry: &Telemetry,
    actuators: &Actuators,
    latch: &ErrorLatch,
) -> [u8; RESPONSE_LEN] {
    compose(telemetry, actuators, latch).to_bytes()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{crc::crc16, latch::ErrorCode};

    #[test]
    fn reflects_current_latch() {
        let tel = Telemetry {
            temperature: 215,
            voltage: 12_000,
            button1: true,
        };
        let act = Actuators::new(false);
        let mut latch = ErrorLatch::new();

        let first = build(&tel, &act, &latch);
        latch.set(ErrorCode::UartOverrun);
        let second = build(&tel, &act, &latch);

        assert_eq!(first[5], 0x00);
        assert_eq!(second[5], 0x04);
        assert_ne!(first[6..], second[6..]);
    }

    #[test]
    fn crc_covers_first_six_bytes() {
        let tel = Telemetry {
            temperature: -1,
            voltage: 0xBEEF,
            button1: false,
        };
        let raw = build(&tel, &Actuators::new(false), &ErrorLatch::new());
        assert_eq!(u16::from_le_bytes([raw[6], raw[7]]), crc16(&raw[..6]));
        assert_eq!(raw[4] & 0b1110_0000, 0);
    }
}
