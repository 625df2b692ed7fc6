//! Frame layouts
//!
//! Both frames are fixed length and bit-packed. Fields are always read
//! and written through explicit masks and shifts over the raw bytes, so
//! the wire layout does not depend on any in-memory bitfield ordering.
//!
//! ## Request (controller to slave, 3 bytes)
//!
//! ```text
//! byte 0: 0bCCCC_AAAA   C: command, A: address
//! byte 1: 0bRRRR_4321   R: reserved, 1..4: LED1..LED4 requested on
//! byte 2: crc8(byte 0, byte 1)
//! ```
//!
//! ## Response (slave to controller, 8 bytes)
//!
//! ```text
//! byte 0..2: temperature, i16 little endian
//! byte 2..4: voltage, u16 little endian
//! byte 4:    0bRRRB_4321  R: reserved (zero), B: button 1, 1..4: LED1..LED4 state
//! byte 5:    latched error code
//! byte 6..8: crc16(byte 0..6), little endian
//! ```

use crate::{
    crc::{crc16, crc8},
    latch::ErrorCode,
};

/// Length of a request frame on the wire
pub const REQUEST_LEN: usize = 3;
/// Length of a response frame on the wire
pub const RESPONSE_LEN: usize = 8;
/// Number of independently switched outputs
pub const LED_COUNT: usize = 4;

const REQ_CRC_SPAN: usize = REQUEST_LEN - 1;
const RESP_CRC_SPAN: usize = RESPONSE_LEN - 2;

const NIBBLE: u8 = 0b0000_1111;
const BUTTON1_BIT: u8 = 1 << 4;

/// Logical address of this device
///
/// Only the low nibble of the first request byte carries the address,
/// and `0` is never a valid device address, so the range is `1..=15`.
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Lowest valid address
    pub const MIN: u8 = 0x01;
    /// Highest valid address
    pub const MAX: u8 = 0x0F;

    /// Create an address, returning `None` when `raw` is outside `1..=15`
    pub const fn new(raw: u8) -> Option<Self> {
        if raw >= Self::MIN && raw <= Self::MAX {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Create an address, panicking when `raw` is outside `1..=15`
    ///
    /// Intended for `const` contexts, where the panic becomes a build
    /// failure:
    ///
    /// ```rust
    /// use trunc_rtu_slave::frame::DeviceAddress;
    ///
    /// const ADDRESS: DeviceAddress = DeviceAddress::must(0x01);
    /// assert_eq!(ADDRESS.get(), 0x01);
    /// ```
    ///
    /// ```rust,compile_fail
    /// use trunc_rtu_slave::frame::DeviceAddress;
    ///
    /// const ADDRESS: DeviceAddress = DeviceAddress::must(0x00);
    /// assert_eq!(ADDRESS.get(), 0x00);
    /// ```
    pub const fn must(raw: u8) -> Self {
        match Self::new(raw) {
            Some(addr) => addr,
            None => panic!("device address is out of the allowed range 1..=15"),
        }
    }

    /// The raw 4-bit address
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Request command nibble
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Poll - `0x1`
    ///
    /// No state change, only solicits a response.
    SendData,
    /// Update outputs - `0x2`
    ///
    /// Apply the four requested LED states.
    UpdateOutputs,
    /// Error reset - `0xF`
    ///
    /// Clear the latched error code.
    ErrorReset,
    /// Any other nibble value
    Unknown(u8),
}

impl Command {
    const SEND_DATA: u8 = 0x01;
    const UPDATE_OUTPUTS: u8 = 0x02;
    const ERROR_RESET: u8 = 0x0F;
}

impl From<u8> for Command {
    fn from(value: u8) -> Self {
        match value & NIBBLE {
            Self::SEND_DATA => Command::SendData,
            Self::UPDATE_OUTPUTS => Command::UpdateOutputs,
            Self::ERROR_RESET => Command::ErrorReset,
            other => Command::Unknown(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(val: Command) -> Self {
        match val {
            Command::SendData => Command::SEND_DATA,
            Command::UpdateOutputs => Command::UPDATE_OUTPUTS,
            Command::ErrorReset => Command::ERROR_RESET,
            Command::Unknown(raw) => raw & NIBBLE,
        }
    }
}

/// One of the four actuator outputs
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    /// Output 1
    Led1,
    /// Output 2
    Led2,
    /// Output 3
    Led3,
    /// Output 4
    Led4,
}

impl Led {
    /// All outputs, in wire bit order
    pub const ALL: [Led; LED_COUNT] = [Led::Led1, Led::Led2, Led::Led3, Led::Led4];

    /// Zero based index, which is also the bit position on the wire
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    const fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

/// Why a request was discarded
///
/// These are protocol faults: they are never answered and never latched.
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Reject {
    /// The frame was addressed to another device
    WrongAddress(u8),
    /// The check byte does not match the first two bytes
    BadCrc {
        /// Value computed over the received bytes
        computed: u8,
        /// Value found in the frame
        received: u8,
    },
}

/// A request frame, as it sits in the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Request {
    raw: [u8; REQUEST_LEN],
}

impl Request {
    /// Wrap raw received bytes. Nothing is checked until [Request::validate].
    #[inline]
    pub const fn from_bytes(raw: [u8; REQUEST_LEN]) -> Self {
        Self { raw }
    }

    /// Build a well-formed request, including its check byte
    ///
    /// This is the controller side of the exchange, used by tooling and tests.
    pub const fn new(addr: DeviceAddress, cmd: Command, leds: [bool; LED_COUNT]) -> Self {
        let cmd = match cmd {
            Command::SendData => Command::SEND_DATA,
            Command::UpdateOutputs => Command::UPDATE_OUTPUTS,
            Command::ErrorReset => Command::ERROR_RESET,
            Command::Unknown(raw) => raw & NIBBLE,
        };
        let b0 = (cmd << 4) | addr.get();
        let mut b1 = 0;
        let mut i = 0;
        while i < LED_COUNT {
            if leds[i] {
                b1 |= 1 << i;
            }
            i += 1;
        }
        Self {
            raw: [b0, b1, crc8(&[b0, b1])],
        }
    }

    /// The raw wire bytes
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; REQUEST_LEN] {
        &self.raw
    }

    /// Address nibble, not yet checked against anything
    #[inline]
    pub const fn address(&self) -> u8 {
        self.raw[0] & NIBBLE
    }

    /// Command nibble
    #[inline]
    pub fn command(&self) -> Command {
        Command::from(self.raw[0] >> 4)
    }

    /// Requested state of one output
    ///
    /// Only meaningful for [Command::UpdateOutputs].
    #[inline]
    pub const fn led_on(&self, led: Led) -> bool {
        self.raw[1] & led.mask() != 0
    }

    /// Requested state of all outputs, in [Led::ALL] order
    pub const fn leds(&self) -> [bool; LED_COUNT] {
        [
            self.led_on(Led::Led1),
            self.led_on(Led::Led2),
            self.led_on(Led::Led3),
            self.led_on(Led::Led4),
        ]
    }

    /// Reserved nibble. Never validated.
    #[inline]
    pub const fn reserved(&self) -> u8 {
        self.raw[1] >> 4
    }

    /// Received check byte
    #[inline]
    pub const fn crc(&self) -> u8 {
        self.raw[REQ_CRC_SPAN]
    }

    /// Decide whether this frame may be acted upon by device `addr`
    ///
    /// The address is checked first, so a frame for some other device is
    /// reported as [Reject::WrongAddress] even if its CRC is also broken.
    pub fn validate(&self, addr: DeviceAddress) -> Result<(), Reject> {
        if self.address() != addr.get() {
            return Err(Reject::WrongAddress(self.address()));
        }
        let computed = crc8(&self.raw[..REQ_CRC_SPAN]);
        if computed != self.crc() {
            return Err(Reject::BadCrc {
                computed,
                received: self.crc(),
            });
        }
        Ok(())
    }
}

/// Why a response could not be decoded
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResponseError {
    /// The trailing check value does not match
    BadCrc {
        /// Value computed over the received bytes
        computed: u16,
        /// Value found in the frame
        received: u16,
    },
    /// The error byte holds no known code
    UnknownErrorCode(u8),
}

/// The telemetry snapshot sent back for each accepted request
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Response {
    /// Last staged temperature
    pub temperature: i16,
    /// Last staged voltage
    pub voltage: u16,
    /// Last applied logical state of each output, in [Led::ALL] order
    pub leds: [bool; LED_COUNT],
    /// Last staged momentary input state
    pub button1: bool,
    /// Currently latched error
    pub error: ErrorCode,
}

impl Response {
    /// Pack into wire bytes, computing a fresh check value
    pub fn to_bytes(&self) -> [u8; RESPONSE_LEN] {
        let mut out = [0u8; RESPONSE_LEN];
        out[0..2].copy_from_slice(&self.temperature.to_le_bytes());
        out[2..4].copy_from_slice(&self.voltage.to_le_bytes());

        let mut flags = 0;
        for led in Led::ALL {
            if self.leds[led.index()] {
                flags |= led.mask();
            }
        }
        if self.button1 {
            flags |= BUTTON1_BIT;
        }
        out[4] = flags;
        out[5] = self.error.into();

        let crc = crc16(&out[..RESP_CRC_SPAN]);
        out[RESP_CRC_SPAN..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Unpack wire bytes, checking the trailing CRC
    ///
    /// This is what the controller does with a reply. Reserved bits are
    /// ignored.
    pub fn from_bytes(raw: &[u8; RESPONSE_LEN]) -> Result<Self, ResponseError> {
        let computed = crc16(&raw[..RESP_CRC_SPAN]);
        let received = u16::from_le_bytes([raw[6], raw[7]]);
        if computed != received {
            return Err(ResponseError::BadCrc { computed, received });
        }
        let error = ErrorCode::try_from(raw[5]).map_err(ResponseError::UnknownErrorCode)?;

        let flags = raw[4];
        let mut leds = [false; LED_COUNT];
        for led in Led::ALL {
            leds[led.index()] = flags & led.mask() != 0;
        }

        Ok(Self {
            temperature: i16::from_le_bytes([raw[0], raw[1]]),
            voltage: u16::from_le_bytes([raw[2], raw[3]]),
            leds,
            button1: flags & BUTTON1_BIT != 0,
            error,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ADDR1: DeviceAddress = DeviceAddress::must(0x01);

    #[test]
    fn address_range() {
        assert_eq!(DeviceAddress::new(0x00), None);
        assert_eq!(DeviceAddress::new(0x10), None);
        assert_eq!(DeviceAddress::new(0xFF), None);
        assert_eq!(DeviceAddress::new(0x01).map(DeviceAddress::get), Some(0x01));
        assert_eq!(DeviceAddress::new(0x0F).map(DeviceAddress::get), Some(0x0F));
    }

    #[test]
    #[should_panic]
    fn must_rejects_zero_at_runtime() {
        let raw = core::hint::black_box(0u8);
        let _ = DeviceAddress::must(raw);
    }

    #[test]
    fn command_codes() {
        assert_eq!(Command::from(0x1), Command::SendData);
        assert_eq!(Command::from(0x2), Command::UpdateOutputs);
        assert_eq!(Command::from(0xF), Command::ErrorReset);
        assert_eq!(Command::from(0x0), Command::Unknown(0x0));
        assert_eq!(Command::from(0x7), Command::Unknown(0x7));
        assert_eq!(u8::from(Command::ErrorReset), 0x0F);
        assert_eq!(u8::from(Command::Unknown(0x3)), 0x03);
    }

    #[test]
    fn request_field_layout() {
        // addr 1, UPDATE_OUTPUTS, LED1 + LED3, reserved bits set
        let req = Request::from_bytes([0x21, 0xA5, 0x00]);
        assert_eq!(req.address(), 0x1);
        assert_eq!(req.command(), Command::UpdateOutputs);
        assert_eq!(req.leds(), [true, false, true, false]);
        assert_eq!(req.reserved(), 0xA);
        assert_eq!(req.crc(), 0x00);
    }

    #[test]
    fn request_builder_matches_wire() {
        let req = Request::new(ADDR1, Command::UpdateOutputs, [true, false, false, false]);
        assert_eq!(req.as_bytes(), &[0x21, 0x01, 0x98]);
        assert_eq!(req.validate(ADDR1), Ok(()));
    }

    #[test]
    fn wrong_address_rejected() {
        let req = Request::from_bytes([0x12, 0x0F, crc8(&[0x12, 0x0F])]);
        assert_eq!(req.validate(ADDR1), Err(Reject::WrongAddress(0x2)));
    }

    #[test]
    fn bad_crc_rejected() {
        let req = Request::from_bytes([0x21, 0x01, 0x99]);
        assert_eq!(
            req.validate(ADDR1),
            Err(Reject::BadCrc {
                computed: 0x98,
                received: 0x99
            })
        );
    }

    #[test]
    fn reserved_bits_not_validated() {
        let req = Request::from_bytes([0x21, 0xFA, 0xF0]);
        assert_eq!(req.validate(ADDR1), Ok(()));
        assert_eq!(req.leds(), [false, true, false, true]);
    }

    #[test]
    fn response_layout() {
        let resp = Response {
            temperature: -125,
            voltage: 3300,
            leds: [true, false, false, false],
            button1: false,
            error: ErrorCode::None,
        };
        assert_eq!(
            resp.to_bytes(),
            [0x83, 0xFF, 0xE4, 0x0C, 0x01, 0x00, 0x34, 0x46]
        );
    }

    #[test]
    fn response_flags_and_error() {
        let resp = Response {
            leds: [false, true, false, true],
            button1: true,
            error: ErrorCode::IncorrectCommand,
            ..Response::default()
        };
        let raw = resp.to_bytes();
        assert_eq!(raw[4], 0b0001_1010);
        assert_eq!(raw[5], 0x06);
        assert_eq!(Response::from_bytes(&raw), Ok(resp));
    }

    #[test]
    fn response_corruption_detected() {
        let mut raw = Response::default().to_bytes();
        raw[2] ^= 0x40;
        assert!(matches!(
            Response::from_bytes(&raw),
            Err(ResponseError::BadCrc { .. })
        ));
    }
}
