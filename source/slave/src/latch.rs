//! Error latch
//!
//! Holds the most recent fault worth telling the controller about. The
//! latch is written from the link-fault handler and from the dispatcher,
//! and only [ErrorLatch::clear] (driven by an `ERROR_RESET` request)
//! returns it to [ErrorCode::None].

/// Code carried in the error byte of every response
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ErrorCode {
    /// Nothing latched
    #[default]
    None = 0x00,
    /// UART parity error
    UartParity = 0x01,
    /// UART noise error
    UartNoise = 0x02,
    /// UART framing error
    UartFrame = 0x03,
    /// UART receive overrun
    UartOverrun = 0x04,
    /// DMA transfer error
    UartDmaTransfer = 0x05,
    /// A valid frame carried an unrecognized command
    IncorrectCommand = 0x06,
}

impl From<ErrorCode> for u8 {
    fn from(val: ErrorCode) -> Self {
        val as u8
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => ErrorCode::None,
            0x01 => ErrorCode::UartParity,
            0x02 => ErrorCode::UartNoise,
            0x03 => ErrorCode::UartFrame,
            0x04 => ErrorCode::UartOverrun,
            0x05 => ErrorCode::UartDmaTransfer,
            0x06 => ErrorCode::IncorrectCommand,
            other => return Err(other),
        })
    }
}

/// A transport fault, as reported by the link layer driver
#[cfg_attr(feature = "defmt-logging", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LinkFault {
    /// Parity error
    Parity,
    /// Noise detected on the line
    Noise,
    /// Framing (stop bit) error
    Framing,
    /// Receive overrun
    Overrun,
    /// DMA transfer error
    Dma,
    /// Anything else, including several flags raised at once
    Unknown,
}

impl LinkFault {
    /// Parity error flag, as found in common MCU UART error registers
    pub const FLAG_PARITY: u32 = 0x01;
    /// Noise error flag
    pub const FLAG_NOISE: u32 = 0x02;
    /// Framing error flag
    pub const FLAG_FRAMING: u32 = 0x04;
    /// Overrun error flag
    pub const FLAG_OVERRUN: u32 = 0x08;
    /// DMA transfer error flag
    pub const FLAG_DMA: u32 = 0x10;

    /// The code latched for this fault, if any
    pub const fn code(self) -> Option<ErrorCode> {
        match self {
            LinkFault::Parity => Some(ErrorCode::UartParity),
            LinkFault::Noise => Some(ErrorCode::UartNoise),
            LinkFault::Framing => Some(ErrorCode::UartFrame),
            LinkFault::Overrun => Some(ErrorCode::UartOverrun),
            LinkFault::Dma => Some(ErrorCode::UartDmaTransfer),
            LinkFault::Unknown => None,
        }
    }
}

/// Map a raw driver error word. Only a single flag maps to a known fault.
impl From<u32> for LinkFault {
    fn from(value: u32) -> Self {
        match value {
            Self::FLAG_PARITY => LinkFault::Parity,
            Self::FLAG_NOISE => LinkFault::Noise,
            Self::FLAG_FRAMING => LinkFault::Framing,
            Self::FLAG_OVERRUN => LinkFault::Overrun,
            Self::FLAG_DMA => LinkFault::Dma,
            _ => LinkFault::Unknown,
        }
    }
}

/// The latched error code
#[derive(Debug, Default)]
pub struct ErrorLatch {
    code: ErrorCode,
}

impl ErrorLatch {
    /// A latch holding [ErrorCode::None]
    pub const fn new() -> Self {
        Self {
            code: ErrorCode::None,
        }
    }

    /// Record a transport fault. Returns the newly latched code, or
    /// `None` when the fault is not one we report (latch unchanged).
    pub fn latch_fault(&mut self, fault: LinkFault) -> Option<ErrorCode> {
        let code = fault.code()?;
        self.code = code;
        Some(code)
    }

    /// Record an application level fault
    pub fn set(&mut self, code: ErrorCode) {
        self.code = code;
    }

    /// Back to [ErrorCode::None]
    pub fn clear(&mut self) {
        self.code = ErrorCode::None;
    }

    /// The code that goes into the next response
    #[inline]
    pub fn get(&self) -> ErrorCode {
        self.code
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_fault_has_a_distinct_code() {
        let faults = [
            LinkFault::Parity,
            LinkFault::Noise,
            LinkFault::Framing,
            LinkFault::Overrun,
            LinkFault::Dma,
        ];
        let mut seen = [false; 8];
        for f in faults {
            let code = u8::from(f.code().unwrap());
            assert!(code != 0);
            assert!(!seen[code as usize]);
            seen[code as usize] = true;
        }
    }

    #[test]
    fn unknown_fault_leaves_latch_alone() {
        let mut latch = ErrorLatch::new();
        latch.set(ErrorCode::UartNoise);
        assert_eq!(latch.latch_fault(LinkFault::Unknown), None);
        assert_eq!(latch.get(), ErrorCode::UartNoise);
    }

    #[test]
    fn most_recent_fault_wins() {
        let mut latch = ErrorLatch::new();
        assert_eq!(latch.latch_fault(LinkFault::Parity), Some(ErrorCode::UartParity));
        assert_eq!(latch.latch_fault(LinkFault::Overrun), Some(ErrorCode::UartOverrun));
        assert_eq!(latch.get(), ErrorCode::UartOverrun);
        latch.clear();
        assert_eq!(latch.get(), ErrorCode::None);
    }

    #[test]
    fn raw_flags() {
        assert_eq!(LinkFault::from(0x01), LinkFault::Parity);
        assert_eq!(LinkFault::from(0x02), LinkFault::Noise);
        assert_eq!(LinkFault::from(0x04), LinkFault::Framing);
        assert_eq!(LinkFault::from(0x08), LinkFault::Overrun);
        assert_eq!(LinkFault::from(0x10), LinkFault::Dma);
        // two flags at once
        assert_eq!(LinkFault::from(0x05), LinkFault::Unknown);
        assert_eq!(LinkFault::from(0x00), LinkFault::Unknown);
    }

    #[test]
    fn code_byte_round_trip() {
        for raw in 0x00..=0x06 {
            assert_eq!(ErrorCode::try_from(raw).map(u8::from), Ok(raw));
        }
        assert_eq!(ErrorCode::try_from(0x07), Err(0x07));
    }
}
