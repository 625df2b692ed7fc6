//! Slave interface
//!
//! [Slave] owns all of the protocol state, the link layer, and the output
//! pins. The board glue forwards each interrupt to one entry point:
//!
//! | Interrupt               | Entry point                    |
//! |-------------------------|--------------------------------|
//! | startup                 | [Slave::start_receive]         |
//! | UART receive complete   | [Slave::on_receive_complete]   |
//! | UART error              | [Slave::on_link_fault]         |
//! | 1 ms timer              | [Slave::on_tick]               |
//!
//! Transmit complete needs no handling.

use embassy_time::Duration;

use crate::{
    dispatch::{dispatch, Actuators, Outcome},
    frame::{DeviceAddress, Request, LED_COUNT},
    latch::{ErrorCode, ErrorLatch, LinkFault},
    receiver::{Receiver, RxState, Step},
    response::{self, Telemetry},
    Error, LinkLayer, OutputLines,
};

/// Tick period of the reference board
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Time allowed for the rest of a frame once its first byte arrived
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(10);

/// Metadata trait to contain relevant generics and settings
pub trait SlaveCfg {
    /// Link layer driver type
    type Link: LinkLayer;

    /// Output pin driver type
    type Outputs: OutputLines;

    /// The address this device answers to.
    ///
    /// Build it with [DeviceAddress::must] so that an out-of-range
    /// address fails the build.
    const ADDRESS: DeviceAddress;

    /// Period between two calls to [Slave::on_tick]
    const TICK_PERIOD: Duration = DEFAULT_TICK_PERIOD;

    /// Time budget for the remainder of a frame
    const RECEIVE_TIMEOUT: Duration = DEFAULT_RECEIVE_TIMEOUT;

    /// When `true`, an output that is logically "on" is driven low
    const OUTPUTS_ACTIVE_LOW: bool = true;
}

/// Number of whole ticks in `timeout`, at least one
pub const fn timeout_ticks(timeout: Duration, tick: Duration) -> u16 {
    let tick = tick.as_ticks();
    if tick == 0 {
        return 1;
    }
    let ticks = timeout.as_ticks() / tick;
    if ticks == 0 {
        1
    } else if ticks > u16::MAX as u64 {
        u16::MAX
    } else {
        ticks as u16
    }
}

type SlaveResult<Cfg> = Result<(), Error<<<Cfg as SlaveCfg>::Link as LinkLayer>::Error>>;

/// Slave protocol engine
///
/// Every entry point runs to completion without blocking. The caller
/// guarantees that no two entry points of the same [Slave] run at the
/// same time, see [`SharedSlave`][crate::SharedSlave].
pub struct Slave<Cfg: SlaveCfg> {
    link: Cfg::Link,
    outputs: Cfg::Outputs,
    rx: Receiver,
    actuators: Actuators,
    latch: ErrorLatch,
    telemetry: Telemetry,
}

/// Instantiation and teardown
impl<Cfg: SlaveCfg> Slave<Cfg> {
    const TIMEOUT_TICKS: u16 = timeout_ticks(Cfg::RECEIVE_TIMEOUT, Cfg::TICK_PERIOD);

    /// Create a new [Slave]
    ///
    /// All outputs are driven off. Reception does not start until
    /// [Slave::start_receive] or the first [Slave::on_tick] is called.
    pub fn new(link: Cfg::Link, mut outputs: Cfg::Outputs) -> Self {
        let address = Cfg::ADDRESS;
        let mut actuators = Actuators::new(Cfg::OUTPUTS_ACTIVE_LOW);
        actuators.reset(&mut outputs);
        rtu_info!(
            "slave at {=u8}, timeout {=u16} ticks",
            address.get(),
            Self::TIMEOUT_TICKS
        );

        Self {
            link,
            outputs,
            rx: Receiver::new(Self::TIMEOUT_TICKS),
            actuators,
            latch: ErrorLatch::new(),
            telemetry: Telemetry::new(),
        }
    }

    /// Give back the drivers
    pub fn free(self) -> (Cfg::Link, Cfg::Outputs) {
        (self.link, self.outputs)
    }
}

/// Interrupt entry points
impl<Cfg: SlaveCfg> Slave<Cfg> {
    /// Go back to waiting for the first byte of a frame, and arm the link
    /// layer for it.
    ///
    /// Must be called once before any other event is delivered. Safe to
    /// call again at any time to force resynchronization: a receive that
    /// is still armed, for either part of a frame, is aborted first.
    ///
    /// If arming fails, the next [Slave::on_tick] retries it.
    pub fn start_receive(&mut self) -> SlaveResult<Cfg> {
        if self.rx.is_armed() {
            self.link.abort_receive();
            self.rx.set_armed(false);
        }
        let len = self.rx.restart();
        self.arm(len)
    }

    /// The link layer finished an armed receive, delivering `data`.
    ///
    /// After the first byte, this arms the remainder. After the remainder,
    /// the frame is checked, a valid frame is dispatched and answered, and
    /// the receiver is always re-armed for the next frame.
    pub fn on_receive_complete(&mut self, data: &[u8]) -> SlaveResult<Cfg> {
        match self.rx.accept(data) {
            Ok(Step::Arm(len)) => self.arm(len),
            Ok(Step::Complete(req)) => {
                let sent = self.process(&req);
                let armed = self.start_receive();
                // An arm failure matters more, the caller may want to retry it
                armed.and(sent)
            }
            Err(bad) => {
                rtu_warn!("expected {=usize} bytes, got {=usize}", bad.expected, bad.got);
                self.start_receive()?;
                Err(Error::Length {
                    expected: bad.expected,
                    got: bad.got,
                })
            }
        }
    }

    /// One period of the time source has passed.
    ///
    /// If a frame has been stuck after its first byte for the whole
    /// receive budget, abort it and resynchronize. If an earlier arm
    /// failed, nothing is in flight, and arming is retried.
    pub fn on_tick(&mut self) -> SlaveResult<Cfg> {
        if !self.rx.tick() {
            return Ok(());
        }
        if self.rx.is_armed() {
            rtu_warn!("frame timed out, resyncing");
        } else {
            rtu_debug!("retrying receive arm");
        }
        self.start_receive()
    }

    /// The link layer reported a transport fault.
    ///
    /// The fault is latched for the next response. Reception state is not
    /// touched; if the driver cancelled the armed receive while handling
    /// the fault, it should call [Slave::start_receive] afterwards.
    pub fn on_link_fault(&mut self, fault: LinkFault) {
        match self.latch.latch_fault(fault) {
            Some(code) => rtu_warn!("link fault latched: {}", code),
            None => rtu_debug!("ignored link fault"),
        }
    }

    fn arm(&mut self, len: usize) -> SlaveResult<Cfg> {
        match self.link.begin_receive(len) {
            Ok(()) => {
                self.rx.set_armed(true);
                Ok(())
            }
            Err(e) => {
                rtu_error!("failed to arm receive of {=usize} bytes", len);
                Err(Error::Link(e))
            }
        }
    }

    fn process(&mut self, req: &Request) -> SlaveResult<Cfg> {
        if let Err(rej) = req.validate(Cfg::ADDRESS) {
            rtu_debug!("dropped frame: {}", rej);
            return Ok(());
        }

        match dispatch(req, &mut self.actuators, &mut self.outputs, &mut self.latch) {
            Outcome::UnknownCommand(raw) => rtu_warn!("unknown command {=u8}", raw),
            outcome => rtu_trace!("dispatched: {}", outcome),
        }

        let frame = response::build(&self.telemetry, &self.actuators, &self.latch);
        self.link.begin_transmit(&frame).map_err(|e| {
            rtu_error!("failed to start transmit");
            Error::Link(e)
        })
    }
}

/// Telemetry staging and inspection
impl<Cfg: SlaveCfg> Slave<Cfg> {
    /// Stage the temperature for the next response
    pub fn set_temperature(&mut self, temperature: i16) {
        self.telemetry.temperature = temperature;
    }

    /// Stage the voltage for the next response
    pub fn set_voltage(&mut self, voltage: u16) {
        self.telemetry.voltage = voltage;
    }

    /// Stage the momentary input state for the next response
    pub fn set_button1_state(&mut self, pressed: bool) {
        self.telemetry.button1 = pressed;
    }

    /// Currently staged telemetry
    #[inline]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Currently latched error code
    #[inline]
    pub fn error_code(&self) -> ErrorCode {
        self.latch.get()
    }

    /// Last applied logical output states
    #[inline]
    pub fn led_states(&self) -> [bool; LED_COUNT] {
        self.actuators.states()
    }

    /// Receive cursor position
    #[inline]
    pub fn rx_state(&self) -> RxState {
        self.rx.state()
    }

    /// Ticks spent waiting for the current frame's remainder
    #[inline]
    pub fn rx_elapsed(&self) -> u16 {
        self.rx.elapsed()
    }

    /// Borrow the link layer driver
    #[inline]
    pub fn link(&self) -> &Cfg::Link {
        &self.link
    }

    /// Mutably borrow the link layer driver
    #[inline]
    pub fn link_mut(&mut self) -> &mut Cfg::Link {
        &mut self.link
    }

    /// Borrow the output pin driver
    #[inline]
    pub fn outputs(&self) -> &Cfg::Outputs {
        &self.outputs
    }
}
