//! Static storage for a [Slave] shared between interrupt handlers
//!
//! The entry points of a [Slave] must never preempt each other. When the
//! receive, error and tick interrupts cannot be configured to the same
//! priority, place the [Slave] in a [SharedSlave] with a
//! [`CriticalSectionRawMutex`][embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex],
//! and every handler then runs inside a critical section.
//!
//! ```rust
//! use trunc_rtu_slave::{DeviceAddress, Led, SharedSlave, SlaveCfg};
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//!
//! struct Uart;
//! impl trunc_rtu_slave::LinkLayer for Uart {
//!     type Error = ();
//!     fn begin_receive(&mut self, _len: usize) -> Result<(), ()> { Ok(()) }
//!     fn begin_transmit(&mut self, _frame: &[u8]) -> Result<(), ()> { Ok(()) }
//!     fn abort_receive(&mut self) {}
//! }
//!
//! struct Leds;
//! impl trunc_rtu_slave::OutputLines for Leds {
//!     fn set_line(&mut self, _led: Led, _level: bool) {}
//! }
//!
//! struct Board;
//! impl SlaveCfg for Board {
//!     type Link = Uart;
//!     type Outputs = Leds;
//!     const ADDRESS: DeviceAddress = DeviceAddress::must(0x01);
//! }
//!
//! static SLAVE: SharedSlave<CriticalSectionRawMutex, Board> = SharedSlave::uninit();
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};

use crate::{
    latch::{ErrorCode, LinkFault},
    Error, LinkLayer, Slave, SlaveCfg,
};

type LinkError<Cfg> = Error<<<Cfg as SlaveCfg>::Link as LinkLayer>::Error>;
type SharedResult<Cfg> = Result<(), LinkError<Cfg>>;

/// Why [SharedSlave::init] did not complete cleanly
#[non_exhaustive]
pub enum InitError<Cfg: SlaveCfg> {
    /// The slot was already initialized. The rejected slave is given back.
    Occupied(Slave<Cfg>),
    /// The slave was stored, but arming the first receive failed. The
    /// next [SharedSlave::on_tick] retries it.
    Link(LinkError<Cfg>),
}

/// A [Slave] behind a blocking mutex, suitable for a `static`
pub struct SharedSlave<M: RawMutex, Cfg: SlaveCfg> {
    inner: Mutex<M, RefCell<Option<Slave<Cfg>>>>,
}

impl<M: RawMutex, Cfg: SlaveCfg> SharedSlave<M, Cfg> {
    /// Create an empty slot
    ///
    /// Users must still call [`SharedSlave::init()`] before use.
    pub const fn uninit() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Store `slave` and start receiving.
    ///
    /// Returns the slave back in [InitError::Occupied] if the slot was
    /// already initialized.
    pub fn init(&self, slave: Slave<Cfg>) -> Result<(), InitError<Cfg>> {
        self.inner.lock(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_some() {
                return Err(InitError::Occupied(slave));
            }
            slot.insert(slave).start_receive().map_err(InitError::Link)
        })
    }

    /// Run `f` with exclusive access to the slave, if initialized
    pub fn with<R>(&self, f: impl FnOnce(&mut Slave<Cfg>) -> R) -> Option<R> {
        self.inner
            .lock(|cell| cell.borrow_mut().as_mut().map(f))
    }

    /// Forward to [Slave::on_receive_complete]
    pub fn on_receive_complete(&self, data: &[u8]) -> Option<SharedResult<Cfg>> {
        self.with(|s| s.on_receive_complete(data))
    }

    /// Forward to [Slave::on_tick]
    pub fn on_tick(&self) -> Option<SharedResult<Cfg>> {
        self.with(|s| s.on_tick())
    }

    /// Forward to [Slave::on_link_fault]
    pub fn on_link_fault(&self, fault: LinkFault) -> Option<()> {
        self.with(|s| s.on_link_fault(fault))
    }

    /// Forward to [Slave::start_receive]
    pub fn start_receive(&self) -> Option<SharedResult<Cfg>> {
        self.with(|s| s.start_receive())
    }

    /// Forward to [Slave::set_temperature]
    pub fn set_temperature(&self, temperature: i16) -> Option<()> {
        self.with(|s| s.set_temperature(temperature))
    }

    /// Forward to [Slave::set_voltage]
    pub fn set_voltage(&self, voltage: u16) -> Option<()> {
        self.with(|s| s.set_voltage(voltage))
    }

    /// Forward to [Slave::set_button1_state]
    pub fn set_button1_state(&self, pressed: bool) -> Option<()> {
        self.with(|s| s.set_button1_state(pressed))
    }

    /// Currently latched error code
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.with(|s| s.error_code())
    }

    /// Take the slave back out, leaving the slot empty
    pub fn take(&self) -> Option<Slave<Cfg>> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }
}
