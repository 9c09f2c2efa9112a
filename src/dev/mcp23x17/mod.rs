//! Support for the `MCP23017` and `MCP23S17` "16-Bit I/O Expander with Serial Interface"
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! The MCP23x17 offers two eight-bit GPIO ports.  It has three address pins, so eight
//! devices can coexist on an I2C bus or share one SPI chip-select.
//!
//! Besides plain GPIO, the chip can act as a cascaded interrupt controller: every pin
//! may raise a nested interrupt which is signalled on the chip's `INT` output and
//! classified from the captured `INTF`/`INTCAP` registers.
//!
//! When passing 16-bit values to this driver, the upper byte corresponds to port
//! B (pins 7..0) and the lower byte corresponds to port A (pins 7..0).
use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;

use crate::{Config, Direction, Error, GpioChip, GpioChipInfo, PortDriver, PortDriverTotemPole, PortMutex};

mod array;
mod bus;
mod driver;
#[cfg(test)]
mod fake;
mod irq;
mod probe;
mod regs;

pub use array::Mcp23s17Array;
pub use bus::{Mcp23017Bus, Mcp23S17Bus, Mcp23x17Bus};
pub use driver::{fired_pins, Driver};
pub use regs::{iocon, Reg, REG_COUNT};

/// Token behind the interrupt configuration lock.  Holding it means holding the batch.
#[derive(Debug, Default)]
pub struct IrqBusLock;

/// `MCP23x17` "16-Bit I/O Expander with Serial Interface" with I2C or SPI interface
///
/// `M` guards the register cache and is held for single register operations, `L` is
/// held for a whole interrupt configuration batch.
pub struct Mcp23x17<M, L = RefCell<IrqBusLock>> {
    driver: M,
    irq_bus: L,
    info: GpioChipInfo,
    irq_controller: bool,
    irq_active_high: bool,
}

/// Device shareable between threads.
#[cfg(any(test, feature = "std"))]
pub type SyncMcp23x17<B> =
    Mcp23x17<std::sync::Mutex<Driver<B>>, std::sync::Mutex<IrqBusLock>>;

impl<I2C> Mcp23x17<RefCell<Driver<Mcp23017Bus<I2C>>>>
where
    I2C: I2c,
{
    /// Bring up an MCP23017 on the given I2C bus.
    pub fn probe_mcp23017(
        bus: I2C,
        a0: bool,
        a1: bool,
        a2: bool,
        config: &Config,
    ) -> Result<Self, Error<I2C::Error>> {
        Self::probe_with_mutex(Mcp23017Bus(bus), a0, a1, a2, "mcp23017", config)
    }
}

impl<SPI> Mcp23x17<RefCell<Driver<Mcp23S17Bus<SPI>>>>
where
    SPI: SpiDevice,
{
    /// Bring up an MCP23S17 on the given SPI device.
    ///
    /// The address pins select the chip when several share one chip-select.
    pub fn probe_mcp23s17(
        bus: SPI,
        a0: bool,
        a1: bool,
        a2: bool,
        config: &Config,
    ) -> Result<Self, Error<SPI::Error>> {
        Self::probe_with_mutex(Mcp23S17Bus(bus), a0, a1, a2, "mcp23s17", config)
    }
}

impl<B, M, L> Mcp23x17<M, L>
where
    B: Mcp23x17Bus,
    M: PortMutex<Port = Driver<B>>,
    L: PortMutex<Port = IrqBusLock>,
{
    /// Hand out typed handles for all 16 pins.
    pub fn split(&self) -> Parts<'_, Self> {
        Parts {
            gpa0: crate::Pin::new(0, self),
            gpa1: crate::Pin::new(1, self),
            gpa2: crate::Pin::new(2, self),
            gpa3: crate::Pin::new(3, self),
            gpa4: crate::Pin::new(4, self),
            gpa5: crate::Pin::new(5, self),
            gpa6: crate::Pin::new(6, self),
            gpa7: crate::Pin::new(7, self),
            gpb0: crate::Pin::new(8, self),
            gpb1: crate::Pin::new(9, self),
            gpb2: crate::Pin::new(10, self),
            gpb3: crate::Pin::new(11, self),
            gpb4: crate::Pin::new(12, self),
            gpb5: crate::Pin::new(13, self),
            gpb6: crate::Pin::new(14, self),
            gpb7: crate::Pin::new(15, self),
        }
    }

    /// Bus address of the chip.
    pub fn addr(&self) -> u8 {
        self.driver.lock(|drv| drv.addr())
    }

    /// Cached value of `reg`.
    pub fn cached(&self, reg: Reg) -> u16 {
        self.driver.lock(|drv| drv.cached(reg))
    }

    /// Whether the chip was brought up as interrupt controller.
    pub fn is_irq_controller(&self) -> bool {
        self.irq_controller
    }

    /// Read `pin`, reporting a failed transfer as low.
    pub fn get_or_low(&self, pin: u8) -> bool {
        self.get(pin).unwrap_or_else(|e| {
            log::warn!("{}: reading pin {pin} failed, reporting low: {e}", self.info.label);
            false
        })
    }

    /// Remove the chip and give back its transport.
    pub fn release(self) -> B {
        self.driver.into_inner().release()
    }
}

pub(crate) fn pin_mask<E>(pin: u8) -> Result<u16, Error<E>> {
    if pin < 16 {
        Ok(1 << pin)
    } else {
        Err(Error::InvalidPin(pin))
    }
}

impl<B, M, L> GpioChip for Mcp23x17<M, L>
where
    B: Mcp23x17Bus,
    M: PortMutex<Port = Driver<B>>,
    L: PortMutex<Port = IrqBusLock>,
{
    type Error = Error<B::BusError>;

    fn info(&self) -> &GpioChipInfo {
        &self.info
    }

    fn direction_input(&self, offset: u8) -> Result<(), Self::Error> {
        let mask = pin_mask(offset)?;
        self.driver.lock(|drv| drv.set_direction(mask, Direction::Input, false))
    }

    fn direction_output(&self, offset: u8, value: bool) -> Result<(), Self::Error> {
        let mask = pin_mask(offset)?;
        self.driver.lock(|drv| drv.set_direction(mask, Direction::Output, value))
    }

    fn get(&self, offset: u8) -> Result<bool, Self::Error> {
        let mask = pin_mask(offset)?;
        Ok(self.driver.lock(|drv| drv.get(mask, 0))? != 0)
    }

    fn is_set(&self, offset: u8) -> Result<bool, Self::Error> {
        let mask = pin_mask(offset)?;
        Ok(self.driver.lock(|drv| drv.is_set(mask, 0)) != 0)
    }

    fn set(&self, offset: u8, value: bool) -> Result<(), Self::Error> {
        let mask = pin_mask(offset)?;
        self.driver.lock(|drv| {
            if value {
                drv.set(mask, 0)
            } else {
                drv.set(0, mask)
            }
        })
    }
}

/// Pins of a [`Mcp23x17`], as inputs after bring-up.
#[allow(missing_docs)]
pub struct Parts<'a, C>
where
    C: GpioChip,
{
    pub gpa0: crate::Pin<'a, crate::mode::Input, C>,
    pub gpa1: crate::Pin<'a, crate::mode::Input, C>,
    pub gpa2: crate::Pin<'a, crate::mode::Input, C>,
    pub gpa3: crate::Pin<'a, crate::mode::Input, C>,
    pub gpa4: crate::Pin<'a, crate::mode::Input, C>,
    pub gpa5: crate::Pin<'a, crate::mode::Input, C>,
    pub gpa6: crate::Pin<'a, crate::mode::Input, C>,
    pub gpa7: crate::Pin<'a, crate::mode::Input, C>,
    pub gpb0: crate::Pin<'a, crate::mode::Input, C>,
    pub gpb1: crate::Pin<'a, crate::mode::Input, C>,
    pub gpb2: crate::Pin<'a, crate::mode::Input, C>,
    pub gpb3: crate::Pin<'a, crate::mode::Input, C>,
    pub gpb4: crate::Pin<'a, crate::mode::Input, C>,
    pub gpb5: crate::Pin<'a, crate::mode::Input, C>,
    pub gpb6: crate::Pin<'a, crate::mode::Input, C>,
    pub gpb7: crate::Pin<'a, crate::mode::Input, C>,
}
