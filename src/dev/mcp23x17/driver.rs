use super::bus::Mcp23x17Bus;
use super::regs::{Reg, REG_COUNT};
use crate::{CommitErrors, Error, InterruptType};

/// Pins whose interrupt actually fired, given the captured `INTF`/`INTCAP` and the
/// configured triggers.
///
/// A flagged pin counts if it is level-triggered (`INTCON`), or if the captured level
/// matches one of its armed edges.
pub fn fired_pins(intf: u16, intcap: u16, rise: u16, fall: u16, intcon: u16) -> u16 {
    intf & ((intcap & rise) | (!intcap & fall) | intcon)
}

/// Chip state behind the mutation lock: the bus, the register cache and the edge masks.
pub struct Driver<B> {
    bus: B,
    addr: u8,
    cache: [u16; REG_COUNT],
    // edge triggers have no register of their own, the chip only reports changes
    irq_rise: u16,
    irq_fall: u16,
}

impl<B> Driver<B> {
    /// Driver for the chip with address pins `a0`..`a2`, cache zeroed until loaded.
    pub fn new(bus: B, a0: bool, a1: bool, a2: bool) -> Self {
        let addr = 0x20 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8);
        Self {
            bus,
            addr,
            cache: [0x0000; REG_COUNT],
            irq_rise: 0x0000,
            irq_fall: 0x0000,
        }
    }

    /// Bus address of the chip.
    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// Last value written to or read from `reg`.
    pub fn cached(&self, reg: Reg) -> u16 {
        self.cache[reg.index()]
    }

    /// Pins armed for rising and falling edges.
    pub fn irq_edges(&self) -> (u16, u16) {
        (self.irq_rise, self.irq_fall)
    }

    pub(crate) fn release(self) -> B {
        self.bus
    }
}

impl<B: Mcp23x17Bus> Driver<B> {
    /// Read `reg` from the chip and remember it.
    pub fn read(&mut self, reg: Reg) -> Result<u16, Error<B::BusError>> {
        let value = self.bus.read_reg(self.addr, reg).map_err(Error::Transport)?;
        self.cache[reg.index()] = value;
        Ok(value)
    }

    /// Write `reg`; the cache only follows once the chip accepted the value.
    pub fn write(&mut self, reg: Reg, value: u16) -> Result<(), Error<B::BusError>> {
        self.write_bus(reg, value).map_err(Error::Transport)
    }

    /// Read `count` registers starting at `start` into the cache.
    ///
    /// Either all of them are cached or, on a failed transfer, none.
    pub fn read_burst(&mut self, start: Reg, count: usize) -> Result<&[u16], Error<B::BusError>> {
        let range = match start.index().checked_add(count) {
            Some(end) if end <= REG_COUNT => start.index()..end,
            _ => return Err(Error::RegisterRange { start, count }),
        };
        let mut values = [0x0000; REG_COUNT];
        self.bus
            .read_regs(self.addr, start, &mut values[..count])
            .map_err(Error::Transport)?;
        self.cache[range.clone()].copy_from_slice(&values[..count]);
        Ok(&self.cache[range])
    }

    fn write_bus(&mut self, reg: Reg, value: u16) -> Result<(), B::BusError> {
        self.bus.write_reg(self.addr, reg, value)?;
        self.cache[reg.index()] = value;
        Ok(())
    }
}

impl<B: Mcp23x17Bus> crate::PortDriver for Driver<B> {
    type Error = Error<B::BusError>;

    fn set(&mut self, mask_high: u16, mask_low: u16) -> Result<(), Self::Error> {
        let olat = (self.cached(Reg::OLAT) | mask_high) & !mask_low;
        self.write(Reg::OLAT, olat)
    }

    fn is_set(&self, mask_high: u16, mask_low: u16) -> u16 {
        let olat = self.cached(Reg::OLAT);
        (olat & mask_high) | (!olat & mask_low)
    }

    fn get(&mut self, mask_high: u16, mask_low: u16) -> Result<u16, Self::Error> {
        let in_ = self.read(Reg::GPIO)?;
        Ok((in_ & mask_high) | (!in_ & mask_low))
    }
}

impl<B: Mcp23x17Bus> crate::PortDriverTotemPole for Driver<B> {
    fn set_direction(
        &mut self,
        mask: u16,
        dir: crate::Direction,
        state: bool,
    ) -> Result<(), Self::Error> {
        use crate::PortDriver;

        let iodir = match dir {
            crate::Direction::Input => self.cached(Reg::IODIR) | mask,
            crate::Direction::Output => {
                if state {
                    self.set(mask, 0)?;
                } else {
                    self.set(0, mask)?;
                }
                self.cached(Reg::IODIR) & !mask
            }
        };
        self.write(Reg::IODIR, iodir)
    }
}

impl<B: Mcp23x17Bus> crate::PortDriverIrq for Driver<B> {
    fn set_irq_enabled(&mut self, mask: u16, enable: bool) {
        let gpinten = &mut self.cache[Reg::GPINTEN.index()];
        if enable {
            *gpinten |= mask;
        } else {
            *gpinten &= !mask;
        }
    }

    fn set_irq_type(&mut self, mask: u16, int_type: InterruptType) {
        let (intcon, defval) = (Reg::INTCON.index(), Reg::DEFVAL.index());
        match int_type {
            InterruptType::Both => {
                self.cache[intcon] &= !mask;
                self.irq_rise |= mask;
                self.irq_fall |= mask;
            }
            InterruptType::Rising => {
                self.cache[intcon] &= !mask;
                self.irq_rise |= mask;
                self.irq_fall &= !mask;
            }
            InterruptType::Falling => {
                self.cache[intcon] &= !mask;
                self.irq_rise &= !mask;
                self.irq_fall |= mask;
            }
            InterruptType::High => {
                self.cache[intcon] |= mask;
                self.cache[defval] &= !mask;
            }
            InterruptType::Low => {
                self.cache[intcon] |= mask;
                self.cache[defval] |= mask;
            }
        }
    }

    fn sync_irq_config(&mut self) -> Result<(), Self::Error> {
        let errors = CommitErrors {
            gpinten: self.write_bus(Reg::GPINTEN, self.cached(Reg::GPINTEN)).err(),
            defval: self.write_bus(Reg::DEFVAL, self.cached(Reg::DEFVAL)).err(),
            intcon: self.write_bus(Reg::INTCON, self.cached(Reg::INTCON)).err(),
        };
        if errors.failed() == 0 {
            Ok(())
        } else {
            Err(Error::Commit(errors))
        }
    }

    fn fetch_interrupt_state(&mut self) -> Result<u16, Self::Error> {
        let intf = self.read(Reg::INTF)?;
        let intcap = self.read(Reg::INTCAP)?;
        Ok(fired_pins(
            intf,
            intcap,
            self.irq_rise,
            self.irq_fall,
            self.cached(Reg::INTCON),
        ))
    }
}
