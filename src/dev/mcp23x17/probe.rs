use super::{iocon, Driver, IrqBusLock, Mcp23x17, Mcp23x17Bus, Reg, REG_COUNT};
use crate::{Config, Error, GpioChipInfo, PortMutex, ProbeStep};

impl<B, M, L> Mcp23x17<M, L>
where
    B: Mcp23x17Bus,
    M: PortMutex<Port = Driver<B>>,
    L: PortMutex<Port = IrqBusLock>,
{
    /// Bring up the chip behind `bus`, with custom lock types.
    ///
    /// The chip is only handed out once every bring-up step succeeded; on failure the
    /// transport is dropped and the failed step is reported.
    pub fn probe_with_mutex(
        bus: B,
        a0: bool,
        a1: bool,
        a2: bool,
        label: &'static str,
        config: &Config,
    ) -> Result<Self, Error<B::BusError>> {
        let mut driver = Driver::new(bus, a0, a1, a2);
        if let Err(e) = bring_up(&mut driver, config) {
            log::error!("{label}@{:#04x}: can't set up chip: {e}", driver.addr());
            return Err(e);
        }

        Ok(Self {
            driver: PortMutex::create(driver),
            irq_bus: PortMutex::create(IrqBusLock),
            info: GpioChipInfo {
                label,
                base: config.base,
                ngpio: 16,
                can_sleep: true,
            },
            irq_controller: config.irq_controller,
            irq_active_high: config.active_high(),
        })
    }
}

fn bring_up<B: Mcp23x17Bus>(
    driver: &mut Driver<B>,
    config: &Config,
) -> Result<(), Error<B::BusError>> {
    let addr = driver.addr();

    let status = driver
        .read(Reg::IOCON)
        .map_err(Error::probe(ProbeStep::ReadIocon))?;
    if let Some(fixed) = corrected_iocon(status, config.mirror(), config.active_high()) {
        log::debug!("{addr:#04x}: IOCON {status:#06x} -> {fixed:#06x}");
        driver
            .write(Reg::IOCON, fixed)
            .map_err(Error::probe(ProbeStep::WriteIocon))?;
    }

    driver
        .write(Reg::GPPU, config.pullups)
        .map_err(Error::probe(ProbeStep::Pullups))?;

    driver
        .read_burst(Reg::IODIR, REG_COUNT)
        .map_err(Error::probe(ProbeStep::LoadCache))?;

    if driver.cached(Reg::IPOL) != 0 {
        log::debug!("{addr:#04x}: disabling input inversion");
        driver
            .write(Reg::IPOL, 0x0000)
            .map_err(Error::probe(ProbeStep::ClearPolarity))?;
    }

    if driver.cached(Reg::GPINTEN) != 0 {
        log::debug!("{addr:#04x}: disabling interrupts");
        driver
            .write(Reg::GPINTEN, 0x0000)
            .map_err(Error::probe(ProbeStep::ClearIrqEnable))?;
    }

    Ok(())
}

/// `IOCON` value to write back, if `status` needs fixing.
///
/// Sequential reads must stay enabled for burst reads and `HAEN` set so that every chip
/// on a shared chip-select listens to its own address.
fn corrected_iocon(status: u16, mirror: bool, active_high: bool) -> Option<u16> {
    if status & iocon::SEQOP == 0 && status & iocon::HAEN != 0 && !mirror && !active_high {
        return None;
    }

    let mut fixed = status & !iocon::both(iocon::SEQOP);
    fixed |= iocon::both(iocon::HAEN);
    if active_high {
        fixed |= iocon::both(iocon::INTPOL);
    } else {
        fixed &= !iocon::both(iocon::INTPOL);
    }
    if mirror {
        fixed |= iocon::both(iocon::MIRROR);
    }
    Some(fixed)
}
