use core::cell::RefCell;

use embedded_hal::spi::SpiDevice;

use super::{Driver, Mcp23S17Bus, Mcp23x17, Mcp23x17Bus};
use crate::{ArrayConfig, Error, GpioChip};

type Chip<B> = Mcp23x17<RefCell<Driver<B>>>;

/// Up to eight `MCP23S17` sharing one SPI chip-select, told apart by their hardware
/// address.
pub struct Mcp23s17Array<B> {
    chips: [Option<Chip<B>>; 8],
    ngpio: u16,
}

impl<SPI: SpiDevice> Mcp23s17Array<Mcp23S17Bus<SPI>> {
    /// Bring up every chip in `config.present_mask`.
    ///
    /// `make_bus` hands out the SPI device for the chip at a hardware address.  If any chip
    /// fails, the ones already brought up are dropped again and the error is returned.
    pub fn probe(
        config: &ArrayConfig,
        mut make_bus: impl FnMut(u8) -> SPI,
    ) -> Result<Self, Error<SPI::Error>> {
        Self::probe_with(config, "mcp23s17", |addr| Mcp23S17Bus(make_bus(addr)))
    }
}

impl<B: Mcp23x17Bus> Mcp23s17Array<B> {
    pub(crate) fn probe_with(
        config: &ArrayConfig,
        label: &'static str,
        mut make_bus: impl FnMut(u8) -> B,
    ) -> Result<Self, Error<B::BusError>> {
        if !(1..=0xff).contains(&config.present_mask) {
            log::error!("invalid present mask {:#x}", config.present_mask);
            return Err(Error::InvalidAddress(config.present_mask));
        }

        let mut chips: [Option<Chip<B>>; 8] = Default::default();
        let mut base = config.base;
        let mut ngpio = 0;
        for addr in 0..8u8 {
            if config.present_mask & (1 << addr) == 0 {
                continue;
            }
            let chip = Mcp23x17::probe_with_mutex(
                make_bus(addr),
                addr & 0b001 != 0,
                addr & 0b010 != 0,
                addr & 0b100 != 0,
                label,
                &config.chip(addr, base),
            )?;
            let n = chip.info().ngpio;
            if let Some(b) = base {
                base = Some(b.checked_add(u32::from(n)).ok_or_else(|| {
                    log::error!("{label}: pin numbers from {b} overflow");
                    Error::InvalidAddress(b)
                })?);
            }
            ngpio += n;
            chips[usize::from(addr)] = Some(chip);
        }
        log::debug!("{label}: {ngpio} pins at {:#04x}", config.present_mask);

        Ok(Self { chips, ngpio })
    }

    /// Chip at hardware address `addr`, if present.
    pub fn chip(&self, addr: u8) -> Option<&Chip<B>> {
        self.chips.get(usize::from(addr))?.as_ref()
    }

    /// Present chips with their hardware address, in address order.
    pub fn chips(&self) -> impl Iterator<Item = (u8, &Chip<B>)> {
        (0u8..)
            .zip(&self.chips)
            .filter_map(|(addr, chip)| Some((addr, chip.as_ref()?)))
    }

    /// Pins of all chips together.
    pub fn ngpio(&self) -> u16 {
        self.ngpio
    }
}
