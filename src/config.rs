//! Bring-up configuration, the equivalent of board platform data.

/// Configuration of a single chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// First number of the chip's pins in the global GPIO numbering, `None` for dynamic.
    pub base: Option<u32>,
    /// Pins with the ~100k pull-up enabled (`GPPU`).
    pub pullups: u16,
    /// The chip acts as interrupt controller for its pins.
    pub irq_controller: bool,
    /// `INTA` and `INTB` are wired together (`IOCON.MIRROR`).  Only honoured for an
    /// interrupt controller.
    pub irq_mirror: bool,
    /// The interrupt output is active-high (`IOCON.INTPOL`).  Only honoured for an
    /// interrupt controller.
    pub irq_active_high: bool,
}

impl Config {
    /// Set the GPIO base.
    pub fn with_base(mut self, base: u32) -> Self {
        self.base = Some(base);
        self
    }

    /// Set the pull-up mask.
    pub fn with_pullups(mut self, pullups: u16) -> Self {
        self.pullups = pullups;
        self
    }

    /// Act as interrupt controller, with the given output wiring.
    pub fn with_irq_controller(mut self, mirror: bool, active_high: bool) -> Self {
        self.irq_controller = true;
        self.irq_mirror = mirror;
        self.irq_active_high = active_high;
        self
    }

    /// Mirror request as applied to `IOCON`.
    pub(crate) fn mirror(&self) -> bool {
        self.irq_controller && self.irq_mirror
    }

    /// Polarity as applied to `IOCON`.
    pub(crate) fn active_high(&self) -> bool {
        self.irq_controller && self.irq_active_high
    }
}

/// Configuration of up to eight `MCP23S17` sharing one SPI chip-select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayConfig {
    /// Bit `n` set if a chip with hardware address `n` is populated.  Must be in `1..=255`.
    pub present_mask: u32,
    /// GPIO base of the lowest populated address; the others follow in steps of 16.
    pub base: Option<u32>,
    /// Pull-up mask per hardware address.
    pub pullups: [u16; 8],
    /// See [`Config::irq_controller`].
    pub irq_controller: bool,
    /// See [`Config::irq_mirror`].
    pub irq_mirror: bool,
    /// See [`Config::irq_active_high`].
    pub irq_active_high: bool,
}

impl ArrayConfig {
    /// Chips at the addresses in `present_mask`, everything else default.
    pub fn new(present_mask: u32) -> Self {
        Self {
            present_mask,
            base: None,
            pullups: [0; 8],
            irq_controller: false,
            irq_mirror: false,
            irq_active_high: false,
        }
    }

    pub(crate) fn chip(&self, addr: u8, base: Option<u32>) -> Config {
        Config {
            base,
            pullups: self.pullups[addr as usize],
            irq_controller: self.irq_controller,
            irq_mirror: self.irq_mirror,
            irq_active_high: self.irq_active_high,
        }
    }
}
