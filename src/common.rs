pub trait PortDriver {
    type Error;

    /// Set all pins in `mask_high` to HIGH and all pins in `mask_low` to LOW.
    ///
    /// The new latch value is derived from the cached one and only committed to the cache
    /// once the bus write went through.
    fn set(&mut self, mask_high: u16, mask_low: u16) -> Result<(), Self::Error>;

    /// Check whether pins in `mask_high` were set HIGH and pins in `mask_low` were set LOW.
    ///
    /// For each pin in either of the masks, the returned `u16` has a 1 if it meets the
    /// expected state and a 0 otherwise.  Only the cached output latch is consulted.
    fn is_set(&self, mask_high: u16, mask_low: u16) -> u16;

    /// Check whether pins in `mask_high` are driven HIGH and pins in `mask_low` are driven LOW.
    ///
    /// Always reads the live input register; inputs change without the driver knowing.
    fn get(&mut self, mask_high: u16, mask_low: u16) -> Result<u16, Self::Error>;
}

pub trait PortDriverTotemPole: PortDriver {
    /// Set the direction for all pins in `mask` to direction `dir`.
    ///
    /// To prevent electrical glitches, when making pins outputs, the `state` is latched
    /// first and the direction is only changed if that succeeded.
    fn set_direction(&mut self, mask: u16, dir: Direction, state: bool) -> Result<(), Self::Error>;
}

/// Interrupt configuration of the port, buffered in the register cache until synced.
pub trait PortDriverIrq: PortDriver {
    /// Enable or disable interrupt-on-change for `mask` in the cached `GPINTEN`.
    fn set_irq_enabled(&mut self, mask: u16, enable: bool);

    /// Record the trigger for `mask` in the edge masks and the cached `INTCON`/`DEFVAL`.
    fn set_irq_type(&mut self, mask: u16, int_type: InterruptType);

    /// Write the cached `GPINTEN`, `DEFVAL` and `INTCON` to the device, in that order.
    ///
    /// All three writes are attempted even if an earlier one fails.
    fn sync_irq_config(&mut self) -> Result<(), Self::Error>;

    /// Read `INTF` and `INTCAP` and return the mask of pins that fired.
    fn fetch_interrupt_state(&mut self) -> Result<u16, Self::Error>;
}

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `IODIR` bit set.
    Input,
    /// `IODIR` bit clear.
    Output,
}

/// Trigger of a nested interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptType {
    /// Falling edge, compared against the previous pin value.
    Falling = 1,
    /// Rising edge, compared against the previous pin value.
    Rising,
    /// Any edge.
    Both,
    /// Level, fires while the pin is high (`DEFVAL` bit clear).
    High,
    /// Level, fires while the pin is low (`DEFVAL` bit set).
    Low,
}

impl TryFrom<u32> for InterruptType {
    type Error = u32;

    /// Decode raw trigger flags as handed out by an IRQ framework.
    ///
    /// When several flags are present the first match of both, rising, falling, high, low
    /// wins.
    fn try_from(flags: u32) -> Result<Self, u32> {
        if flags & trigger::EDGE_BOTH == trigger::EDGE_BOTH {
            Ok(InterruptType::Both)
        } else if flags & trigger::EDGE_RISING != 0 {
            Ok(InterruptType::Rising)
        } else if flags & trigger::EDGE_FALLING != 0 {
            Ok(InterruptType::Falling)
        } else if flags & trigger::LEVEL_HIGH != 0 {
            Ok(InterruptType::High)
        } else if flags & trigger::LEVEL_LOW != 0 {
            Ok(InterruptType::Low)
        } else {
            Err(flags)
        }
    }
}

/// Raw trigger flags accepted by [`IrqBatch::irq_set_type`].
pub mod trigger {
    /// No trigger requested.
    pub const NONE: u32 = 0x0;
    /// Rising edge.
    pub const EDGE_RISING: u32 = 0x1;
    /// Falling edge.
    pub const EDGE_FALLING: u32 = 0x2;
    /// Both edges.
    pub const EDGE_BOTH: u32 = EDGE_RISING | EDGE_FALLING;
    /// Active while high.
    pub const LEVEL_HIGH: u32 = 0x4;
    /// Active while low.
    pub const LEVEL_LOW: u32 = 0x8;
}

/// Static description of a GPIO chip as published to the rest of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioChipInfo {
    /// Chip name, e.g. `mcp23017`.
    pub label: &'static str,
    /// Number of the first pin in the global GPIO numbering, `None` for dynamic.
    pub base: Option<u32>,
    /// Number of pins.
    pub ngpio: u16,
    /// Pin accesses go over a bus and may block.
    pub can_sleep: bool,
}

/// Per-pin GPIO capability of a chip.
pub trait GpioChip {
    /// Error returned by the pin operations.
    type Error;

    /// Descriptor of the chip.
    fn info(&self) -> &GpioChipInfo;

    /// Make `offset` an input.
    fn direction_input(&self, offset: u8) -> Result<(), Self::Error>;

    /// Latch `value` on `offset`, then make it an output.
    fn direction_output(&self, offset: u8, value: bool) -> Result<(), Self::Error>;

    /// Read the current level of `offset`.
    fn get(&self, offset: u8) -> Result<bool, Self::Error>;

    /// Level last latched on `offset`, without touching the bus.
    fn is_set(&self, offset: u8) -> Result<bool, Self::Error>;

    /// Drive `offset` to `value`.
    fn set(&self, offset: u8, value: bool) -> Result<(), Self::Error>;
}

/// Per-pin interrupt configuration capability of a cascaded interrupt controller.
///
/// Configuration only updates buffered state and needs an [`IrqBatch`], which exists only
/// inside [`IrqChip::irq_bus_lock`]. The buffered state is committed to the hardware when
/// the closure returns.
///
/// ```compile_fail
/// use port_expander_irq::IrqChip;
///
/// fn unmask_outside_batch<C: IrqChip>(chip: &C) {
///     let _ = chip.irq_unmask(3);
/// }
/// ```
pub trait IrqChip: Sized {
    /// Error returned by the configuration calls.
    type Error;

    /// Disable the nested interrupt of `hwirq`.
    fn irq_mask(batch: &IrqBatch<'_, Self>, hwirq: u8) -> Result<(), Self::Error>;

    /// Enable the nested interrupt of `hwirq`.
    fn irq_unmask(batch: &IrqBatch<'_, Self>, hwirq: u8) -> Result<(), Self::Error>;

    /// Set the trigger of `hwirq` from raw [`trigger`] flags.
    fn irq_set_type(batch: &IrqBatch<'_, Self>, hwirq: u8, flags: u32)
        -> Result<(), Self::Error>;

    /// Run `f` as one configuration batch and commit it to the hardware afterwards.
    ///
    /// Batches on the same chip are serialized.
    fn irq_bus_lock<R, F>(&self, f: F) -> Result<R, Self::Error>
    where
        F: FnOnce(&IrqBatch<'_, Self>) -> R;
}

/// An open interrupt configuration batch on one chip.
///
/// Handed out by [`IrqChip::irq_bus_lock`] for the duration of the closure.
pub struct IrqBatch<'a, C> {
    chip: &'a C,
}

impl<'a, C: IrqChip> IrqBatch<'a, C> {
    /// Only called with the chip's batch lock held.
    pub(crate) fn new(chip: &'a C) -> Self {
        Self { chip }
    }

    /// The chip being configured.
    pub fn chip(&self) -> &'a C {
        self.chip
    }

    /// Disable the nested interrupt of `hwirq`.
    pub fn irq_mask(&self, hwirq: u8) -> Result<(), C::Error> {
        C::irq_mask(self, hwirq)
    }

    /// Enable the nested interrupt of `hwirq`.
    pub fn irq_unmask(&self, hwirq: u8) -> Result<(), C::Error> {
        C::irq_unmask(self, hwirq)
    }

    /// Set the trigger of `hwirq` from raw [`trigger`] flags.
    pub fn irq_set_type(&self, hwirq: u8, flags: u32) -> Result<(), C::Error> {
        C::irq_set_type(self, hwirq, flags)
    }
}

/// Pin Modes
pub mod mode {
    /// Trait for pin-modes which can be used to set a logic level.
    pub trait HasOutput {}
    /// Trait for pin-modes which can be used to read a logic level.
    pub trait HasInput {}

    /// Pin configured as an input.
    pub struct Input;
    impl HasInput for Input {}

    /// Pin configured as an output.
    pub struct Output;
    impl HasOutput for Output {}
}

#[cfg(test)]
mod tests {
    use super::{trigger, InterruptType};

    #[test]
    fn trigger_flags_decode_in_priority_order() {
        assert_eq!(InterruptType::try_from(trigger::EDGE_BOTH), Ok(InterruptType::Both));
        assert_eq!(InterruptType::try_from(trigger::EDGE_RISING), Ok(InterruptType::Rising));
        assert_eq!(InterruptType::try_from(trigger::EDGE_FALLING), Ok(InterruptType::Falling));
        assert_eq!(InterruptType::try_from(trigger::LEVEL_HIGH), Ok(InterruptType::High));
        assert_eq!(InterruptType::try_from(trigger::LEVEL_LOW), Ok(InterruptType::Low));
        // edge wins over level
        assert_eq!(
            InterruptType::try_from(trigger::EDGE_RISING | trigger::LEVEL_LOW),
            Ok(InterruptType::Rising)
        );
        assert_eq!(
            InterruptType::try_from(trigger::LEVEL_HIGH | trigger::LEVEL_LOW),
            Ok(InterruptType::High)
        );
    }

    #[test]
    fn unknown_trigger_flags_are_rejected() {
        assert_eq!(InterruptType::try_from(trigger::NONE), Err(0));
        assert_eq!(InterruptType::try_from(0x10), Err(0x10));
    }
}
