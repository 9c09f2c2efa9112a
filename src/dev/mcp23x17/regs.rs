/// Logical 16-bit registers of the MCP23x17.
///
/// N.B.: The driver runs the chip with BANK=0 (the reset state), where port A of a
/// register sits at `reg << 1` and port B right after it, so every register is accessed
/// as one little-endian word: the lower byte is port A (pins 7..0), the upper byte port B
/// (pins 15..8).
///
/// For all registers, the reset value is 0x0000, except for IODIR which is 0xFFFF
/// (making all pins inputs) at reset.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    /// IODIR: input/output direction: 0=output; 1=input
    IODIR = 0x00,
    /// IPOL: input polarity: 0=register values match input pins; 1=opposite
    IPOL = 0x01,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    GPINTEN = 0x02,
    /// DEFVAL: default values for interrupt-on-change
    DEFVAL = 0x03,
    /// INTCON: interrupt-on-change config: 0=compare to previous pin value;
    ///   1=compare to corresponding bit in DEFVAL
    INTCON = 0x04,
    /// IOCON: configuration register, mirrored in both bytes, see [`iocon`]
    IOCON = 0x05,
    /// GPPU: GPIO pull-ups: enables weak internal pull-ups on each pin (when configured
    ///   as an input)
    GPPU = 0x06,
    /// INTF: interrupt flags: 0=no interrupt pending; 1=corresponding pin caused interrupt
    INTF = 0x07,
    /// INTCAP: interrupt captured value: reflects value of each pin at the time that they
    ///   caused an interrupt
    INTCAP = 0x08,
    /// GPIO: reflects logic level on pins
    GPIO = 0x09,
    /// OLAT: output latches: sets state for pins configured as outputs
    OLAT = 0x0a,
}

/// Number of registers in the map.
pub const REG_COUNT: usize = 11;

impl Reg {
    /// All registers in address order.
    pub const ALL: [Reg; REG_COUNT] = [
        Reg::IODIR,
        Reg::IPOL,
        Reg::GPINTEN,
        Reg::DEFVAL,
        Reg::INTCON,
        Reg::IOCON,
        Reg::GPPU,
        Reg::INTF,
        Reg::INTCAP,
        Reg::GPIO,
        Reg::OLAT,
    ];

    /// Position in the register cache.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Byte address of the port A half with BANK=0.
    pub const fn addr(self) -> u8 {
        (self as u8) << 1
    }
}

impl From<Reg> for u8 {
    fn from(r: Reg) -> u8 {
        r.addr()
    }
}

/// `IOCON` bits.  The register exists once per port, so each bit is also present at
/// `bit + 8` in the 16-bit value.
pub mod iocon {
    /// INTA and INTB are logically ORed
    pub const MIRROR: u16 = 1 << 6;
    /// Sequential operation disabled (address pointer does not increment)
    pub const SEQOP: u16 = 1 << 5;
    /// Hardware address enable (MCP23S17 only)
    pub const HAEN: u16 = 1 << 3;
    /// Interrupt pins are open-drain outputs
    pub const ODR: u16 = 1 << 2;
    /// Interrupt pins are active-high
    pub const INTPOL: u16 = 1 << 1;
    /// Reading INTCAP clears the interrupt (MCP23018 only)
    pub const INTCC: u16 = 1 << 0;

    /// `bits` in both the port A and the port B copy of `IOCON`.
    pub const fn both(bits: u16) -> u16 {
        bits | (bits << 8)
    }
}
