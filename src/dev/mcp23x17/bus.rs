use embedded_hal::i2c::I2c;
use embedded_hal::spi::{Operation, SpiDevice};

use super::regs::{Reg, REG_COUNT};

// We need these newtype wrappers since we can't implement `Mcp23x17Bus` for both `I2c` and
// `SpiDevice` at the same time
/// `MCP23017` transport: 16-bit registers over I2C.
pub struct Mcp23017Bus<I2C>(pub(crate) I2C);
/// `MCP23S17` transport: 16-bit registers over SPI.
pub struct Mcp23S17Bus<SPI>(pub(crate) SPI);

/// Register transport of the Mcp23x17.
///
/// `addr` is the I2C address (`0x20 | A2A1A0`); the SPI variant derives its opcode from
/// it.  Values are whole 16-bit registers, port A in the lower byte.
pub trait Mcp23x17Bus {
    /// Error of the underlying bus.
    type BusError: core::fmt::Debug;

    /// Write both halves of `reg`.
    fn write_reg(&mut self, addr: u8, reg: Reg, value: u16) -> Result<(), Self::BusError>;

    /// Read both halves of `reg`.
    fn read_reg(&mut self, addr: u8, reg: Reg) -> Result<u16, Self::BusError>;

    /// Read `values.len()` consecutive registers starting at `start`.
    ///
    /// The default reads one register at a time.  Entries past the end of the register
    /// map are left alone.
    fn read_regs(&mut self, addr: u8, start: Reg, values: &mut [u16]) -> Result<(), Self::BusError> {
        for (value, reg) in values.iter_mut().zip(&Reg::ALL[start.index()..]) {
            *value = self.read_reg(addr, *reg)?;
        }
        Ok(())
    }
}

impl<I2C> Mcp23017Bus<I2C> {
    /// Give back the I2C bus.
    pub fn into_inner(self) -> I2C {
        self.0
    }
}

impl<SPI> Mcp23S17Bus<SPI> {
    /// Give back the SPI device.
    pub fn into_inner(self) -> SPI {
        self.0
    }

    fn opcode(addr: u8) -> u8 {
        0x40 | addr << 1
    }
}

impl<SPI: SpiDevice> Mcp23x17Bus for Mcp23S17Bus<SPI> {
    type BusError = SPI::Error;

    fn write_reg(&mut self, addr: u8, reg: Reg, value: u16) -> Result<(), Self::BusError> {
        let [lo, hi] = value.to_le_bytes();
        self.0.write(&[Self::opcode(addr), reg.addr(), lo, hi])?;

        Ok(())
    }

    fn read_reg(&mut self, addr: u8, reg: Reg) -> Result<u16, Self::BusError> {
        let mut val = [0; 2];
        let write = [Self::opcode(addr) | 0x1, reg.addr()];
        let mut tx = [Operation::Write(&write), Operation::Read(&mut val)];
        self.0.transaction(&mut tx)?;

        Ok(u16::from_le_bytes(val))
    }

    /// One sequential read; relies on `IOCON.SEQOP` being clear.
    fn read_regs(&mut self, addr: u8, start: Reg, values: &mut [u16]) -> Result<(), Self::BusError> {
        let count = values.len().min(REG_COUNT - start.index());
        let mut buf = [0; 2 * REG_COUNT];
        let write = [Self::opcode(addr) | 0x1, start.addr()];
        let mut tx = [
            Operation::Write(&write),
            Operation::Read(&mut buf[..2 * count]),
        ];
        self.0.transaction(&mut tx)?;

        for (value, word) in values.iter_mut().zip(buf[..2 * count].chunks_exact(2)) {
            *value = u16::from_le_bytes([word[0], word[1]]);
        }
        Ok(())
    }
}

impl<I2C: I2c> Mcp23x17Bus for Mcp23017Bus<I2C> {
    type BusError = I2C::Error;

    fn write_reg(&mut self, addr: u8, reg: Reg, value: u16) -> Result<(), Self::BusError> {
        let [lo, hi] = value.to_le_bytes();
        self.0.write(addr, &[reg.addr(), lo, hi])
    }

    fn read_reg(&mut self, addr: u8, reg: Reg) -> Result<u16, Self::BusError> {
        let mut val = [0; 2];
        self.0.write_read(addr, &[reg.addr()], &mut val)?;
        Ok(u16::from_le_bytes(val))
    }
}
