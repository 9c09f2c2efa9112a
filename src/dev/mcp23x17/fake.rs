//! In-memory chip for register-level tests.

use std::sync::{Arc, Mutex};
use std::vec::Vec;

use super::bus::Mcp23x17Bus;
use super::regs::{Reg, REG_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeBusError;

#[derive(Debug, Default)]
pub struct FakeState {
    pub regs: [u16; REG_COUNT],
    pub writes: Vec<(Reg, u16)>,
    pub fail_reads: u16,
    pub fail_writes: u16,
}

/// Shared handle; clones talk to the same chip.
#[derive(Debug, Clone, Default)]
pub struct FakeChip(Arc<Mutex<FakeState>>);

impl FakeChip {
    /// Chip in its power-on state.
    pub fn new() -> Self {
        let chip = Self::default();
        chip.set(Reg::IODIR, 0xffff);
        chip
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.0.lock().unwrap())
    }

    pub fn set(&self, reg: Reg, value: u16) {
        self.with(|s| s.regs[reg.index()] = value);
    }

    pub fn get(&self, reg: Reg) -> u16 {
        self.with(|s| s.regs[reg.index()])
    }

    pub fn fail_read(&self, reg: Reg, fail: bool) {
        self.with(|s| toggle(&mut s.fail_reads, reg, fail));
    }

    pub fn fail_write(&self, reg: Reg, fail: bool) {
        self.with(|s| toggle(&mut s.fail_writes, reg, fail));
    }

    pub fn writes(&self) -> Vec<(Reg, u16)> {
        self.with(|s| s.writes.clone())
    }

    pub fn clear_writes(&self) {
        self.with(|s| s.writes.clear());
    }
}

fn toggle(mask: &mut u16, reg: Reg, on: bool) {
    if on {
        *mask |= 1 << reg.index();
    } else {
        *mask &= !(1 << reg.index());
    }
}

impl Mcp23x17Bus for FakeChip {
    type BusError = FakeBusError;

    fn write_reg(&mut self, _addr: u8, reg: Reg, value: u16) -> Result<(), Self::BusError> {
        self.with(|s| {
            if s.fail_writes & (1 << reg.index()) != 0 {
                return Err(FakeBusError);
            }
            s.regs[reg.index()] = value;
            s.writes.push((reg, value));
            Ok(())
        })
    }

    fn read_reg(&mut self, _addr: u8, reg: Reg) -> Result<u16, Self::BusError> {
        self.with(|s| {
            if s.fail_reads & (1 << reg.index()) != 0 {
                return Err(FakeBusError);
            }
            Ok(s.regs[reg.index()])
        })
    }
}
