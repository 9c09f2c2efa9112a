use super::{pin_mask, Driver, IrqBusLock, Mcp23x17, Mcp23x17Bus};
use crate::{
    Error, ExtIPin, Handled, InterruptType, IrqBatch, IrqChip, IrqDomain, IrqHandler, IrqThread,
    PortDriverIrq, PortMutex,
};

impl<B, M, L> Mcp23x17<M, L>
where
    B: Mcp23x17Bus,
    M: PortMutex<Port = Driver<B>>,
    L: PortMutex<Port = IrqBusLock>,
{
    /// Register a threaded handler on the chip's interrupt output `line`.
    ///
    /// Only available when the chip was brought up as interrupt controller.
    pub fn request_threaded_irq<P: ExtIPin>(
        &self,
        line: P,
    ) -> Result<IrqThread<'_, Self, P>, Error<B::BusError>> {
        if !self.irq_controller {
            return Err(Error::NoIrqController);
        }
        Ok(IrqThread::new(self, line))
    }
}

impl<B, M, L> IrqChip for Mcp23x17<M, L>
where
    B: Mcp23x17Bus,
    M: PortMutex<Port = Driver<B>>,
    L: PortMutex<Port = IrqBusLock>,
{
    type Error = Error<B::BusError>;

    fn irq_mask(batch: &IrqBatch<'_, Self>, hwirq: u8) -> Result<(), Self::Error> {
        let mask = pin_mask(hwirq)?;
        batch.chip().driver.lock(|drv| drv.set_irq_enabled(mask, false));
        Ok(())
    }

    fn irq_unmask(batch: &IrqBatch<'_, Self>, hwirq: u8) -> Result<(), Self::Error> {
        let mask = pin_mask(hwirq)?;
        batch.chip().driver.lock(|drv| drv.set_irq_enabled(mask, true));
        Ok(())
    }

    fn irq_set_type(
        batch: &IrqBatch<'_, Self>,
        hwirq: u8,
        flags: u32,
    ) -> Result<(), Self::Error> {
        let mask = pin_mask(hwirq)?;
        let int_type = InterruptType::try_from(flags).map_err(Error::InvalidTrigger)?;
        batch.chip().driver.lock(|drv| drv.set_irq_type(mask, int_type));
        Ok(())
    }

    /// Runs `f` with the batch open, then commits `GPINTEN`, `DEFVAL` and `INTCON`.
    ///
    /// Calling it again from within `f` deadlocks (or panics, for `RefCell` locks). If `f`
    /// panics nothing is written; its buffered changes go out with the next commit.
    fn irq_bus_lock<R, F>(&self, f: F) -> Result<R, Self::Error>
    where
        F: FnOnce(&IrqBatch<'_, Self>) -> R,
    {
        self.irq_bus.lock(|_| {
            let r = f(&IrqBatch::new(self));
            self.driver
                .lock(|drv| drv.sync_irq_config())
                .inspect_err(|e| log::error!("{}: {e}", self.info.label))?;
            Ok(r)
        })
    }
}

impl<B, M, L> IrqHandler for Mcp23x17<M, L>
where
    B: Mcp23x17Bus,
    M: PortMutex<Port = Driver<B>>,
    L: PortMutex<Port = IrqBusLock>,
{
    fn active_high(&self) -> bool {
        self.irq_active_high
    }

    fn handle_irq<D: IrqDomain>(&self, domain: &mut D) -> Handled {
        let fired = match self.driver.lock(|drv| drv.fetch_interrupt_state()) {
            Ok(fired) => fired,
            Err(e) => {
                log::warn!("{}: can't read interrupt state: {e}", self.info.label);
                return Handled { fired: 0 };
            }
        };

        for pin in (0..16).filter(|pin| fired & (1 << pin) != 0) {
            match domain.find_mapping(pin) {
                Some(irq) => domain.handle_nested_irq(irq),
                None => log::debug!("{}: no mapping for pin {pin}", self.info.label),
            }
        }
        Handled { fired }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::super::fake::{FakeBusError, FakeChip};
    use super::super::{iocon, Reg, SyncMcp23x17};
    use super::*;
    use crate::{trigger, Config, CommitErrors, LinearIrqDomain};

    fn controller(chip: &FakeChip) -> Mcp23x17<RefCell<Driver<FakeChip>>> {
        chip.set(Reg::IOCON, iocon::both(iocon::HAEN));
        let config = Config::default().with_irq_controller(false, false);
        let dev = Mcp23x17::probe_with_mutex(chip.clone(), false, false, false, "fake", &config)
            .unwrap();
        chip.clear_writes();
        dev
    }

    fn dispatch<C: IrqHandler>(dev: &C) -> (Handled, Vec<u32>) {
        let mut seen = Vec::new();
        let handled = dev.handle_irq(&mut LinearIrqDomain::new(100, |irq| seen.push(irq)));
        (handled, seen)
    }

    #[test]
    fn batch_waits_for_the_open_one() {
        let chip = FakeChip::new();
        chip.set(Reg::IOCON, iocon::both(iocon::HAEN));
        let config = Config::default().with_irq_controller(false, false);
        let dev: SyncMcp23x17<FakeChip> =
            Mcp23x17::probe_with_mutex(chip.clone(), false, false, false, "fake", &config).unwrap();
        chip.clear_writes();

        let (opened, wait_open) = std::sync::mpsc::channel();
        std::thread::scope(|s| {
            s.spawn(|| {
                dev.irq_bus_lock(|batch| {
                    opened.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(20));
                    batch.irq_unmask(3).unwrap();
                })
                .unwrap();
            });
            wait_open.recv().unwrap();
            dev.irq_bus_lock(|batch| batch.irq_set_type(5, trigger::LEVEL_LOW).unwrap())
                .unwrap();
        });

        // the open batch commits only its own change
        assert_eq!(
            chip.writes(),
            [
                (Reg::GPINTEN, 0x0008),
                (Reg::DEFVAL, 0x0000),
                (Reg::INTCON, 0x0000),
                (Reg::GPINTEN, 0x0008),
                (Reg::DEFVAL, 0x0020),
                (Reg::INTCON, 0x0020),
            ]
        );
    }

    #[test]
    fn panicking_batch_releases_the_lock() {
        let chip = FakeChip::new();
        chip.set(Reg::IOCON, iocon::both(iocon::HAEN));
        let config = Config::default().with_irq_controller(false, false);
        let dev: SyncMcp23x17<FakeChip> =
            Mcp23x17::probe_with_mutex(chip.clone(), false, false, false, "fake", &config).unwrap();
        chip.clear_writes();

        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            dev.irq_bus_lock(|batch| {
                batch.irq_unmask(1).unwrap();
                panic!("handler bug");
            })
        }));
        assert!(r.is_err());
        assert!(chip.writes().is_empty());

        dev.irq_bus_lock(|batch| batch.irq_unmask(3).unwrap()).unwrap();
        assert_eq!(dev.cached(Reg::GPINTEN), 0x000a);
        assert_eq!(chip.writes()[0], (Reg::GPINTEN, 0x000a));
    }

    #[test]
    fn batch_commits_once_in_order() {
        let chip = FakeChip::new();
        let dev = controller(&chip);
        let r = dev
            .irq_bus_lock(|batch| {
                batch.irq_set_type(2, trigger::LEVEL_LOW).unwrap();
                batch.irq_unmask(2).unwrap();
                batch.irq_set_type(0, trigger::EDGE_RISING).unwrap();
                batch.irq_unmask(0).unwrap();
                assert!(chip.writes().is_empty());
                42
            })
            .unwrap();
        assert_eq!(r, 42);
        assert_eq!(
            chip.writes(),
            [(Reg::GPINTEN, 0b101), (Reg::DEFVAL, 0b100), (Reg::INTCON, 0b100)]
        );
    }

    #[test]
    fn invalid_arguments_inside_batch() {
        let chip = FakeChip::new();
        let dev = controller(&chip);
        dev.irq_bus_lock(|batch| {
            assert_eq!(batch.irq_set_type(1, trigger::NONE), Err(Error::InvalidTrigger(0)));
            assert_eq!(batch.irq_set_type(1, 0x30), Err(Error::InvalidTrigger(0x30)));
            assert_eq!(batch.irq_unmask(16), Err(Error::InvalidPin(16)));
        })
        .unwrap();
        assert_eq!(dev.cached(Reg::GPINTEN), 0);
        assert_eq!(dev.cached(Reg::INTCON), 0);
    }

    #[test]
    fn failed_commit_reports_every_write() {
        let chip = FakeChip::new();
        let dev = controller(&chip);
        chip.fail_write(Reg::DEFVAL, true);
        let err = dev.irq_bus_lock(|batch| batch.irq_unmask(7).unwrap()).unwrap_err();
        assert_eq!(
            err,
            Error::Commit(CommitErrors { gpinten: None, defval: Some(FakeBusError), intcon: None })
        );
        assert_eq!(chip.writes(), [(Reg::GPINTEN, 0x0080), (Reg::INTCON, 0x0000)]);

        // the lock was released, the next batch goes through
        chip.fail_write(Reg::DEFVAL, false);
        dev.irq_bus_lock(|batch| batch.irq_mask(7).unwrap()).unwrap();
    }

    #[test]
    fn dispatch_rising_edge() {
        let chip = FakeChip::new();
        let dev = controller(&chip);
        dev.irq_bus_lock(|batch| {
            batch.irq_set_type(0, trigger::EDGE_RISING).unwrap();
            batch.irq_unmask(0).unwrap();
        })
        .unwrap();

        chip.set(Reg::INTF, 0b1);
        chip.set(Reg::INTCAP, 0b1);
        assert_eq!(dispatch(&dev), (Handled { fired: 0b1 }, vec![100]));

        // pin went low again, not a rising edge
        chip.set(Reg::INTCAP, 0b0);
        assert_eq!(dispatch(&dev), (Handled { fired: 0 }, vec![]));
    }

    #[test]
    fn dispatch_level_ignores_capture() {
        let chip = FakeChip::new();
        let dev = controller(&chip);
        dev.irq_bus_lock(|batch| {
            batch.irq_set_type(2, trigger::LEVEL_HIGH).unwrap();
            batch.irq_set_type(9, trigger::EDGE_BOTH).unwrap();
        })
        .unwrap();

        chip.set(Reg::INTF, 0b10_0000_0100);
        chip.set(Reg::INTCAP, 0b00_0000_0000);
        assert_eq!(dispatch(&dev), (Handled { fired: 0b10_0000_0100 }, vec![102, 109]));
        assert_eq!(dev.cached(Reg::INTF), 0b10_0000_0100);
    }

    #[test]
    fn dispatch_swallows_read_failures() {
        let chip = FakeChip::new();
        let dev = controller(&chip);
        dev.irq_bus_lock(|batch| batch.irq_set_type(2, trigger::LEVEL_HIGH).unwrap()).unwrap();
        chip.set(Reg::INTF, 0b100);

        chip.fail_read(Reg::INTF, true);
        assert_eq!(dispatch(&dev), (Handled { fired: 0 }, vec![]));
        chip.fail_read(Reg::INTF, false);

        chip.fail_read(Reg::INTCAP, true);
        assert_eq!(dispatch(&dev), (Handled { fired: 0 }, vec![]));
    }

    #[test]
    fn dispatch_skips_unmapped_pins() {
        struct LowPins(Vec<u32>);
        impl IrqDomain for LowPins {
            fn find_mapping(&self, hwirq: u8) -> Option<u32> {
                (hwirq < 8).then_some(u32::from(hwirq))
            }
            fn handle_nested_irq(&mut self, irq: u32) {
                self.0.push(irq)
            }
        }

        let chip = FakeChip::new();
        let dev = controller(&chip);
        dev.irq_bus_lock(|batch| batch.irq_set_type(0, trigger::LEVEL_LOW).unwrap()).unwrap();
        dev.irq_bus_lock(|batch| batch.irq_set_type(12, trigger::LEVEL_LOW).unwrap()).unwrap();
        chip.set(Reg::INTF, 0x1001);

        let mut domain = LowPins(Vec::new());
        assert_eq!(dev.handle_irq(&mut domain), Handled { fired: 0x1001 });
        assert_eq!(domain.0, [0]);
    }

    #[test]
    fn threaded_irq_needs_controller_role() {
        let chip = FakeChip::new();
        chip.set(Reg::IOCON, iocon::both(iocon::HAEN));
        let dev: Mcp23x17<RefCell<Driver<FakeChip>>> =
            Mcp23x17::probe_with_mutex(chip, false, false, false, "fake", &Config::default()).unwrap();
        assert!(matches!(dev.request_threaded_irq(IdleLine), Err(Error::NoIrqController)));

        let dev = controller(&FakeChip::new());
        let thread = dev.request_threaded_irq(IdleLine).unwrap();
        assert!(matches!(thread.free(), IdleLine));
    }

    struct IdleLine;

    impl embedded_hal::digital::ErrorType for IdleLine {
        type Error = core::convert::Infallible;
    }

    impl embedded_hal_async::digital::Wait for IdleLine {
        async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
            core::future::pending().await
        }

        async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
            core::future::pending().await
        }

        async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
            core::future::pending().await
        }

        async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
            core::future::pending().await
        }

        async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
            core::future::pending().await
        }
    }

    #[test]
    fn concurrent_batches_are_serialized() {
        let chip = FakeChip::new();
        chip.set(Reg::IOCON, iocon::both(iocon::HAEN));
        let config = Config::default().with_irq_controller(false, false);
        let dev: SyncMcp23x17<FakeChip> =
            Mcp23x17::probe_with_mutex(chip.clone(), false, false, false, "fake", &config).unwrap();
        chip.clear_writes();

        let entered = Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for pin in [3u8, 11] {
                let (dev, entered, chip) = (&dev, &entered, &chip);
                s.spawn(move || {
                    dev.irq_bus_lock(|batch| {
                        // nothing of another batch may be on the wire while this one is open
                        let before = chip.writes().len();
                        entered.lock().unwrap().push(pin);
                        batch.irq_set_type(pin, trigger::LEVEL_LOW).unwrap();
                        std::thread::sleep(Duration::from_millis(20));
                        batch.irq_unmask(pin).unwrap();
                        assert_eq!(chip.writes().len(), before);
                    })
                    .unwrap();
                });
            }
        });

        let order = entered.into_inner().unwrap();
        let first = 1u16 << order[0];
        let both = (1u16 << 3) | (1 << 11);
        let writes = chip.writes();
        assert_eq!(
            writes,
            [
                (Reg::GPINTEN, first),
                (Reg::DEFVAL, first),
                (Reg::INTCON, first),
                (Reg::GPINTEN, both),
                (Reg::DEFVAL, both),
                (Reg::INTCON, both),
            ]
        );
    }
}
