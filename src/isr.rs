//! Delivery of nested interrupts.
//!
//! The expander multiplexes the interrupts of its 16 pins onto one physical line.  An
//! [`IrqThread`] waits for that line to assert, lets the chip classify which pins fired
//! and hands each of them to an [`IrqDomain`], which maps the pin to a logical interrupt
//! number and runs its handler.
use core::future::poll_fn;
use core::sync::atomic::{AtomicU16, Ordering};
use core::task::{Context, Poll};

use embassy_sync::waitqueue::AtomicWaker;
use embedded_hal_async::digital::Wait;

/// Physical interrupt line of the expander.
pub trait ExtIPin: Wait {}

impl<T: Wait> ExtIPin for T {}

/// Mapping from pins of one chip to logical interrupt numbers, and their handlers.
pub trait IrqDomain {
    /// Logical interrupt number of `hwirq`, if one is mapped.
    fn find_mapping(&self, hwirq: u8) -> Option<u32>;

    /// Run the handler of `irq` in the calling context.
    fn handle_nested_irq(&mut self, irq: u32);
}

/// Domain with consecutive numbers starting at `base`, delivering to one callback.
pub struct LinearIrqDomain<F> {
    base: u32,
    handler: F,
}

impl<F: FnMut(u32)> LinearIrqDomain<F> {
    /// Map pin `n` to `base + n` and call `handler` for every delivered interrupt.
    ///
    /// Pins whose number would not fit in a `u32` stay unmapped.
    pub fn new(base: u32, handler: F) -> Self {
        Self { base, handler }
    }
}

impl<F: FnMut(u32)> IrqDomain for LinearIrqDomain<F> {
    fn find_mapping(&self, hwirq: u8) -> Option<u32> {
        if hwirq < 16 {
            self.base.checked_add(u32::from(hwirq))
        } else {
            None
        }
    }

    fn handle_nested_irq(&mut self, irq: u32) {
        (self.handler)(irq)
    }
}

/// Per-pin wakers, so tasks can `await` the nested interrupt of one pin.
///
/// Pin `n` maps to interrupt number `n`.  An interrupt delivered while nobody waits is
/// remembered until the next [`PinIrqWakers::wait`] on that pin.
pub struct PinIrqWakers {
    pending: AtomicU16,
    wakers: [AtomicWaker; 16],
}

impl Default for PinIrqWakers {
    fn default() -> Self {
        Self::new()
    }
}

impl PinIrqWakers {
    /// No interrupts pending, nobody waiting.
    pub const fn new() -> Self {
        Self {
            pending: AtomicU16::new(0),
            wakers: [const { AtomicWaker::new() }; 16],
        }
    }

    /// Mark `pin` as fired and wake its waiter.
    pub fn notify(&self, pin: u8) {
        if let Some(waker) = self.wakers.get(usize::from(pin)) {
            self.pending.fetch_or(1 << pin, Ordering::AcqRel);
            waker.wake();
        }
    }

    /// Consume a pending interrupt of `pin`, or register to be woken for it.
    ///
    /// A pin outside `0..16` never fires.
    pub fn poll_wait(&self, pin: u8, cx: &mut Context<'_>) -> Poll<()> {
        let Some(waker) = self.wakers.get(usize::from(pin)) else {
            return Poll::Pending;
        };
        waker.register(cx.waker());

        let bit = 1 << pin;
        if self.pending.fetch_and(!bit, Ordering::AcqRel) & bit != 0 {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }

    /// Wait for the next nested interrupt of `pin`.
    pub async fn wait(&self, pin: u8) {
        poll_fn(|cx| self.poll_wait(pin, cx)).await
    }
}

impl IrqDomain for &PinIrqWakers {
    fn find_mapping(&self, hwirq: u8) -> Option<u32> {
        (hwirq < 16).then_some(u32::from(hwirq))
    }

    fn handle_nested_irq(&mut self, irq: u32) {
        if let Ok(pin) = u8::try_from(irq) {
            self.notify(pin);
        }
    }
}

/// Outcome of one dispatch run.  The physical interrupt always counts as handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handled {
    /// Pins classified as fired.  Pins without a mapping in the domain count as well, they
    /// are just not delivered.
    pub fired: u16,
}

/// Chip that demultiplexes its interrupt line.
pub trait IrqHandler {
    /// Level of the asserted interrupt line.
    fn active_high(&self) -> bool;

    /// Classify the pending interrupts and deliver them to `domain`.
    fn handle_irq<D: IrqDomain>(&self, domain: &mut D) -> Handled;
}

/// Threaded handler of a chip's interrupt line.
///
/// Borrows the chip, so the registration always goes away before the chip does.
pub struct IrqThread<'a, C, P> {
    chip: &'a C,
    line: P,
}

impl<'a, C, P> IrqThread<'a, C, P>
where
    C: IrqHandler,
    P: ExtIPin,
{
    pub(crate) fn new(chip: &'a C, line: P) -> Self {
        Self { chip, line }
    }

    /// Wait until the line is asserted, then dispatch once.
    pub async fn handle_next<D: IrqDomain>(&mut self, domain: &mut D) -> Result<Handled, P::Error> {
        if self.chip.active_high() {
            self.line.wait_for_high().await?;
        } else {
            self.line.wait_for_low().await?;
        }
        Ok(self.chip.handle_irq(domain))
    }

    /// Dispatch forever, until waiting on the line fails.
    pub async fn run<D: IrqDomain>(&mut self, domain: &mut D) -> P::Error {
        loop {
            if let Err(e) = self.handle_next(domain).await {
                log::error!("interrupt line failed: {e:?}");
                return e;
            }
        }
    }

    /// Unregister and give back the interrupt line.
    pub fn free(self) -> P {
        self.line
    }
}
