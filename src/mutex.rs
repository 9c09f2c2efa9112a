/// Common interface for mutex implementations guarding the driver state.
///
/// `port-expander-irq` needs a mutex to share the register cache between pins, the
/// interrupt configuration and the interrupt thread.  Pick `core::cell::RefCell` when
/// everything runs in one context and `std::sync::Mutex` (with the `std` feature) when
/// the chip is shared between threads.
///
/// The lock is only ever held for the duration of the closure passed to
/// [`PortMutex::lock`], so it is released on every exit path.
pub trait PortMutex {
    /// The actual port-expander state that is wrapped inside this mutex.
    type Port;

    /// Create a new mutex of this type.
    fn create(v: Self::Port) -> Self;

    /// Lock the mutex and give a closure access to the port-expander state inside.
    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R;

    /// Take the state back out of the mutex.
    fn into_inner(self) -> Self::Port;
}

impl<T> PortMutex for core::cell::RefCell<T> {
    type Port = T;

    fn create(v: Self::Port) -> Self {
        core::cell::RefCell::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R {
        let mut v = self.borrow_mut();
        f(&mut v)
    }

    fn into_inner(self) -> Self::Port {
        core::cell::RefCell::into_inner(self)
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> PortMutex for std::sync::Mutex<T> {
    type Port = T;

    fn create(v: Self::Port) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R {
        // a panic while holding the lock can only have left a stale cache entry behind,
        // which the next successful read or write overwrites
        let mut v = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut v)
    }

    fn into_inner(self) -> Self::Port {
        std::sync::Mutex::into_inner(self).unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::PortMutex;

    #[test]
    fn refcell_lock_gives_mutable_access() {
        let m: core::cell::RefCell<u16> = PortMutex::create(0x00ff);
        m.lock(|v| *v |= 0xff00);
        assert_eq!(m.lock(|v| *v), 0xffff);
    }

    #[test]
    fn std_mutex_recovers_from_poison() {
        let m: std::sync::Mutex<u16> = PortMutex::create(1);
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            PortMutex::lock(&m, |_| panic!("boom"));
        }));
        assert_eq!(PortMutex::lock(&m, |v| *v), 1);
    }
}
