//! Bookkeeping of which pins a driver has handed out.
use crate::{GpioError, GpioResult};
use bitvec::vec::BitVec;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The set of pins a driver has handed out.
///
/// Claiming checks and marks a pin under one lock, and the hardware setup passed to
/// [PinOwnership::claim] or [PinOwnership::release] runs under that same lock. Two threads
/// opening the same pin cannot both get it, and pin function registers shared between pins are
/// never read-modify-written concurrently.
#[derive(Debug)]
pub(crate) struct PinOwnership {
    used_pins: Mutex<BitVec>,
}

impl PinOwnership {
    pub fn new(count: usize) -> Self {
        PinOwnership {
            used_pins: Mutex::new(BitVec::repeat(false, count)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BitVec> {
        // Every update is a single bit store, so the map is consistent even after a panic
        self.used_pins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `index` as used if `open` succeeds.
    ///
    /// # Errors
    /// - `GpioError::PinConfigInvalid` if `index` is out of range.
    /// - `GpioError::PinUnavailable` if the pin is already claimed.
    /// - Whatever `open` returns. The pin stays free then.
    pub fn claim<T>(&self, index: usize, open: impl FnOnce() -> GpioResult<T>) -> GpioResult<T> {
        let mut used_pins = self.lock();
        if index >= used_pins.len() {
            return Err(GpioError::PinConfigInvalid(index));
        }
        if used_pins[index] {
            return Err(GpioError::PinUnavailable(index));
        }

        let opened = open()?;
        used_pins.set(index, true);
        Ok(opened)
    }

    /// Runs `close`, then frees `index`.
    pub fn release(&self, index: usize, close: impl FnOnce()) {
        let mut used_pins = self.lock();
        close();
        if index < used_pins.len() {
            used_pins.set(index, false);
        }
    }

    #[cfg(test)]
    pub fn is_used(&self, index: usize) -> bool {
        self.lock()[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn claim_and_release() {
        let pins = PinOwnership::new(8);

        pins.claim(3, || Ok(())).unwrap();
        assert!(pins.is_used(3));
        assert_eq!(pins.claim(3, || Ok(())), Err(GpioError::PinUnavailable(3)));

        pins.release(3, || ());
        assert!(!pins.is_used(3));
        assert_eq!(pins.claim(3, || Ok(3)), Ok(3));
    }

    #[test]
    fn out_of_range_is_invalid() {
        let pins = PinOwnership::new(8);

        assert_eq!(pins.claim(8, || Ok(())), Err(GpioError::PinConfigInvalid(8)));
    }

    #[test]
    fn failed_open_leaves_pin_free() {
        let pins = PinOwnership::new(8);

        let result: GpioResult<()> =
            pins.claim(2, || Err(GpioError::Io(std::io::ErrorKind::PermissionDenied)));

        assert_eq!(
            result,
            Err(GpioError::Io(std::io::ErrorKind::PermissionDenied))
        );
        assert!(!pins.is_used(2));
    }

    #[test]
    fn concurrent_claims_of_one_pin_hand_it_out_once() {
        let pins = PinOwnership::new(8);
        let opened = AtomicUsize::new(0);
        let inside = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let _ = pins.claim(5, || {
                        // No two setups may run at once
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        opened.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    });
                });
            }
        });

        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert!(pins.is_used(5));
    }

    #[test]
    fn setups_of_different_pins_do_not_overlap() {
        let pins = PinOwnership::new(8);
        let inside = AtomicUsize::new(0);

        thread::scope(|s| {
            for index in 0..8 {
                let pins = &pins;
                let inside = &inside;
                s.spawn(move || {
                    pins.claim(index, || {
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::sleep(Duration::from_millis(1));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
                });
            }
        });

        assert!((0..8).all(|index| pins.is_used(index)));
    }
}
