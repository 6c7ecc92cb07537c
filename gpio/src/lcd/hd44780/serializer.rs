use log::warn;
use std::fmt::{Debug, Formatter};
use std::sync::{Mutex, PoisonError};

/// Lets at most one caller at a time use the wrapped value.
///
/// Used around whole message writes, so the strobes of two messages never interleave on the bus.
/// The slot is freed on every exit path. A caller that panicked while holding it does not lock
/// everyone else out: the next caller gets the value as it was left.
pub struct WriteSerializer<T> {
    slot: Mutex<T>,
}

impl<T> WriteSerializer<T> {
    pub fn new(value: T) -> Self {
        WriteSerializer {
            slot: Mutex::new(value),
        }
    }

    /// Waits for the slot, then runs `f` with exclusive access to the value.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.slot.lock().unwrap_or_else(|poisoned| {
            warn!("Previous write panicked, continuing anyway");
            poisoned.into_inner()
        });
        f(&mut guard)
    }

    pub fn into_inner(self) -> T {
        self.slot.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Debug> Debug for WriteSerializer<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.slot.try_lock() {
            Ok(value) => write!(f, "WriteSerializer({:?})", &*value),
            Err(_) => write!(f, "WriteSerializer(<busy>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn holders_never_overlap() {
        let serializer = WriteSerializer::new(Vec::new());

        thread::scope(|s| {
            for id in 0..4 {
                let serializer = &serializer;
                s.spawn(move || {
                    serializer.with_lock(|log: &mut Vec<(usize, usize)>| {
                        for step in 0..5 {
                            log.push((id, step));
                            thread::sleep(Duration::from_millis(1));
                        }
                    });
                });
            }
        });

        let log = serializer.into_inner();
        assert_eq!(log.len(), 20);
        for block in log.chunks(5) {
            let id = block[0].0;
            assert_eq!(
                block,
                &(0..5).map(|step| (id, step)).collect::<Vec<_>>()[..]
            );
        }
    }

    #[test]
    fn error_result_frees_the_slot() {
        let serializer = WriteSerializer::new(0);

        let result: Result<(), &str> = serializer.with_lock(|value| {
            *value += 1;
            Err("failed")
        });
        assert!(result.is_err());

        serializer.with_lock(|value| *value += 1);
        assert_eq!(serializer.into_inner(), 2);
    }

    #[test]
    fn panic_does_not_lock_out_later_writers() {
        let serializer = WriteSerializer::new(0);

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            serializer.with_lock(|value| {
                *value = 1;
                if *value == 1 {
                    panic!("write failed halfway");
                }
            })
        }));
        assert!(panicked.is_err());

        assert_eq!(serializer.with_lock(|value| *value), 1);
        assert_eq!(serializer.into_inner(), 1);
    }
}
