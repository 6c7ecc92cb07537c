//! Recording GPIO driver and delay used by the unit tests.
use crate::delay::Delay;
use crate::{GpioDriver, GpioError, GpioOutput, GpioResult};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    Open(usize),
    Write(usize, bool),
    Release(usize),
    Delay(Duration),
}

/// Shared, ordered log of everything the driver and delay did.
#[derive(Clone, Debug, Default)]
pub struct Trace(Arc<Mutex<Vec<Event>>>);

impl Trace {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub struct MockGpioDriver {
    count: usize,
    used_pins: Mutex<Vec<bool>>,
    writes_left: AtomicUsize,
    pub trace: Trace,
}

impl MockGpioDriver {
    pub fn new(count: usize) -> Self {
        MockGpioDriver {
            count,
            used_pins: Mutex::new(vec![false; count]),
            writes_left: AtomicUsize::new(usize::MAX),
            trace: Trace::default(),
        }
    }

    /// Lets `writes` more pin writes succeed, failing every write after that.
    pub fn fail_after(&self, writes: usize) {
        self.writes_left.store(writes, Ordering::SeqCst);
    }

    pub fn stop_failing(&self) {
        self.writes_left.store(usize::MAX, Ordering::SeqCst);
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.used_pins.lock().unwrap()[index]
    }

    pub fn used_count(&self) -> usize {
        self.used_pins.lock().unwrap().iter().filter(|&&used| used).count()
    }

    pub fn delay(&self) -> RecordingDelay {
        RecordingDelay {
            trace: self.trace.clone(),
        }
    }
}

impl Debug for MockGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGpioDriver({})", self.count)
    }
}

impl GpioDriver for MockGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.count)
    }

    fn open_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + Send + '_>> {
        if index >= self.count {
            return Err(GpioError::PinConfigInvalid(index));
        }

        let mut used = self.used_pins.lock().unwrap();
        if used[index] {
            return Err(GpioError::PinUnavailable(index));
        }
        used[index] = true;
        self.trace.push(Event::Open(index));

        Ok(Box::new(MockOutput {
            driver: self,
            index,
        }))
    }
}

struct MockOutput<'a> {
    driver: &'a MockGpioDriver,
    index: usize,
}

impl Debug for MockOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.index)
    }
}

impl GpioOutput for MockOutput<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn write(&self, value: bool) -> GpioResult<()> {
        let left = self.driver.writes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(GpioError::Io(std::io::ErrorKind::BrokenPipe));
        }
        if left != usize::MAX {
            self.driver.writes_left.store(left - 1, Ordering::SeqCst);
        }
        self.driver.trace.push(Event::Write(self.index, value));
        Ok(())
    }
}

impl Drop for MockOutput<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.lock().unwrap()[self.index] = false;
        self.driver.trace.push(Event::Release(self.index));
    }
}

#[derive(Clone, Debug)]
pub struct RecordingDelay {
    trace: Trace,
}

impl Delay for RecordingDelay {
    fn delay(&self, duration: Duration) {
        self.trace.push(Event::Delay(duration));
    }
}
