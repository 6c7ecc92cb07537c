//! GpiodDriver implementation requesting lines through the Linux GPIO character device.
use crate::ownership::PinOwnership;
use crate::{GpioDriver, GpioError, GpioOutput, GpioResult};
use std::fmt::{Debug, Formatter};
use std::io::ErrorKind;
use std::path::Path;

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage GPIO pins.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: PinOwnership,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        Self {
            chip,
            used_pins: PinOwnership::new(n),
        }
    }

    /// Opens the chip device at `path`, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        Ok(Self::new(gpiod::Chip::new(path.as_ref())?))
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn open_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + Send + '_>> {
        let line = self.used_pins.claim(index, || {
            self.chip
                .request_lines(
                    gpiod::Options::output([index as u32])
                        .values([false])
                        .consumer(env!("CARGO_PKG_NAME")),
                )
                .map_err(|err| match err.kind() {
                    // The kernel already handed the line to another consumer
                    ErrorKind::ResourceBusy => GpioError::PinUnavailable(index),
                    _ => err.into(),
                })
        })?;

        Ok(Box::new(GpiodOutput {
            driver: self,
            pin_index: index,
            line,
        }))
    }
}

struct GpiodOutput<'a> {
    driver: &'a GpiodDriver,
    pin_index: usize,
    line: gpiod::Lines<gpiod::Output>,
}

impl Debug for GpiodOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.pin_index)
    }
}

impl GpioOutput for GpiodOutput<'_> {
    fn index(&self) -> usize {
        self.pin_index
    }

    fn write(&self, value: bool) -> GpioResult<()> {
        self.line.set_values([value])?;
        Ok(())
    }
}

impl Drop for GpiodOutput<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.release(self.pin_index, || ());
    }
}
