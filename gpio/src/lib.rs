pub mod delay;
pub mod gpiod;
pub mod lcd;
mod ownership;
pub mod pin_bank;
pub mod raw;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    /// The pin is already owned, either by this process or by another consumer.
    #[error("pin {0} is already in use")]
    PinUnavailable(usize),
    /// The pin number is outside the range of pins the host provides.
    #[error("pin {0} is not a valid pin on this host")]
    PinConfigInvalid(usize),
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A source of GPIO output pins.
///
/// Implementations track which pins are currently handed out and refuse to open the same pin
/// twice. A pin becomes available again once its [GpioOutput] handle is dropped.
pub trait GpioDriver: Debug + Sync {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Opens the GPIO pin at the given index as an output.
    ///
    /// # Errors
    /// - `GpioError::PinConfigInvalid` if the index is not lower than [Self::count].
    /// - `GpioError::PinUnavailable` if the pin is already owned.
    fn open_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + Send + '_>>;
}

pub trait GpioOutput: Debug {
    /// Gets the index of the pin this output drives.
    fn index(&self) -> usize;

    /// Writes the state of the GPIO pin.
    ///
    /// `true` drives the pin high, `false` drives it low.
    fn write(&self, value: bool) -> GpioResult<()>;
}

impl dyn GpioOutput + Send + '_ {
    /// Writes the bit of `value` at `bit` to this pin.
    pub fn write_bit(&self, value: u8, bit: usize) -> GpioResult<()> {
        self.write(value & (1 << bit) != 0)
    }
}
