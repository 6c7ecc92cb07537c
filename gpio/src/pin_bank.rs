//! Ownership of the output pins a parallel-bus peripheral needs.
use crate::{GpioDriver, GpioOutput, GpioResult};
use log::debug;

type OutputPin<'a> = Box<dyn GpioOutput + Send + 'a>;

/// The register-select, enable and data pins of a parallel bus, opened as outputs.
///
/// Every pin is owned exactly once. Dropping the bank (or calling [PinBank::release]) hands them
/// all back to the [GpioDriver].
#[derive(Debug)]
pub struct PinBank<'a> {
    register_select: OutputPin<'a>,
    enable: OutputPin<'a>,
    data: Vec<OutputPin<'a>>,
}

impl<'a> PinBank<'a> {
    /// Opens RS, then E, then the data pins in order.
    ///
    /// There are no retries. If any pin fails to open, the ones already opened are released
    /// before the error is returned.
    pub fn open(
        driver: &'a dyn GpioDriver,
        register_select: usize,
        enable: usize,
        data: &[usize],
    ) -> GpioResult<Self> {
        debug!(
            "Opening pins on {:?}: RS: {}, E: {}, Data: {:?}",
            driver, register_select, enable, data
        );

        let register_select = driver.open_output(register_select)?;
        let enable = driver.open_output(enable)?;
        let data = data
            .iter()
            .map(|&index| driver.open_output(index))
            .collect::<GpioResult<Vec<_>>>()?;

        Ok(PinBank {
            register_select,
            enable,
            data,
        })
    }

    pub fn register_select(&self) -> &(dyn GpioOutput + Send + 'a) {
        &*self.register_select
    }

    pub fn enable(&self) -> &(dyn GpioOutput + Send + 'a) {
        &*self.enable
    }

    /// Data pins, lowest bit first.
    pub fn data(&self) -> &[OutputPin<'a>] {
        &self.data
    }

    /// Releases every pin: RS, E, then the data pins in order.
    pub fn release(self) {
        let PinBank {
            register_select,
            enable,
            data,
        } = self;

        debug!(
            "Releasing pins RS: {}, E: {}, Data: {:?}",
            register_select.index(),
            enable.index(),
            data.iter().map(|pin| pin.index()).collect::<Vec<_>>()
        );

        drop(register_select);
        drop(enable);
        for pin in data {
            drop(pin);
        }
    }
}
