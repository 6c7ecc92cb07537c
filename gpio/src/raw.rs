//! GPIO driver poking the BCM283x GPIO register block directly through a memory mapping.
use crate::ownership::PinOwnership;
use crate::{GpioDriver, GpioError, GpioOutput, GpioResult};
use log::trace;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;

/// Pin function select values of the GPFSELn registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
enum PinFunction {
    Input = 0b000,
    Output = 0b001,
}

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: PinOwnership,
}

impl RawGpioDriver {
    // 0x7e200000 on the bus, 0x3F200000 physical on BCM2837
    // const GPIO_BASE: u32 = 0xFE200000;
    const GPIO_BASE: u32 = 0x3F200000;

    const PIN_COUNT: usize = 58;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(4096)
            .map_raw(&file)?;

        Ok(RawGpioDriver {
            mmap,
            used_pins: PinOwnership::new(Self::PIN_COUNT),
        })
    }

    /// Maps `/dev/gpiomem`, which exposes only the GPIO block and needs no root.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    /// Maps the GPIO block out of `/dev/mem`. Needs root.
    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE as u64)
    }

    fn check_index(pin_index: usize) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::PinConfigInvalid(pin_index));
        }
        Ok(())
    }

    fn raw_set_pin_function(&self, pin_index: usize, function: PinFunction) -> GpioResult<()> {
        Self::check_index(pin_index)?;

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register
        let register_ptr = unsafe { mmap.add(pin_index / 10) };
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift); // Clear the bits for this pin
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        trace!("Set pin function: pin_index={} function={:?}", pin_index, function);

        Ok(())
    }

    fn raw_set_pin_output(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        Self::check_index(pin_index)?;

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPSETn/GPCLRn register
        let register_ptr = unsafe { mmap.add(if high { 0x1c / 4 } else { 0x28 / 4 } + pin_index / 32) };
        let shift = pin_index % 32;

        unsafe { register_ptr.write_volatile(1 << shift) };

        Ok(())
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn open_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + Send + '_>> {
        self.used_pins.claim(index, || {
            self.raw_set_pin_output(index, false)?;
            self.raw_set_pin_function(index, PinFunction::Output)
        })?;

        Ok(Box::new(RawGpioOutput {
            driver: self,
            pin_index: index,
        }))
    }
}

struct RawGpioOutput<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.pin_index)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn index(&self) -> usize {
        self.pin_index
    }

    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.raw_set_pin_output(self.pin_index, value)
    }
}

impl Drop for RawGpioOutput<'_> {
    fn drop(&mut self) {
        // Leave the line floating once we no longer own it
        self.driver.used_pins.release(self.pin_index, || {
            _ = self.driver.raw_set_pin_function(self.pin_index, PinFunction::Input);
        });
    }
}
