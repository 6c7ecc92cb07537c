use crate::delay::Delay;
use crate::lcd::hd44780::config::PinAssignment;
use crate::lcd::hd44780::driver::{
    DisplayGeometry, FOUR_BIT_INIT_SEQUENCE, HD44780Driver, HD44780Error, HD44780Result, Register,
    TransferMode, WRITE_DELAY,
};
use crate::pin_bank::PinBank;
use crate::{GpioDriver, GpioResult};
use log::{debug, trace};
use std::time::Duration;

/// An HD44780 wired to plain GPIO outputs, with the R/W line tied to ground.
///
/// Owns its pins for its whole life. [GpioHD44780Driver::dispose] clears the screen and releases
/// them.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a, D: Delay> {
    pins: PinBank<'a>,
    mode: TransferMode,
    geometry: DisplayGeometry,
    delay: D,
}

impl<'a, D: Delay> GpioHD44780Driver<'a, D> {
    /// Opens the pins of `assignment` as outputs.
    ///
    /// The controller is left untouched until [HD44780Driver::init] is called.
    pub fn open(
        gpio: &'a dyn GpioDriver,
        assignment: &PinAssignment,
        geometry: DisplayGeometry,
        delay: D,
    ) -> GpioResult<Self> {
        let pins = PinBank::open(
            gpio,
            assignment.register_select,
            assignment.enable,
            assignment.data.as_slice(),
        )?;

        Ok(GpioHD44780Driver {
            pins,
            mode: assignment.data.mode(),
            geometry,
            delay,
        })
    }

    /// Clears the display and releases every pin.
    ///
    /// The pins are released even when clearing fails.
    pub fn dispose(mut self) -> GpioResult<()> {
        debug!("Disposing {:?} HD44780", self.mode);
        let cleared = self.clear_display();
        self.pins.release();
        cleared
    }
}

impl<D: Delay> HD44780Driver for GpioHD44780Driver<'_, D> {
    fn mode(&self) -> TransferMode {
        self.mode
    }

    fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    fn init(&mut self) -> HD44780Result<()> {
        match self.mode {
            TransferMode::FourBit => {
                for (nibble, wait) in FOUR_BIT_INIT_SEQUENCE {
                    self.strobe(Register::Instruction, nibble)?;
                    self.wait(wait);
                }
                Ok(())
            }
            TransferMode::EightBit => Err(HD44780Error::UnsupportedMode(TransferMode::EightBit)),
        }
    }

    fn wait(&self, duration: Duration) {
        self.delay.delay(duration);
    }

    fn strobe(&mut self, register: Register, bits: u8) -> GpioResult<()> {
        let rs = register.rs_level();
        trace!(
            "Strobing {:0width$b}, RS: {}",
            bits,
            rs,
            width = self.mode.data_width()
        );

        // E high, select the register
        self.pins.enable().write(true)?;
        self.pins.register_select().write(rs)?;

        for (i, pin) in self.pins.data().iter().enumerate() {
            pin.write_bit(bits, i)?;
        }

        // The falling edge on E latches the transfer
        self.pins.enable().write(false)?;
        self.pins.register_select().write(rs)?;

        Ok(())
    }

    fn write_value(&mut self, register: Register, value: u8) -> GpioResult<()> {
        match self.mode {
            TransferMode::FourBit => {
                let high_nibble = (value >> 4) & 0x0F;
                let low_nibble = value & 0x0F;
                trace!("Writing HN: {:04b}", high_nibble);
                self.strobe(register, high_nibble)?;
                trace!("Writing LN: {:04b}", low_nibble);
                self.strobe(register, low_nibble)?;
            }
            TransferMode::EightBit => {
                self.strobe(register, value)?;
            }
        }

        self.wait(WRITE_DELAY);
        Ok(())
    }
}
