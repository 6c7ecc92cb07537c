mod gpio;

use crate::{GpioError, GpioResult};
pub use gpio::*;
#[cfg(test)]
pub(crate) use gpio::tests;
use log::warn;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;

/// Clears the display and sets the cursor to the home position.
pub const CLEAR_DISPLAY: u8 = 0b00000001;
/// Sets the DDRAM address to 0x40, the start of the second line.
pub const NEW_LINE: u8 = 0b11000000;

/// Execution time of [CLEAR_DISPLAY].
pub const CLEAR_DISPLAY_DELAY: Duration = Duration::from_micros(1640);
/// Execution time of a standard instruction or data write.
pub const WRITE_DELAY: Duration = Duration::from_micros(40);
/// Pause after each character of a message.
pub const CHARACTER_DELAY: Duration = Duration::from_millis(1);

/// Power-on sequence for the 4-bit interface, as raw instruction nibbles and the wait after each.
///
/// The first four nibbles are sent before the controller knows it is on a 4-bit bus, so every
/// entry is a single strobe and never a two-nibble [HD44780Driver::write_value].
pub const FOUR_BIT_INIT_SEQUENCE: [(u8, Duration); 10] = [
    (0x03, Duration::from_millis(15)),
    (0x03, Duration::from_micros(4100)),
    (0x03, Duration::from_micros(4100)),
    (0x02, Duration::from_micros(4100)),
    // Function set: 4-bit, number of lines and font
    (0x02, Duration::from_micros(400)),
    (0x08, Duration::from_micros(400)),
    // Display on, cursor off
    (0x00, Duration::from_micros(400)),
    (0x0C, Duration::from_micros(400)),
    // Entry mode: increment the cursor to the right
    (0x00, Duration::from_micros(400)),
    (0x06, Duration::from_micros(400)),
];

/// Width of the data bus between the host and the controller.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransferMode {
    /// D4..D7 are wired, every byte is sent as two nibbles.
    FourBit,
    /// D0..D7 are wired, every byte is sent at once.
    EightBit,
}

impl TransferMode {
    /// Gets the number of data lines used in this mode.
    pub fn data_width(self) -> usize {
        match self {
            TransferMode::FourBit => 4,
            TransferMode::EightBit => 8,
        }
    }
}

/// The controller register a transfer targets, selected with the RS line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Register {
    /// Character data, RS high.
    Data,
    /// Commands, RS low.
    Instruction,
}

impl Register {
    /// Gets the level of the RS line for this register.
    pub fn rs_level(self) -> bool {
        match self {
            Register::Data => true,
            Register::Instruction => false,
        }
    }
}

/// Size of the display in characters.
///
/// Advisory only: messages that do not fit are logged, never cut.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DisplayGeometry {
    pub width: usize,
    pub height: usize,
}

impl DisplayGeometry {
    pub fn new(width: usize, height: usize) -> Self {
        DisplayGeometry { width, height }
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        DisplayGeometry::new(16, 2)
    }
}

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum HD44780Error {
    #[error("{0:?} transfer mode is not supported")]
    UnsupportedMode(TransferMode),
    #[error(transparent)]
    Gpio(#[from] GpioError),
}

pub type HD44780Result<T> = Result<T, HD44780Error>;

pub trait HD44780Driver: Debug {
    /// Gets the bus width this driver was opened with.
    fn mode(&self) -> TransferMode;

    /// Gets the advisory size of the display.
    fn geometry(&self) -> DisplayGeometry;

    /// Runs the power-on initialization sequence.
    ///
    /// # Errors
    /// - `HD44780Error::UnsupportedMode` for [TransferMode::EightBit], which has no sequence yet.
    fn init(&mut self) -> HD44780Result<()>;

    /// Waits for the controller to finish an operation.
    fn wait(&self, duration: Duration);

    // Low-level transfers
    // These are implemented by the driver implementation and used by everything above.

    /// Latches `bits` into `register` with a single enable strobe.
    ///
    /// Bit `i` goes to data pin `i`. Bits above the bus width are ignored.
    fn strobe(&mut self, register: Register, bits: u8) -> GpioResult<()>;

    /// Transfers a full byte, as two strobes (high nibble first) on a 4-bit bus or one on an 8-bit
    /// bus, then waits [WRITE_DELAY].
    fn write_value(&mut self, register: Register, value: u8) -> GpioResult<()>;

    /// Sends a command to the HD44780 controller.
    /// Sets the RS pin to 0 (command).
    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.write_value(Register::Instruction, command)
    }

    /// Sends data to the HD44780 controller.
    /// Sets the RS pin to 1 (data).
    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.write_value(Register::Data, data)
    }

    /// Clears the display, sets the cursor to the home position and waits for it to finish.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(CLEAR_DISPLAY)?;
        self.wait(CLEAR_DISPLAY_DELAY);
        Ok(())
    }

    /// Moves the cursor to the start of the second line.
    fn new_line(&mut self) -> GpioResult<()> {
        self.send_command(NEW_LINE)
    }
}

/// Where a message ran past the right edge of the display.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Overrun {
    /// 1-based line number.
    pub line: usize,
    /// 0-based column of the first character that did not fit.
    pub column: usize,
}

/// What happened while a message was written.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct MessageReport {
    /// Data writes performed.
    pub characters: usize,
    /// Lines the message spans.
    pub lines: usize,
    pub overruns: Vec<Overrun>,
    /// Characters written below the last line of the display.
    pub overflowed: usize,
}

pub trait MessageExt {
    /// Clears the display and writes `message`, moving to the second line on `'\n'`.
    ///
    /// Nothing is truncated or wrapped. Characters that do not fit the [DisplayGeometry] are still
    /// written and only logged.
    fn print_message(&mut self, message: &str) -> GpioResult<MessageReport>;
}

impl<T: ?Sized + HD44780Driver> MessageExt for T {
    fn print_message(&mut self, message: &str) -> GpioResult<MessageReport> {
        let geometry = self.geometry();
        let mut report = MessageReport {
            lines: 1,
            ..MessageReport::default()
        };
        let mut line_chars = 0;

        self.clear_display()?;

        for c in message.chars() {
            if c == '\n' {
                self.new_line()?;
                report.lines += 1;
                line_chars = 0;
                continue;
            }

            if line_chars == geometry.width {
                warn!("Message overran on line {}", report.lines);
                report.overruns.push(Overrun {
                    line: report.lines,
                    column: line_chars,
                });
            }

            if report.lines > geometry.height {
                warn!("Message contains too many lines");
                report.overflowed += 1;
            }

            let code = u8::try_from(c).unwrap_or_else(|_| {
                warn!("Character {:?} is outside of the character ROM", c);
                b'?'
            });

            self.send_data(code)?;
            report.characters += 1;
            line_chars += 1;
            self.wait(CHARACTER_DELAY);
        }

        Ok(report)
    }
}
