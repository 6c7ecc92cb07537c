//! HD44780 character LCD, driven over a parallel bus of plain GPIO lines.
//!
//! The controller is never read back, so all timing comes from fixed delays. Only the 4-bit
//! interface can be initialized at the moment.
//!
//! [HD44780Display] is the entry point: it resolves a [PinConfig](config::PinConfig), opens the
//! pins, runs the power-on sequence and serializes message writes.
pub mod config;
pub mod driver;
mod display;
mod serializer;

pub use display::*;
pub use serializer::WriteSerializer;
