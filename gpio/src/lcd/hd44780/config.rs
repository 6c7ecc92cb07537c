//! Pin role configuration and transfer mode resolution.
use crate::lcd::hd44780::driver::TransferMode;
use log::debug;
use thiserror::Error;

pub const RS_PIN: &str = "RsPin";
pub const ENABLE_PIN: &str = "EnablePin";
pub const DATA_PINS: [&str; 8] = [
    "D0Pin", "D1Pin", "D2Pin", "D3Pin", "D4Pin", "D5Pin", "D6Pin", "D7Pin",
];

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum ConfigError {
    #[error("required pin field {0} is missing")]
    MissingPin(&'static str),
    #[error("pin field {field} has invalid value {value:?}")]
    InvalidPin { field: &'static str, value: String },
}

/// Raw, unvalidated pin numbers as they came from the configuration source.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct PinConfig {
    pub rs_pin: Option<String>,
    pub enable_pin: Option<String>,
    /// `D0Pin` to `D7Pin`.
    pub data_pins: [Option<String>; 8],
}

impl PinConfig {
    /// Builds the config by looking up every field name ([RS_PIN], [ENABLE_PIN], [DATA_PINS]).
    pub fn from_lookup(mut lookup: impl FnMut(&str) -> Option<String>) -> Self {
        PinConfig {
            rs_pin: lookup(RS_PIN),
            enable_pin: lookup(ENABLE_PIN),
            data_pins: DATA_PINS.map(&mut lookup),
        }
    }

    /// Resolves the configured pins into a [PinAssignment].
    ///
    /// RS, E and D4..D7 are required. When D0..D3 are all present as well the bus is 8 bits wide,
    /// otherwise it is 4 bits wide and any of D0..D3 that are present are ignored.
    ///
    /// # Errors
    /// - `ConfigError::MissingPin` if a required field is absent.
    /// - `ConfigError::InvalidPin` if a used field is not a non-negative integer.
    pub fn resolve(&self) -> Result<PinAssignment, ConfigError> {
        let rs_pin = require(RS_PIN, &self.rs_pin)?;
        let enable_pin = require(ENABLE_PIN, &self.enable_pin)?;
        let mut high = [""; 4];
        for (i, slot) in high.iter_mut().enumerate() {
            *slot = require(DATA_PINS[i + 4], &self.data_pins[i + 4])?;
        }

        let register_select = parse(RS_PIN, rs_pin)?;
        let enable = parse(ENABLE_PIN, enable_pin)?;
        let mut d4_d7 = [0; 4];
        for (i, value) in high.iter().enumerate() {
            d4_d7[i] = parse(DATA_PINS[i + 4], value)?;
        }

        let data = if self.data_pins[..4].iter().all(Option::is_some) {
            let mut d0_d7 = [0; 8];
            for (i, value) in self.data_pins[..4].iter().flatten().enumerate() {
                d0_d7[i] = parse(DATA_PINS[i], value)?;
            }
            d0_d7[4..].copy_from_slice(&d4_d7);
            DataPins::EightBit(d0_d7)
        } else {
            if self.data_pins[..4].iter().any(Option::is_some) {
                debug!("Only some of D0..D3 are configured, using the 4-bit bus");
            }
            DataPins::FourBit(d4_d7)
        };

        Ok(PinAssignment {
            register_select,
            enable,
            data,
        })
    }
}

fn require<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::MissingPin(field))
}

fn parse(field: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidPin {
        field,
        value: value.to_string(),
    })
}

/// Data pins, lowest bit first.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DataPins {
    /// D4..D7.
    FourBit([usize; 4]),
    /// D0..D7.
    EightBit([usize; 8]),
}

impl DataPins {
    pub fn mode(&self) -> TransferMode {
        match self {
            DataPins::FourBit(_) => TransferMode::FourBit,
            DataPins::EightBit(_) => TransferMode::EightBit,
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        match self {
            DataPins::FourBit(pins) => pins,
            DataPins::EightBit(pins) => pins,
        }
    }
}

/// Validated pin numbers for every role on the bus.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PinAssignment {
    pub register_select: usize,
    pub enable: usize,
    pub data: DataPins,
}
