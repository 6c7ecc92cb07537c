use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::env::{var, var_os};
use std::ffi::OsStr;
use std::path::Path;
use std::str::FromStr;
use textdisplay_gpio::lcd::hd44780::config::PinConfig;
use textdisplay_gpio::lcd::hd44780::driver::DisplayGeometry;
use thiserror::Error;

const ENV_PREFIX: &str = "TEXTDISPLAY_";

/// Which GPIO driver to open the display pins with.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Backend {
    /// Memory-mapped registers through `/dev/gpiomem`.
    #[default]
    Raw,
    /// Memory-mapped registers through `/dev/mem`.
    RawMem,
    /// The GPIO character device.
    Gpiod,
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("unknown GPIO backend {0:?}, expected raw, raw-mem or gpiod")]
pub struct UnknownBackend(String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Backend::Raw),
            "raw-mem" => Ok(Backend::RawMem),
            "gpiod" => Ok(Backend::Gpiod),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// Settings from the optional JSON file, falling back to `TEXTDISPLAY_*` environment variables.
///
/// Keys are the field names (`RsPin`, `D4Pin`, `Width`, ...). The environment variable of a field
/// is its name upper-cased, e.g. `TEXTDISPLAY_RSPIN`.
#[derive(Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct Config {
    fields: HashMap<String, Value>,
}

impl Config {
    /// Loads the file named by `TEXTDISPLAY_CONFIG` (`textdisplay.json` by default), if it exists.
    pub fn load() -> eyre::Result<Self> {
        let config_str = var_os("TEXTDISPLAY_CONFIG");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("textdisplay.json"));
        let config_path = Path::new(config_str);
        if !config_path.exists() {
            debug!("{} not found, using the environment only", config_path.display());
            return Ok(Config::default());
        }

        let file = std::fs::File::open(config_path)?;
        let reader = std::io::BufReader::new(file);
        let config = serde_json::from_reader(reader)?;
        debug!("Loaded {}", config_path.display());
        Ok(config)
    }

    /// Gets a field as text, from the file first and the environment second.
    pub fn field(&self, name: &str) -> Option<String> {
        match self.fields.get(name) {
            None | Some(Value::Null) => var(format!("{}{}", ENV_PREFIX, name.to_uppercase())).ok(),
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    fn parsed<T: FromStr>(&self, name: &str, default: T) -> eyre::Result<T>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.field(name) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|err| eyre::eyre!("invalid {} {:?}: {}", name, value, err)),
            None => Ok(default),
        }
    }

    pub fn pins(&self) -> PinConfig {
        PinConfig::from_lookup(|name| self.field(name))
    }

    pub fn geometry(&self) -> eyre::Result<DisplayGeometry> {
        let default = DisplayGeometry::default();
        Ok(DisplayGeometry::new(
            self.parsed("Width", default.width)?,
            self.parsed("Height", default.height)?,
        ))
    }

    pub fn backend(&self) -> eyre::Result<Backend> {
        self.parsed("Backend", Backend::default())
    }

    pub fn chip(&self) -> String {
        self.field("Chip").unwrap_or_else(|| "/dev/gpiochip0".to_string())
    }

    pub fn message(&self) -> Option<String> {
        // Escaped new lines are easier to put in .env files
        self.field("Message").map(|message| message.replace("\\n", "\n"))
    }

    pub fn refresh_seconds(&self) -> eyre::Result<u64> {
        self.parsed("RefreshSeconds", 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numbers_and_strings_become_pin_text() {
        let config = from_json(
            r#"{ "RsPin": 7, "EnablePin": "8", "D4Pin": 25, "D5Pin": 24, "D6Pin": 23, "D7Pin": 18 }"#,
        );

        let pins = config.pins();

        assert_eq!(pins.rs_pin.as_deref(), Some("7"));
        assert_eq!(pins.enable_pin.as_deref(), Some("8"));
        assert_eq!(pins.data_pins[4].as_deref(), Some("25"));
        assert!(pins.resolve().is_ok());
    }

    #[test]
    fn non_numeric_pin_is_kept_for_the_resolver() {
        let config = from_json(r#"{ "RsPin": true }"#);

        assert_eq!(config.field("RsPin").as_deref(), Some("true"));
    }

    #[test]
    fn missing_and_null_fields_fall_back_to_environment() {
        // Unique to this test
        unsafe {
            std::env::set_var("TEXTDISPLAY_ENVFALLBACKMISSING", "21");
            std::env::set_var("TEXTDISPLAY_ENVFALLBACKNULL", "22");
            std::env::set_var("TEXTDISPLAY_ENVFALLBACKSET", "from env");
        }
        let config = from_json(r#"{ "EnvFallbackNull": null, "EnvFallbackSet": 23 }"#);

        assert_eq!(config.field("EnvFallbackMissing").as_deref(), Some("21"));
        assert_eq!(config.field("EnvFallbackNull").as_deref(), Some("22"));
        assert_eq!(config.field("EnvFallbackSet").as_deref(), Some("23"));
        assert_eq!(config.field("EnvFallbackUnset"), None);
    }

    #[test]
    fn geometry_defaults_to_16x2() {
        let config = from_json(r#"{ "Width": 20 }"#);

        assert_eq!(config.geometry().unwrap(), DisplayGeometry::new(20, 2));
    }

    #[test]
    fn invalid_geometry_is_an_error() {
        let config = from_json(r#"{ "Width": "wide", "Height": 4 }"#);

        assert!(config.geometry().is_err());
    }

    #[test]
    fn backend_names() {
        assert_eq!("raw".parse::<Backend>(), Ok(Backend::Raw));
        assert_eq!(" GPIOD ".parse::<Backend>(), Ok(Backend::Gpiod));
        assert_eq!("raw-mem".parse::<Backend>(), Ok(Backend::RawMem));
        assert_eq!(
            "spi".parse::<Backend>(),
            Err(UnknownBackend("spi".to_string()))
        );
    }

    #[test]
    fn escaped_new_lines_in_message() {
        let config = from_json(r#"{ "Message": "Hello\\nWorld" }"#);

        assert_eq!(config.message().as_deref(), Some("Hello\nWorld"));
    }
}
