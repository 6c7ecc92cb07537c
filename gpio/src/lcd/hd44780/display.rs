use crate::delay::{Delay, ThreadDelay};
use crate::lcd::hd44780::WriteSerializer;
use crate::lcd::hd44780::config::{ConfigError, PinConfig};
use crate::lcd::hd44780::driver::{
    DisplayGeometry, GpioHD44780Driver, HD44780Driver, HD44780Result, MessageExt, TransferMode,
};
use crate::{GpioDriver, GpioError};
use log::{debug, error, info, warn};

/// Outcome of [HD44780Display::initialize].
///
/// Configuration and pin problems do not fail initialization, they leave the display
/// uninitialized. This records which of them happened.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InitStatus {
    Initialized(TransferMode),
    /// Required pins are not configured at all.
    NotConfigured(ConfigError),
    /// A configured pin is not a valid pin number.
    ConfigInvalid(ConfigError),
    /// The pins could not be opened, e.g. another consumer owns one of them.
    OpenFailed(GpioError),
}

/// A text display on an HD44780 controller.
///
/// Messages can be written from several threads at once, they are shown one after another.
#[derive(Debug)]
pub struct HD44780Display<'a, D: Delay = ThreadDelay> {
    driver: Option<WriteSerializer<GpioHD44780Driver<'a, D>>>,
    status: InitStatus,
}

impl<'a, D: Delay> HD44780Display<'a, D> {
    /// Resolves `config`, opens the pins on `gpio` and runs the controller's power-on sequence.
    ///
    /// A missing or invalid configuration, or pins that cannot be opened, are only logged: the
    /// display is returned uninitialized and ignores messages. See [Self::status].
    ///
    /// # Errors
    /// - `HD44780Error::UnsupportedMode` if the configuration selects the 8-bit bus.
    /// - `HD44780Error::Gpio` if a pin write fails during the power-on sequence.
    pub fn initialize(
        gpio: &'a dyn GpioDriver,
        config: &PinConfig,
        geometry: DisplayGeometry,
        delay: D,
    ) -> HD44780Result<Self> {
        let assignment = match config.resolve() {
            Ok(assignment) => assignment,
            Err(err @ ConfigError::MissingPin(_)) => {
                info!("HD44780 not configured ({}), leaving it uninitialized", err);
                return Ok(Self::uninitialized(InitStatus::NotConfigured(err)));
            }
            Err(err) => {
                warn!("HD44780 pin config is invalid: {}", err);
                return Ok(Self::uninitialized(InitStatus::ConfigInvalid(err)));
            }
        };

        info!(
            "HD44780 @ RS: {}, E: {}, Data: {:?}",
            assignment.register_select,
            assignment.enable,
            assignment.data.as_slice()
        );

        let mut driver = match GpioHD44780Driver::open(gpio, &assignment, geometry, delay) {
            Ok(driver) => driver,
            Err(err) => {
                warn!("HD44780 pins could not be opened: {}", err);
                return Ok(Self::uninitialized(InitStatus::OpenFailed(err)));
            }
        };

        driver.init()?;

        let mode = driver.mode();
        info!("HD44780 initialized in {:?} mode, {:?}", mode, geometry);

        Ok(HD44780Display {
            driver: Some(WriteSerializer::new(driver)),
            status: InitStatus::Initialized(mode),
        })
    }

    fn uninitialized(status: InitStatus) -> Self {
        HD44780Display {
            driver: None,
            status,
        }
    }

    pub fn status(&self) -> &InitStatus {
        &self.status
    }

    pub fn is_initialized(&self) -> bool {
        self.driver.is_some()
    }

    pub fn mode(&self) -> Option<TransferMode> {
        match self.status {
            InitStatus::Initialized(mode) => Some(mode),
            _ => None,
        }
    }

    /// Clears the display and shows `message`.
    ///
    /// Waits for any message being written by another thread to finish first. Does nothing if
    /// the display is not initialized.
    pub fn write_message(&self, message: &str) -> HD44780Result<()> {
        let Some(driver) = &self.driver else {
            warn!("HD44780 is not initialized, dropping message {:?}", message);
            return Ok(());
        };

        driver.with_lock(|driver| -> HD44780Result<()> {
            debug!("Writing message {:?}", message);
            let report = driver.print_message(message)?;
            debug!("Message write complete: {:?}", report);
            Ok(())
        })
    }

    /// Clears the display and releases the pins.
    ///
    /// Dropping the display does the same, but can only log errors.
    pub fn dispose(mut self) -> HD44780Result<()> {
        self.dispose_driver()
    }

    fn dispose_driver(&mut self) -> HD44780Result<()> {
        match self.driver.take() {
            Some(driver) => Ok(driver.into_inner().dispose()?),
            None => Ok(()),
        }
    }
}

impl<D: Delay> Drop for HD44780Display<'_, D> {
    fn drop(&mut self) {
        if let Err(err) = self.dispose_driver() {
            error!("Failed to dispose HD44780: {}", err);
        }
    }
}
