mod config;

use crate::config::{Backend, Config};
use dotenv::dotenv;
use log::{debug, info, warn};
use std::thread::sleep;
use std::time::Duration;
use sysinfo::System;
use textdisplay_gpio::GpioDriver;
use textdisplay_gpio::delay::ThreadDelay;
use textdisplay_gpio::gpiod::GpiodDriver;
use textdisplay_gpio::lcd::hd44780::HD44780Display;
use textdisplay_gpio::raw::RawGpioDriver;
use time::OffsetDateTime;
use time::macros::format_description;

const UNKNOWN_STR: &str = "???";

/// Host name on the first line, OS version on the second.
fn system_message() -> String {
    format!(
        "{}\n{}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
    )
}

fn clock_line() -> eyre::Result<String> {
    // Getting the local offset fails once other threads exist, UTC is good enough then
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(now.format(format_description!("[hour]:[minute]:[second]"))?)
}

fn open_gpio(config: &Config) -> eyre::Result<Box<dyn GpioDriver>> {
    let gpio: Box<dyn GpioDriver> = match config.backend()? {
        Backend::Raw => Box::new(RawGpioDriver::new_gpiomem()?),
        Backend::RawMem => Box::new(RawGpioDriver::new_mem()?),
        Backend::Gpiod => Box::new(GpiodDriver::open(config.chip())?),
    };
    Ok(gpio)
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("TextDisplay starting...");

    let config = Config::load()?;
    let geometry = config.geometry()?;

    debug!("Initializing GPIO driver...");
    let gpio = open_gpio(&config)?;
    debug!("{:?} initialized.", gpio);

    debug!("Initializing display...");
    let display = HD44780Display::initialize(&*gpio, &config.pins(), geometry, ThreadDelay)?;
    if !display.is_initialized() {
        warn!("Display is not available: {:?}", display.status());
    }

    let message = config.message().unwrap_or_else(system_message);
    display.write_message(&message)?;

    let refresh_seconds = config.refresh_seconds()?;
    if refresh_seconds > 0 {
        let first_line = message.lines().next().unwrap_or_default().to_string();
        info!("Showing the clock for {}s", refresh_seconds);
        for _ in 0..refresh_seconds {
            sleep(Duration::from_secs(1));
            display.write_message(&format!("{}\n{}", first_line, clock_line()?))?;
        }
    }

    display.dispose()?;

    info!("TextDisplay done.");
    Ok(())
}
