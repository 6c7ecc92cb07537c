//! Timed waits between transfers.
//!
//! Drivers take any [Delay], production code uses [ThreadDelay].
use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

pub trait Delay: Debug {
    /// Blocks for at least `duration`.
    fn delay(&self, duration: Duration);
}

/// Blocks the calling thread with [std::thread::sleep].
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&self, duration: Duration) {
        sleep(duration);
    }
}
