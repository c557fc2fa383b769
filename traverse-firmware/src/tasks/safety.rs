//! Safety input watchers
//!
//! Each watcher samples its GPIO, records the level with a single atomic
//! write and sleeps until the level changes. Nothing here takes a lock or
//! logs per transition.

use defmt::*;
use embassy_rp::gpio::Input;
use traverse_drivers::safety::SafetyLine;

use crate::Safety;

/// Hard-limit switch watcher
#[embassy_executor::task]
pub async fn limit_watch_task(safety: &'static Safety, mut pin: Input<'static>) {
    info!("Hard-limit watcher started");
    loop {
        safety.watch_level(SafetyLine::HardLimit, &mut pin).await;
    }
}

/// Emergency-stop button watcher
#[embassy_executor::task]
pub async fn estop_watch_task(safety: &'static Safety, mut pin: Input<'static>) {
    info!("E-stop watcher started");
    loop {
        safety.watch_level(SafetyLine::EmergencyStop, &mut pin).await;
    }
}
