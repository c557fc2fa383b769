//! Motor control loop task

use defmt::*;
use traverse_drivers::servo::ControlLoop;

use crate::AxisServo;

/// Poll the driver module, forward queued commands and supervise faults
/// every control period
#[embassy_executor::task]
pub async fn control_task(servo: &'static AxisServo) {
    info!(
        "Control task started ({} ms period)",
        servo.config().control_period_ms
    );

    let mut control = ControlLoop::new(servo);
    control.run().await
}
