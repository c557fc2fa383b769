//! Traverse - Lead-Screw Stage Firmware
//!
//! Main firmware binary for RP2040-based single-axis stages. Drives a
//! closed-loop stepper driver module over UART1 and watches the hard-limit,
//! emergency-stop and overload inputs.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUart, Config as UartConfig, Uart};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Timer;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use traverse_core::traits::Interlock;
use traverse_drivers::safety::SafetyMonitor;
use traverse_drivers::servo::Servo;

mod config;
mod tasks;

use crate::config::AXIS_CONFIG;

bind_interrupts!(struct Irqs {
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

/// Driver module link baud rate
const DRIVER_BAUD: u32 = 115_200;

/// Safety monitor wired to the board's overload input
pub type Safety = SafetyMonitor<CriticalSectionRawMutex, Input<'static>>;

/// Motion controller for the stage axis
pub type AxisServo = Servo<'static, CriticalSectionRawMutex, BufferedUart, Safety>;

static SAFETY: StaticCell<Safety> = StaticCell::new();
static SERVO: StaticCell<AxisServo> = StaticCell::new();
static TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Traverse firmware starting...");

    let p = embassy_rp::init(Default::default());
    let config = AXIS_CONFIG;
    info!(
        "Axis: {} steps/mm, travel {}..{} mm",
        config.steps_per_mm(),
        config.travel_min_mm,
        config.travel_max_mm
    );

    // Safety inputs are active low with pull-ups
    // GPIO2 = hard limit, GPIO3 = emergency stop, GPIO4 = overload
    let mut limit = Input::new(p.PIN_2, Pull::Up);
    let mut estop = Input::new(p.PIN_3, Pull::Up);
    let overload = Input::new(p.PIN_4, Pull::Up);

    let safety: &'static Safety = SAFETY.init(SafetyMonitor::new(overload, config.soft_limits()));
    if let Err(e) = safety.init(&mut limit, &mut estop) {
        // The monitor has already latched EmergencyStop
        error!("Safety inputs unreadable: {}", e);
    }
    info!("Safety monitor initialized: {}", safety.status());

    // Watchers take over the line levels from the boot sample
    spawner.spawn(tasks::limit_watch_task(safety, limit)).unwrap();
    spawner.spawn(tasks::estop_watch_task(safety, estop)).unwrap();

    // Driver module on UART1: GPIO8 = TX, GPIO9 = RX
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = DRIVER_BAUD;
    let tx_buf = TX_BUF.init([0u8; 64]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = Uart::new_blocking(p.UART1, p.PIN_8, p.PIN_9, uart_config)
        .into_buffered(Irqs, tx_buf, rx_buf);
    info!("Driver link initialized at {} baud", DRIVER_BAUD);

    let servo: &'static AxisServo = SERVO.init(Servo::new(uart, safety, config));

    spawner.spawn(tasks::control_task(servo)).unwrap();

    info!("All tasks spawned, firmware running");

    // Motion commands arrive through the Servo from the operator interface.
    // The main task only reports axis state.
    loop {
        Timer::after_secs(5).await;
        let state = servo.state();
        debug!(
            "Axis {}: {} mm, {} mA, {} C, safety {}",
            state.axis,
            state.current_position_mm,
            state.current_ma,
            state.temperature_c,
            safety.peek()
        );
    }
}
