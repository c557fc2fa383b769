//! Motor control loop
//!
//! Runs once per control period and, in order:
//! 1. samples the interlock and escalates if it has tripped
//! 2. forwards at most one queued command to the driver module
//! 3. polls telemetry
//! 4. reconciles the motor state and applies the fault rules
//!
//! A fault is escalated once: the interlock is latched, the axis is halted
//! and the stop is written directly to the link. The faulted axis is not
//! checked again until it is reset.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant, Ticker};
use embedded_io_async::{Read, Write};
use traverse_core::config::RESPONSE_BUFFER_SIZE;
use traverse_core::safety::FaultMonitor;
use traverse_core::state::FaultKind;
use traverse_core::traits::Interlock;
use traverse_protocol::{Command, Telemetry};

use super::api::Servo;
use super::queue::Queued;
use crate::error::Result;

/// Periodic poll and supervision task state
pub struct ControlLoop<'s, 'a, M: RawMutex, L, S> {
    servo: &'s Servo<'a, M, L, S>,
    faults: FaultMonitor,
    response: [u8; RESPONSE_BUFFER_SIZE],
}

impl<'s, 'a, M, L, S> ControlLoop<'s, 'a, M, L, S>
where
    M: RawMutex,
    L: Read + Write,
    S: Interlock,
{
    pub fn new(servo: &'s Servo<'a, M, L, S>) -> Self {
        Self {
            servo,
            faults: FaultMonitor::new(servo.config()),
            response: [0; RESPONSE_BUFFER_SIZE],
        }
    }

    pub fn servo(&self) -> &'s Servo<'a, M, L, S> {
        self.servo
    }

    /// Consecutive telemetry polls that failed
    pub fn missed_polls(&self) -> u8 {
        self.faults.missed_polls()
    }

    /// Run forever at the configured control period
    pub async fn run(&mut self) -> ! {
        let period = Duration::from_millis(self.servo.config().control_period_ms as u64);
        let mut ticker = Ticker::every(period);

        loop {
            self.cycle(Instant::now()).await;
            ticker.next().await;
        }
    }

    /// One control period
    pub async fn cycle(&mut self, now: Instant) {
        let now_ms = now.as_millis();

        // Interlock lock is released before the motor lock is taken
        let status = self.servo.interlock.status();
        let faulted = self.servo.with_motor(|m| m.axis.is_fault());
        if !status.is_ok() && !faulted {
            self.escalate(FaultKind::Interlock(status)).await;
        }

        self.dispatch().await;

        let telemetry = match self.poll().await {
            Ok(telemetry) => {
                self.faults.poll_succeeded();
                telemetry
            }
            Err(e) => {
                warn!("telemetry poll failed: {} ({} in a row)", e, self.faults.missed_polls() + 1);
                if let Some(kind) = self.faults.poll_failed() {
                    self.escalate(kind).await;
                }
                return;
            }
        };

        let faults = &self.faults;
        let fault = self.servo.with_motor(|m| {
            m.reconcile(&telemetry);
            faults.check(m, now_ms)
        });

        if let Some(kind) = fault {
            error!(
                "fault {}: {} mA, {} C, status {=u8:#x}",
                kind,
                telemetry.current_ma,
                telemetry.temperature_c,
                telemetry.status.bits()
            );
            self.escalate(kind).await;
        }
    }

    /// Forward the oldest queued command, if any
    async fn dispatch(&mut self) {
        let Some(Queued { command, epoch }) = self.servo.queue.dequeue() else {
            return;
        };

        // Accepted before the last halt or reset; its reservation is gone
        if self.servo.with_motor(|m| m.epoch) != epoch {
            warn!("dropping stale {}", command.opcode());
            return;
        }

        if command.starts_motion() {
            let faulted = self.servo.with_motor(|m| {
                m.motion_dispatched();
                m.axis.is_fault()
            });
            if faulted {
                warn!("dropping {} queued behind a fault", command.opcode());
                return;
            }
        }

        debug!("dispatch {}", command.opcode());
        if self.servo.link.send(&command).await.is_err() {
            if let Command::SetPosition { .. } = command {
                self.servo.with_motor(|m| m.abandon_move());
            }
        }
    }

    /// Request and decode one telemetry record
    async fn poll(&mut self) -> Result<Telemetry> {
        self.servo.link.send(&Command::GetStatus).await?;
        let len = self.servo.link.read_response(&mut self.response).await?;
        Ok(Telemetry::parse(&self.response[..len])?)
    }

    async fn escalate(&self, kind: FaultKind) {
        self.servo.interlock.latch(kind.interlock_status());
        // Delivery failures are logged by the halt itself
        let _ = self.servo.halt(kind).await;
    }
}
