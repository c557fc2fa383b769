//! Motion API
//!
//! Every public operation validates its preconditions, enqueues a command
//! for the control loop and updates the motor state optimistically.
//! `emergency_stop` is the exception: it bypasses the queue, writes the
//! stop directly to the link and discards whatever was still queued.
//!
//! The interlock and the motor state are never locked at the same time.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Instant};
use embedded_io_async::{Read, Write};
use traverse_core::config::AxisConfig;
use traverse_core::motion::{jog_speed, JogDirection, JogStep, StepConversion};
use traverse_core::state::{FaultKind, MotorState};
use traverse_core::traits::Interlock;
use traverse_protocol::Command;

use super::link::SerialChannel;
use super::queue::CommandQueue;
use crate::error::{Error, Result};

/// Motion controller for one axis
///
/// Shared by reference between the callers and the [`ControlLoop`].
///
/// [`ControlLoop`]: super::ControlLoop
pub struct Servo<'a, M: RawMutex, L, S> {
    pub(crate) link: SerialChannel<M, L>,
    pub(crate) queue: CommandQueue<M>,
    motor: Mutex<M, RefCell<MotorState>>,
    pub(crate) interlock: &'a S,
    pub(crate) config: AxisConfig,
    units: StepConversion,
}

impl<'a, M, L, S> Servo<'a, M, L, S>
where
    M: RawMutex,
    L: Read + Write,
    S: Interlock,
{
    /// Create the controller in its power-on state: unhomed and at rest
    pub fn new(link: L, interlock: &'a S, config: AxisConfig) -> Self {
        Self {
            link: SerialChannel::new(
                link,
                Duration::from_millis(config.response_timeout_ms as u64),
            ),
            queue: CommandQueue::new(Duration::from_millis(config.queue_timeout_ms as u64)),
            motor: Mutex::new(RefCell::new(MotorState::new(&config))),
            interlock,
            config,
            units: config.units(),
        }
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub(crate) fn with_motor<R>(&self, f: impl FnOnce(&mut MotorState) -> R) -> R {
        self.motor.lock(|motor| f(&mut motor.borrow_mut()))
    }

    /// Latest known motor state
    ///
    /// A plain copy; it may not reflect a control cycle in progress.
    pub fn state(&self) -> MotorState {
        self.with_motor(|motor| *motor)
    }

    /// Move to an absolute position
    pub async fn move_to(&self, position_mm: f32, speed_mm_s: f32) -> Result<()> {
        let (homed, faulted) = self.with_motor(|m| (m.is_homed, m.axis.is_fault()));
        if !homed {
            warn!("move rejected: axis not homed");
            return Err(Error::InvalidState);
        }
        if faulted || !self.interlock.is_ok() {
            warn!("move rejected: axis faulted or interlock tripped");
            return Err(Error::InvalidState);
        }
        if !self.interlock.is_position_valid(position_mm) {
            warn!("move rejected: {} mm outside soft limits", position_mm);
            return Err(Error::InvalidArg);
        }

        let steps = self.units.position_to_steps(position_mm)?;
        let speed = self.units.speed_to_steps(speed_mm_s)?;

        let epoch = self.enqueue_motion(Command::SetPosition { steps, speed }).await?;
        self.start_motion(epoch, |m| m.begin_move(position_mm, speed_mm_s))?;

        info!("move to {} mm at {} mm/s", position_mm, speed_mm_s);
        Ok(())
    }

    /// Relative move by one jog step at a percentage of the max jog speed
    pub async fn jog(&self, direction: JogDirection, step: JogStep, speed_percent: u8) -> Result<()> {
        let from = self.with_motor(|m| m.current_position_mm);
        let target = step.target_from(from, direction);
        let speed = jog_speed(speed_percent, self.config.max_jog_speed_mm_s);

        self.move_to(target, speed).await
    }

    /// Controlled stop; always accepted unless the queue is full
    pub async fn stop(&self) -> Result<()> {
        let epoch = self.with_motor(|m| m.epoch);
        self.queue.enqueue(Command::Stop, epoch).await?;
        self.with_motor(|m| m.begin_stop());

        info!("stop requested");
        Ok(())
    }

    /// Run the homing sequence
    pub async fn home(&self) -> Result<()> {
        let faulted = self.with_motor(|m| m.axis.is_fault());
        if faulted || !self.interlock.is_ok() {
            warn!("home rejected: axis faulted or interlock tripped");
            return Err(Error::InvalidState);
        }

        let epoch = self.enqueue_motion(Command::Home).await?;
        let now_ms = Instant::now().as_millis();
        let timeout_ms = self.config.homing_timeout_ms;
        self.start_motion(epoch, |m| m.begin_homing(now_ms, timeout_ms))?;

        info!("homing started");
        Ok(())
    }

    /// Change the cruise speed
    pub async fn set_speed(&self, speed_mm_s: f32) -> Result<()> {
        if speed_mm_s.is_nan() || speed_mm_s <= 0.0 {
            warn!("speed rejected: {} mm/s", speed_mm_s);
            return Err(Error::InvalidArg);
        }
        let speed = self.units.speed_to_steps(speed_mm_s)?;

        let epoch = self.with_motor(|m| m.epoch);
        self.queue.enqueue(Command::SetSpeed { speed }, epoch).await?;
        self.with_motor(|m| m.speed_mm_s = speed_mm_s);
        Ok(())
    }

    /// Stop the axis immediately, bypassing the queue
    ///
    /// The interlock is latched and queued commands are discarded even if
    /// the stop cannot be written; the write error is still reported.
    pub async fn emergency_stop(&self) -> Result<()> {
        self.interlock.emergency_stop();
        self.halt(FaultKind::Operator).await
    }

    /// Leave the fault state
    ///
    /// Refused while any physical safety input is asserted. The axis comes
    /// back unhomed.
    pub fn reset(&self) -> Result<()> {
        self.interlock.reset_error().map_err(|_| Error::InvalidState)?;

        if self.with_motor(|m| m.reset()) {
            let dropped = self.queue.clear();
            info!("axis reset, homing required ({} stale commands dropped)", dropped);
        }
        Ok(())
    }

    /// Fault the axis, discard queued work and send the stop
    pub(crate) async fn halt(&self, kind: FaultKind) -> Result<()> {
        self.with_motor(|m| m.halt(kind));
        let dropped = self.queue.clear();

        let sent = self.link.send(&Command::EmergencyStop).await;
        match sent {
            Ok(()) => error!("emergency stop ({}), {} queued commands dropped", kind, dropped),
            Err(e) => error!("emergency stop ({}) not delivered: {}", kind, e),
        }
        sent
    }

    /// Reserve and enqueue a motion command, returning its epoch
    async fn enqueue_motion(&self, command: Command) -> Result<u8> {
        let epoch = self.with_motor(|m| {
            m.reserve_motion();
            m.epoch
        });
        let result = self.queue.enqueue(command, epoch).await;
        if result.is_err() {
            // A halt while waiting already dropped every reservation
            self.with_motor(|m| {
                if m.epoch == epoch {
                    m.motion_dispatched();
                }
            });
        }
        result.map(|()| epoch)
    }

    /// Apply the optimistic update for a command queued in `epoch`
    ///
    /// Refused if the axis halted while the caller waited for queue space.
    /// The queued command is then stale and the control loop discards it.
    fn start_motion(&self, epoch: u8, begin: impl FnOnce(&mut MotorState)) -> Result<()> {
        let started = self.with_motor(|m| {
            if m.epoch != epoch || m.axis.is_fault() {
                return false;
            }
            begin(m);
            true
        });
        if !started {
            warn!("motion command overtaken by a halt");
            return Err(Error::InvalidState);
        }
        Ok(())
    }
}
