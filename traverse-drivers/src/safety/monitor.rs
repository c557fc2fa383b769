//! Safety interlock for the physical inputs
//!
//! The hard limit switch and the e-stop switch are watched by level. Each
//! watcher samples its pin, records the level with a single lock-free
//! write (mirror the level, raise the status word with `fetch_max`) and
//! then waits for the opposite level. A change that happens before the
//! watcher is armed is caught by the next sample. The overload sensor is
//! polled under the status lock whenever the status is read. Every input
//! is active low with a pull-up, and a read that fails counts as asserted.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};
use traverse_core::safety::{ResetBlocked, SafetyStatus, SoftLimits};
use traverse_core::traits::Interlock;

use crate::error::{Error, Result};

/// Watched safety inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyLine {
    /// Physical travel limit switch
    HardLimit,
    /// Operator e-stop switch
    EmergencyStop,
}

impl SafetyLine {
    /// Status latched while this line is asserted
    pub const fn status(self) -> SafetyStatus {
        match self {
            SafetyLine::HardLimit => SafetyStatus::HardLimit,
            SafetyLine::EmergencyStop => SafetyStatus::EmergencyStop,
        }
    }
}

/// Interlock combining watched and polled inputs
///
/// `O` is the overload sensor input. The limit and e-stop pins are owned by
/// their watchers, which keep the line levels current.
pub struct SafetyMonitor<M: RawMutex, O> {
    /// Status word, a [`SafetyStatus`] encoded by severity
    status: AtomicU8,
    /// Last level sampled on the hard limit line
    limit_active: AtomicBool,
    /// Last level sampled on the e-stop line
    estop_active: AtomicBool,
    /// Status lock, guarding the polled overload input
    overload: Mutex<M, RefCell<O>>,
    soft_limits: SoftLimits,
}

impl<M: RawMutex, O: InputPin> SafetyMonitor<M, O> {
    /// Create a monitor with all inputs assumed clear
    ///
    /// Call [`SafetyMonitor::init`] before permitting motion.
    pub const fn new(overload: O, soft_limits: SoftLimits) -> Self {
        Self {
            status: AtomicU8::new(SafetyStatus::Ok.as_word()),
            limit_active: AtomicBool::new(false),
            estop_active: AtomicBool::new(false),
            overload: Mutex::new(RefCell::new(overload)),
            soft_limits,
        }
    }

    /// Capture faults already present at power-up
    ///
    /// Reads every input once, synchronously. An input that cannot be read
    /// at all is a [`Error::Resource`] failure; the status is latched to
    /// `EmergencyStop` so nothing moves either way.
    pub fn init<L: InputPin, E: InputPin>(&self, limit: &mut L, estop: &mut E) -> Result<()> {
        let limit = limit.is_low();
        let estop = estop.is_low();
        let overload = self.overload.lock(|pin| pin.borrow_mut().is_low());

        let (Ok(limit), Ok(estop), Ok(overload)) = (limit, estop, overload) else {
            error!("safety input unreadable at init");
            self.raise(SafetyStatus::EmergencyStop);
            return Err(Error::Resource);
        };

        self.on_edge(SafetyLine::HardLimit, limit);
        self.on_edge(SafetyLine::EmergencyStop, estop);
        if overload {
            self.raise(SafetyStatus::Overload);
        }

        let status = self.peek();
        if status.is_ok() {
            info!("safety monitor ready");
        } else {
            warn!("safety fault present at boot: {}", status);
        }
        Ok(())
    }

    /// Record an edge on a safety line
    ///
    /// Interrupt-context safe: lock-free atomics only, no logging.
    pub fn on_edge(&self, line: SafetyLine, asserted: bool) {
        self.mirror(line).store(asserted, Ordering::SeqCst);
        if asserted {
            self.raise(line.status());
        }
    }

    /// Record the level of `pin`, then wait until it changes
    ///
    /// Call in a loop. The wait returns at once if the pin already moved
    /// away from the sampled level, so no transition is lost between calls.
    /// A pin that cannot be read or waited on is treated as asserted.
    pub async fn watch_level<P: InputPin + Wait>(&self, line: SafetyLine, pin: &mut P) {
        let asserted = pin.is_low().unwrap_or(true);
        self.on_edge(line, asserted);

        let changed = if asserted {
            pin.wait_for_high().await
        } else {
            pin.wait_for_low().await
        };
        if changed.is_err() {
            self.on_edge(line, true);
        }
    }

    /// Status word without sampling the overload input
    pub fn peek(&self) -> SafetyStatus {
        SafetyStatus::from_word(self.status.load(Ordering::SeqCst))
    }

    /// Last level sampled on a watched line
    pub fn is_line_active(&self, line: SafetyLine) -> bool {
        self.mirror(line).load(Ordering::SeqCst)
    }

    fn mirror(&self, line: SafetyLine) -> &AtomicBool {
        match line {
            SafetyLine::HardLimit => &self.limit_active,
            SafetyLine::EmergencyStop => &self.estop_active,
        }
    }

    fn raise(&self, status: SafetyStatus) {
        self.status.fetch_max(status.as_word(), Ordering::SeqCst);
    }

    /// Re-apply lines still asserted after the word was cleared
    fn reassert_lines(&self) {
        for line in [SafetyLine::HardLimit, SafetyLine::EmergencyStop] {
            if self.is_line_active(line) {
                self.raise(line.status());
            }
        }
    }

    fn blocked_by(&self, overload: &mut O) -> Option<ResetBlocked> {
        if self.is_line_active(SafetyLine::EmergencyStop) {
            return Some(ResetBlocked::EmergencyStop);
        }
        if self.is_line_active(SafetyLine::HardLimit) {
            return Some(ResetBlocked::HardLimit);
        }
        if overload.is_low().unwrap_or(true) {
            return Some(ResetBlocked::Overload);
        }
        None
    }
}

impl<M: RawMutex, O: InputPin> Interlock for SafetyMonitor<M, O> {
    fn status(&self) -> SafetyStatus {
        self.overload.lock(|pin| {
            if pin.borrow_mut().is_low().unwrap_or(true) {
                self.raise(SafetyStatus::Overload);
            }
        });
        self.peek()
    }

    fn latch(&self, status: SafetyStatus) {
        self.raise(status);
    }

    fn is_position_valid(&self, position_mm: f32) -> bool {
        self.soft_limits.contains(position_mm)
    }

    fn reset_error(&self) -> core::result::Result<(), ResetBlocked> {
        let result = self.overload.lock(|pin| {
            let observed = self.status.load(Ordering::SeqCst);

            if let Some(blocked) = self.blocked_by(&mut pin.borrow_mut()) {
                if blocked == ResetBlocked::Overload {
                    self.raise(SafetyStatus::Overload);
                }
                return Err(blocked);
            }

            // A fault raised since `observed` was read makes the exchange fail
            if let Err(word) = self.status.compare_exchange(
                observed,
                SafetyStatus::Ok.as_word(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                return Err(match SafetyStatus::from_word(word) {
                    SafetyStatus::HardLimit => ResetBlocked::HardLimit,
                    SafetyStatus::Overload => ResetBlocked::Overload,
                    _ => ResetBlocked::EmergencyStop,
                });
            }

            self.reassert_lines();
            Ok(())
        });

        match result {
            Ok(()) if self.peek().is_ok() => {
                info!("interlock reset");
                Ok(())
            }
            Ok(()) => {
                let status = self.peek();
                warn!("interlock reset raced an edge: {}", status);
                Err(match status {
                    SafetyStatus::HardLimit => ResetBlocked::HardLimit,
                    _ => ResetBlocked::EmergencyStop,
                })
            }
            Err(blocked) => {
                warn!("interlock reset blocked by {}", blocked);
                Err(blocked)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestPin;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type Monitor<'a> = SafetyMonitor<NoopRawMutex, &'a TestPin>;

    fn limits() -> SoftLimits {
        SoftLimits::new(0.0, 200.0)
    }

    #[test]
    fn test_clear_boot() {
        let overload = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        monitor.init(&mut &TestPin::new(), &mut &TestPin::new()).unwrap();
        assert_eq!(monitor.status(), SafetyStatus::Ok);
    }

    #[test]
    fn test_boot_with_estop_asserted() {
        let overload = TestPin::new();
        let estop = TestPin::asserted();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        monitor.init(&mut &TestPin::new(), &mut &estop).unwrap();
        assert_eq!(monitor.status(), SafetyStatus::EmergencyStop);
        assert_eq!(monitor.reset_error(), Err(ResetBlocked::EmergencyStop));
    }

    #[test]
    fn test_unreadable_input_at_init() {
        let overload = TestPin::new();
        let limit = TestPin::new();
        limit.set_broken(true);
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        assert_eq!(
            monitor.init(&mut &limit, &mut &TestPin::new()),
            Err(Error::Resource)
        );
        assert_eq!(monitor.status(), SafetyStatus::EmergencyStop);
    }

    #[test]
    fn test_overload_is_sampled_on_read() {
        let overload = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());
        monitor.init(&mut &TestPin::new(), &mut &TestPin::new()).unwrap();

        overload.set_asserted(true);
        assert_eq!(monitor.peek(), SafetyStatus::Ok);
        assert_eq!(monitor.status(), SafetyStatus::Overload);

        // Latched until reset, and reset refused while asserted
        overload.set_asserted(false);
        assert_eq!(monitor.status(), SafetyStatus::Overload);
        overload.set_asserted(true);
        assert_eq!(monitor.reset_error(), Err(ResetBlocked::Overload));
        assert_eq!(monitor.status(), SafetyStatus::Overload);

        overload.set_asserted(false);
        assert_eq!(monitor.reset_error(), Ok(()));
        assert_eq!(monitor.status(), SafetyStatus::Ok);
    }

    #[test]
    fn test_broken_overload_sensor_fails_safe() {
        let overload = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        overload.set_broken(true);
        assert_eq!(monitor.status(), SafetyStatus::Overload);
        assert_eq!(monitor.reset_error(), Err(ResetBlocked::Overload));
    }

    #[test]
    fn test_status_never_downgrades() {
        let overload = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        monitor.emergency_stop();
        monitor.on_edge(SafetyLine::HardLimit, true);
        monitor.latch(SafetyStatus::SoftLimit);
        assert_eq!(monitor.status(), SafetyStatus::EmergencyStop);
    }

    #[test]
    fn test_software_estop_resets_when_inputs_clear() {
        let overload = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        monitor.emergency_stop();
        assert_eq!(monitor.status(), SafetyStatus::EmergencyStop);
        assert!(!monitor.is_ok());

        assert_eq!(monitor.reset_error(), Ok(()));
        assert!(monitor.is_ok());
    }

    #[test]
    fn test_reset_blocked_by_held_limit_switch() {
        let overload = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        monitor.on_edge(SafetyLine::HardLimit, true);
        assert_eq!(monitor.reset_error(), Err(ResetBlocked::HardLimit));
        assert_eq!(monitor.status(), SafetyStatus::HardLimit);

        // Releasing the switch does not clear the latch by itself
        monitor.on_edge(SafetyLine::HardLimit, false);
        assert_eq!(monitor.status(), SafetyStatus::HardLimit);
        assert_eq!(monitor.reset_error(), Ok(()));
    }

    #[test]
    fn test_estop_blocks_before_limit() {
        let overload = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        monitor.on_edge(SafetyLine::HardLimit, true);
        monitor.on_edge(SafetyLine::EmergencyStop, true);
        assert_eq!(monitor.reset_error(), Err(ResetBlocked::EmergencyStop));

        monitor.on_edge(SafetyLine::EmergencyStop, false);
        assert_eq!(monitor.reset_error(), Err(ResetBlocked::HardLimit));
        assert_eq!(monitor.status(), SafetyStatus::EmergencyStop);
    }

    #[test]
    fn test_watch_level_tracks_level() {
        let overload = TestPin::new();
        let estop = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        estop.set_asserted(true);
        block_on(monitor.watch_level(SafetyLine::EmergencyStop, &mut &estop));
        assert!(monitor.is_line_active(SafetyLine::EmergencyStop));
        assert_eq!(monitor.status(), SafetyStatus::EmergencyStop);

        estop.set_asserted(false);
        block_on(monitor.watch_level(SafetyLine::EmergencyStop, &mut &estop));
        assert!(!monitor.is_line_active(SafetyLine::EmergencyStop));
    }

    #[test]
    fn test_estop_pressed_before_watcher_starts() {
        let overload = TestPin::new();
        let estop = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());
        monitor.init(&mut &TestPin::new(), &mut &estop).unwrap();

        // Pressed after init, with no edge ever observed
        estop.set_asserted(true);
        block_on(monitor.watch_level(SafetyLine::EmergencyStop, &mut &estop));
        assert_eq!(monitor.status(), SafetyStatus::EmergencyStop);
        assert_eq!(monitor.reset_error(), Err(ResetBlocked::EmergencyStop));
        assert_eq!(monitor.status(), SafetyStatus::EmergencyStop);

        estop.set_asserted(false);
        block_on(monitor.watch_level(SafetyLine::EmergencyStop, &mut &estop));
        assert_eq!(monitor.reset_error(), Ok(()));
        assert_eq!(monitor.status(), SafetyStatus::Ok);
    }

    #[test]
    fn test_watch_level_fails_safe() {
        let overload = TestPin::new();
        let limit = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        limit.set_broken(true);
        block_on(monitor.watch_level(SafetyLine::HardLimit, &mut &limit));
        assert_eq!(monitor.peek(), SafetyStatus::HardLimit);
        assert!(monitor.is_line_active(SafetyLine::HardLimit));
    }

    #[test]
    fn test_failed_wait_counts_as_asserted() {
        let overload = TestPin::new();
        let limit = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        limit.set_wait_broken(true);
        block_on(monitor.watch_level(SafetyLine::HardLimit, &mut &limit));
        assert_eq!(monitor.peek(), SafetyStatus::HardLimit);
    }

    #[test]
    fn test_position_validity() {
        let overload = TestPin::new();
        let monitor: Monitor = SafetyMonitor::new(&overload, limits());

        assert!(monitor.is_position_valid(0.0));
        assert!(monitor.is_position_valid(200.0));
        assert!(!monitor.is_position_valid(-0.01));
        assert!(!monitor.is_position_valid(200.01));
        assert!(!monitor.is_position_valid(f32::NAN));
    }
}
