//! Test doubles for the driver module link and the safety inputs

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Instant;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use heapless::{Deque, Vec};
use traverse_core::config::AxisConfig;
use traverse_protocol::{Command, FrameParser, StatusBits, Telemetry};

use crate::safety::SafetyMonitor;
use crate::servo::{ControlLoop, Servo};

pub type TestMonitor<'a> = SafetyMonitor<NoopRawMutex, &'a TestPin>;
pub type TestServo<'a> = Servo<'a, NoopRawMutex, MockLink<'a>, TestMonitor<'a>>;
pub type TestLoop<'s, 'a> = ControlLoop<'s, 'a, NoopRawMutex, MockLink<'a>, TestMonitor<'a>>;

/// Interlock with default soft limits and the given overload input
pub fn monitor(overload: &TestPin) -> TestMonitor<'_> {
    SafetyMonitor::new(overload, AxisConfig::default().soft_limits())
}

/// Servo with the default axis configuration
pub fn servo<'a>(wire: &'a MockWire, safety: &'a TestMonitor<'a>) -> TestServo<'a> {
    Servo::new(wire.link(), safety, AxisConfig::default())
}

/// Home the axis through one control cycle
pub async fn home(control: &mut TestLoop<'_, '_>, wire: &MockWire) {
    control.servo().home().await.unwrap();
    wire.reply_status(StatusBits::HOMED);
    control.cycle(Instant::now()).await;
    assert!(control.servo().state().is_homed);
}

type Reply = Vec<u8, 8>;

/// Scripted driver module
///
/// Decodes every frame the controller writes and answers each `GetStatus`
/// with the next scripted reply. An unscripted or `silent` poll gets no
/// answer, so the controller's read times out.
pub struct MockWire {
    sent: RefCell<Vec<Command, 128>>,
    script: RefCell<Deque<Option<Reply>, 32>>,
    rx: RefCell<Reply>,
    short_write: Cell<bool>,
}

impl MockWire {
    pub fn new() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            script: RefCell::new(Deque::new()),
            rx: RefCell::new(Vec::new()),
            short_write: Cell::new(false),
        }
    }

    pub fn link(&self) -> MockLink<'_> {
        MockLink {
            wire: self,
            parser: FrameParser::new(),
        }
    }

    /// Answer the next poll with `telemetry`
    pub fn reply(&self, telemetry: Telemetry) {
        self.reply_raw(&telemetry.encode());
    }

    /// Answer the next poll with a healthy record carrying `status`
    pub fn reply_status(&self, status: StatusBits) {
        self.reply(Telemetry {
            current_ma: 400,
            temperature_c: 30,
            status,
        });
    }

    /// Answer the next poll with arbitrary bytes
    pub fn reply_raw(&self, bytes: &[u8]) {
        let mut reply = Reply::new();
        reply.extend_from_slice(bytes).unwrap();
        self.script.borrow_mut().push_back(Some(reply)).unwrap();
    }

    /// Leave the next poll unanswered
    pub fn silent(&self) {
        self.script.borrow_mut().push_back(None).unwrap();
    }

    /// Report one byte fewer than requested on every write
    pub fn set_short_write(&self, short: bool) {
        self.short_write.set(short);
    }

    /// Commands decoded so far, in wire order
    pub fn sent(&self) -> Vec<Command, 128> {
        self.sent.borrow().clone()
    }

    /// Commands decoded so far, excluding status polls
    pub fn sent_commands(&self) -> Vec<Command, 128> {
        self.sent
            .borrow()
            .iter()
            .copied()
            .filter(|c| *c != Command::GetStatus)
            .collect()
    }

    pub fn count(&self, command: Command) -> usize {
        self.sent.borrow().iter().filter(|c| **c == command).count()
    }

    fn record(&self, command: Command) {
        self.sent.borrow_mut().push(command).unwrap();
        if command == Command::GetStatus {
            if let Some(Some(reply)) = self.script.borrow_mut().pop_front() {
                *self.rx.borrow_mut() = reply;
            }
        }
    }
}

/// Controller side of the scripted link
pub struct MockLink<'a> {
    wire: &'a MockWire,
    parser: FrameParser,
}

impl ErrorType for MockLink<'_> {
    type Error = ErrorKind;
}

impl Write for MockLink<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        let mut rest = buf;
        while !rest.is_empty() {
            let (frame, used) = self
                .parser
                .feed_bytes(rest)
                .map_err(|_| ErrorKind::InvalidData)?;
            rest = &rest[used..];
            if let Some(frame) = frame {
                let command = Command::from_frame(&frame).map_err(|_| ErrorKind::InvalidData)?;
                self.wire.record(command);
            }
        }

        if self.wire.short_write.get() {
            return Ok(buf.len().saturating_sub(1));
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

impl Read for MockLink<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let reply = core::mem::take(&mut *self.wire.rx.borrow_mut());
        if reply.is_empty() {
            return core::future::pending().await;
        }

        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }
}

/// Safety input with a settable level
///
/// Inputs are active low: `asserted` drives the pin low.
#[derive(Default)]
pub struct TestPin {
    low: Cell<bool>,
    broken: Cell<bool>,
    wait_broken: Cell<bool>,
}

impl TestPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asserted() -> Self {
        let pin = Self::new();
        pin.set_asserted(true);
        pin
    }

    pub fn set_asserted(&self, asserted: bool) {
        self.low.set(asserted);
    }

    /// Make every read and wait fail
    pub fn set_broken(&self, broken: bool) {
        self.broken.set(broken);
    }

    /// Make waits fail while reads keep working
    pub fn set_wait_broken(&self, broken: bool) {
        self.wait_broken.set(broken);
    }

    fn wait(&self) -> Result<(), PinFault> {
        if self.broken.get() || self.wait_broken.get() {
            return Err(PinFault);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl embedded_hal::digital::ErrorType for &TestPin {
    type Error = PinFault;
}

impl embedded_hal::digital::InputPin for &TestPin {
    fn is_high(&mut self) -> Result<bool, PinFault> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, PinFault> {
        if self.broken.get() {
            return Err(PinFault);
        }
        Ok(self.low.get())
    }
}

impl embedded_hal_async::digital::Wait for &TestPin {
    async fn wait_for_high(&mut self) -> Result<(), PinFault> {
        self.wait()
    }

    async fn wait_for_low(&mut self) -> Result<(), PinFault> {
        self.wait()
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), PinFault> {
        self.wait()
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), PinFault> {
        self.wait()
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), PinFault> {
        self.wait()
    }
}
