//! Serial command channel
//!
//! One lock serialises every access to the link so no two logical commands
//! interleave their bytes. Both the lock and the I/O are timeout-bounded.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{with_timeout, Duration};
use embedded_io_async::{Read, Write};
use traverse_core::config::RESPONSE_BUFFER_SIZE;
use traverse_protocol::{Command, MAX_FRAME_SIZE};

use crate::error::{Error, Result};

/// Quiet time on the line that ends a response
pub const INTER_BYTE_GAP: Duration = Duration::from_millis(2);

/// Exclusive request/response channel to the driver module
pub struct SerialChannel<M: RawMutex, L> {
    link: Mutex<M, L>,
    timeout: Duration,
}

impl<M: RawMutex, L: Read + Write> SerialChannel<M, L> {
    /// Wrap a link; `timeout` bounds both the lock wait and each read
    pub fn new(link: L, timeout: Duration) -> Self {
        Self {
            link: Mutex::new(link),
            timeout,
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, M, L>> {
        with_timeout(self.timeout, self.link.lock())
            .await
            .map_err(|_| Error::Busy)
    }

    /// Encode and write one command frame
    pub async fn send(&self, command: &Command) -> Result<()> {
        let mut frame = [0u8; MAX_FRAME_SIZE];
        let len = command.to_frame().encode(&mut frame)?;

        let mut link = self.lock().await?;
        let io = async {
            let written = link.write(&frame[..len]).await.map_err(|_| Error::Io)?;
            if written != len {
                return Err(Error::Io);
            }
            link.flush().await.map_err(|_| Error::Io)
        };

        let result = with_timeout(self.timeout, io)
            .await
            .unwrap_or(Err(Error::Timeout));
        if let Err(e) = result {
            warn!("send {} failed: {}", command.opcode(), e);
        }
        result
    }

    /// Read one response into `buf`
    ///
    /// Waits up to the timeout for the first byte, then keeps reading until
    /// the line goes quiet or the buffer (capped at the response buffer
    /// size) is full. Returns the number of bytes read.
    pub async fn read_response(&self, buf: &mut [u8]) -> Result<usize> {
        let limit = buf.len().min(RESPONSE_BUFFER_SIZE);
        let buf = &mut buf[..limit];

        let mut link = self.lock().await?;
        let mut len = match with_timeout(self.timeout, link.read(buf)).await {
            Ok(Ok(0)) | Err(_) => return Err(Error::Timeout),
            Ok(Ok(n)) => n,
            Ok(Err(_)) => return Err(Error::Io),
        };

        while len < buf.len() {
            match with_timeout(INTER_BYTE_GAP, link.read(&mut buf[len..])).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => len += n,
                Ok(Err(_)) => return Err(Error::Io),
            }
        }

        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWire;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use traverse_protocol::StatusBits;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[test]
    fn test_send_writes_whole_frame() {
        let wire = MockWire::new();
        let channel: SerialChannel<NoopRawMutex, _> = SerialChannel::new(wire.link(), TIMEOUT);

        block_on(channel.send(&Command::SetPosition {
            steps: 8000,
            speed: 3200,
        }))
        .unwrap();

        assert_eq!(
            wire.sent().as_slice(),
            &[Command::SetPosition {
                steps: 8000,
                speed: 3200
            }]
        );
    }

    #[test]
    fn test_short_write_is_io_error() {
        let wire = MockWire::new();
        wire.set_short_write(true);
        let channel: SerialChannel<NoopRawMutex, _> = SerialChannel::new(wire.link(), TIMEOUT);

        assert_eq!(block_on(channel.send(&Command::Stop)), Err(Error::Io));
    }

    #[test]
    fn test_status_round_trip() {
        let wire = MockWire::new();
        wire.reply_status(StatusBits::HOMED);
        let channel: SerialChannel<NoopRawMutex, _> = SerialChannel::new(wire.link(), TIMEOUT);

        let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
        let len = block_on(async {
            channel.send(&Command::GetStatus).await?;
            channel.read_response(&mut buf).await
        })
        .unwrap();

        assert_eq!(&buf[..len], &[0x01, 0x90, 30, 0b10]);
    }

    #[test]
    fn test_silence_times_out() {
        let wire = MockWire::new();
        let channel: SerialChannel<NoopRawMutex, _> = SerialChannel::new(wire.link(), TIMEOUT);

        let mut buf = [0u8; 8];
        assert_eq!(block_on(channel.read_response(&mut buf)), Err(Error::Timeout));
    }

    #[test]
    fn test_held_lock_reports_busy() {
        let wire = MockWire::new();
        let channel: SerialChannel<NoopRawMutex, _> = SerialChannel::new(wire.link(), TIMEOUT);

        let held = channel.link.try_lock().unwrap();
        assert_eq!(block_on(channel.send(&Command::Stop)), Err(Error::Busy));
        drop(held);

        assert_eq!(block_on(channel.send(&Command::Stop)), Ok(()));
    }
}
