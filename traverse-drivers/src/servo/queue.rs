//! Bounded command queue between the motion API and the control loop

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration};
use traverse_core::config::COMMAND_QUEUE_SIZE;
use traverse_protocol::Command;

use crate::error::{Error, Result};

/// A command tagged with the motor epoch it was accepted in
///
/// The control loop discards entries whose epoch no longer matches, so a
/// producer that was still waiting for space when the axis halted cannot
/// slip a command past the halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Queued {
    pub command: Command,
    pub epoch: u8,
}

/// FIFO of commands waiting for the control loop
///
/// Producers wait a bounded time for space; overflow is reported, never
/// dropped silently. The single consumer never blocks.
pub struct CommandQueue<M: RawMutex> {
    channel: Channel<M, Queued, COMMAND_QUEUE_SIZE>,
    timeout: Duration,
}

impl<M: RawMutex> CommandQueue<M> {
    /// Create an empty queue; `timeout` bounds how long a full queue is awaited
    pub const fn new(timeout: Duration) -> Self {
        Self {
            channel: Channel::new(),
            timeout,
        }
    }

    /// Append a command, waiting up to the timeout for space
    pub async fn enqueue(&self, command: Command, epoch: u8) -> Result<()> {
        with_timeout(self.timeout, self.channel.send(Queued { command, epoch }))
            .await
            .map_err(|_| {
                warn!("command queue full, dropping {}", command.opcode());
                Error::QueueFull
            })
    }

    /// Take the oldest command without waiting
    pub fn dequeue(&self) -> Option<Queued> {
        self.channel.try_receive().ok()
    }

    /// Discard every queued command, returning how many were dropped
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        while self.channel.try_receive().is_ok() {
            dropped += 1;
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn queue() -> CommandQueue<NoopRawMutex> {
        CommandQueue::new(Duration::from_millis(100))
    }

    fn next(queue: &CommandQueue<NoopRawMutex>) -> Option<Command> {
        queue.dequeue().map(|queued| queued.command)
    }

    #[test]
    fn test_fifo_order() {
        let queue = queue();
        block_on(async {
            queue.enqueue(Command::Home, 0).await.unwrap();
            queue.enqueue(Command::SetSpeed { speed: 1600 }, 0).await.unwrap();
            queue.enqueue(Command::Stop, 0).await.unwrap();
        });

        assert_eq!(next(&queue), Some(Command::Home));
        assert_eq!(next(&queue), Some(Command::SetSpeed { speed: 1600 }));
        assert_eq!(next(&queue), Some(Command::Stop));
        assert_eq!(next(&queue), None);
    }

    #[test]
    fn test_eleventh_command_is_rejected() {
        let queue = queue();

        for i in 0..COMMAND_QUEUE_SIZE as u32 {
            let command = Command::SetPosition { steps: i, speed: 100 };
            assert_eq!(block_on(queue.enqueue(command, 0)), Ok(()));
        }
        assert_eq!(block_on(queue.enqueue(Command::Stop, 0)), Err(Error::QueueFull));

        for i in 0..COMMAND_QUEUE_SIZE as u32 {
            assert_eq!(
                next(&queue),
                Some(Command::SetPosition { steps: i, speed: 100 })
            );
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let queue = queue();
        block_on(async {
            queue.enqueue(Command::Home, 0).await.unwrap();
            queue.enqueue(Command::Stop, 0).await.unwrap();
        });

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_epoch_travels_with_command() {
        let queue = queue();
        block_on(queue.enqueue(Command::Home, 3)).unwrap();

        assert_eq!(
            queue.dequeue(),
            Some(Queued {
                command: Command::Home,
                epoch: 3
            })
        );
    }
}
