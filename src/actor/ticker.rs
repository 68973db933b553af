//! Ticker Actor: Dedicated thread that paces the overlay.
//!
//! Sprite motion is integrated from wall-clock deltas, so a late or skipped
//! tick only costs smoothness, never correctness. The ticker therefore never
//! lets ticks queue up behind a slow consumer.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A pacing signal.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Sequence number, starting at zero.
    pub frame: u64,
    /// Time since the ticker started.
    pub elapsed: Duration,
}

/// Emits a [`Tick`] every `interval` on its own thread.
#[derive(Debug)]
pub struct TickerActor {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    tick_rx: Receiver<Tick>,
    interval: Duration,
}

impl TickerActor {
    /// Start ticking every `interval` (16 ms for ~60 FPS).
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(interval: Duration) -> io::Result<Self> {
        let interval = interval.max(Duration::from_millis(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        // Two slots: one tick being consumed, one waiting.
        let (tick_tx, tick_rx) = bounded(2);

        let handle = thread::Builder::new()
            .name("danmaku-ticker".to_string())
            .spawn(move || Self::run_loop(&tick_tx, &flag, interval))?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
            tick_rx,
            interval,
        })
    }

    /// Tick receiver.
    #[inline]
    pub const fn receiver(&self) -> &Receiver<Tick> {
        &self.tick_rx
    }

    /// Configured period.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Ask the ticker thread to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop and wait for the ticker thread.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop(tick_tx: &Sender<Tick>, shutdown: &AtomicBool, interval: Duration) {
        let start = Instant::now();
        let mut frame = 0u64;
        let mut next_tick = start + interval;

        while !shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now < next_tick {
                thread::sleep((next_tick - now).min(Duration::from_millis(1)));
                continue;
            }

            match tick_tx.try_send(Tick { frame, elapsed: now - start }) {
                // Full buffer: the consumer is behind, drop this tick.
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => break,
            }
            frame += 1;
            next_tick += interval;
            if next_tick < now {
                next_tick = now + interval;
            }
        }
    }
}

impl Drop for TickerActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_basic() {
        let ticker = TickerActor::spawn(Duration::from_millis(10)).unwrap();

        let tick = ticker.receiver().recv_timeout(Duration::from_millis(200));
        assert_eq!(tick.unwrap().frame, 0);
        assert!(ticker.receiver().recv_timeout(Duration::from_millis(100)).is_ok());

        ticker.join();
    }

    #[test]
    fn test_ticker_does_not_queue() {
        let ticker = TickerActor::spawn(Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(ticker.receiver().len() <= 2);
        ticker.join();
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let ticker = TickerActor::spawn(Duration::ZERO).unwrap();
        assert_eq!(ticker.interval(), Duration::from_millis(1));
        ticker.join();
    }
}
