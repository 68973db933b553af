//! Runtime: Runs a controller on its own tick thread.
//!
//! The runtime moves the controller and the render surface onto a dedicated
//! thread paced by a [`TickerActor`]. Hosts keep an [`OverlayHandle`] and never
//! touch the controller directly.

use super::messages::FrameInfo;
use super::ticker::TickerActor;
use super::OverlayHandle;
use crate::controller::OverlayController;
use crate::render::RenderSurface;
use crossbeam_channel::RecvTimeoutError;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A controller running on its own thread.
#[derive(Debug)]
pub struct OverlayRuntime {
    handle: OverlayHandle,
    shutdown: Arc<AtomicBool>,
    info: Arc<Mutex<FrameInfo>>,
    thread: Option<JoinHandle<OverlayController>>,
}

impl OverlayRuntime {
    /// Move `controller` and `surface` onto a new tick thread.
    ///
    /// The tick period comes from the controller's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS fails to spawn the tick or ticker thread.
    pub fn spawn<S>(mut controller: OverlayController, mut surface: S) -> io::Result<Self>
    where
        S: RenderSurface + Send + 'static,
    {
        let handle = controller.handle();
        let ticker = TickerActor::spawn(controller.config().tick_interval)?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let info = Arc::new(Mutex::new(FrameInfo::default()));

        let flag = Arc::clone(&shutdown);
        let frame_info = Arc::clone(&info);
        let thread = thread::Builder::new()
            .name("danmaku-tick".to_string())
            .spawn(move || {
                Self::run_loop(&mut controller, &mut surface, &ticker, &flag, &frame_info);
                ticker.join();
                controller
            })?;

        tracing::debug!("overlay runtime started");
        Ok(Self {
            handle,
            shutdown,
            info,
            thread: Some(thread),
        })
    }

    fn run_loop<S: RenderSurface>(
        controller: &mut OverlayController,
        surface: &mut S,
        ticker: &TickerActor,
        shutdown: &AtomicBool,
        info: &Mutex<FrameInfo>,
    ) {
        let wait = ticker.interval() * 4;
        let mut last = Instant::now();
        while !shutdown.load(Ordering::Relaxed) {
            match ticker.receiver().recv_timeout(wait) {
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let start = Instant::now();
            let stats = controller.tick(surface);
            info.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(stats, start.elapsed(), start - last);
            last = start;
        }
    }

    /// Cloneable handle for host threads.
    pub fn handle(&self) -> OverlayHandle {
        self.handle.clone()
    }

    /// Timing of the most recent tick.
    pub fn frame_info(&self) -> FrameInfo {
        *self.info.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the tick thread to stop after its current tick.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop the tick thread and take the controller back.
    ///
    /// Returns `None` if the tick thread panicked.
    pub fn join(mut self) -> Option<OverlayController> {
        self.stop()
    }

    fn stop(&mut self) -> Option<OverlayController> {
        self.shutdown();
        let controller = self.thread.take()?.join().ok();
        tracing::debug!(clean = controller.is_some(), "overlay runtime stopped");
        controller
    }

    /// Block until the tick thread has run at least `frames` more ticks, or
    /// `timeout` elapses. Returns whether the ticks happened.
    pub fn wait_for_ticks(&self, frames: u64, timeout: Duration) -> bool {
        let target = self.frame_info().last.frame_number + frames;
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.frame_info().last.frame_number >= target {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }
}

impl Drop for OverlayRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}
