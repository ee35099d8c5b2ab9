//! Pointer delta batching.
//!
//! The poll loop runs at a few milliseconds per cycle; injecting a mouse
//! move every cycle gives jittery motion. Instead the poll loop adds its
//! per-cycle delta to a [`DeltaAccumulator`], and a [`MouseFlusher`] thread
//! drains it at a fixed rate (about one display frame) with one
//! `move_relative` per tick.
//!
//! The lock is held only to add or drain, never across the injection call.

use crate::backend::MouseBackend;
use crossbeam_channel::{bounded, select, tick, Sender};
use log::{debug, info, trace, warn};
use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Pending {
    dx: f64,
    dy: f64,
}

/// Shared pending pointer delta. Clones refer to the same accumulator.
#[derive(Debug, Clone, Default)]
pub struct DeltaAccumulator {
    pending: Arc<Mutex<Pending>>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fractional delta
    pub fn add(&self, dx: f64, dy: f64) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.dx += dx;
        pending.dy += dy;
    }

    /// Read the pending delta rounded to whole pixels, and zero it
    pub fn drain(&self) -> (i32, i32) {
        let taken = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *pending)
        };
        (to_pixels(taken.dx), to_pixels(taken.dy))
    }

    /// Drop anything pending
    pub fn clear(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending = Default::default();
    }
}

fn to_pixels(v: f64) -> i32 {
    v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

/// Drain the accumulator once and inject the result if it is non-zero.
/// Returns whether a move was injected.
pub fn flush_once<M: MouseBackend>(accumulator: &DeltaAccumulator, mouse: &M) -> bool {
    let (dx, dy) = accumulator.drain();
    if dx == 0 && dy == 0 {
        return false;
    }
    match mouse.move_relative(dx, dy) {
        Ok(()) => {
            trace!("flushed mouse delta ({}, {})", dx, dy);
            true
        }
        Err(e) => {
            warn!("Failed to move mouse: {}", e);
            false
        }
    }
}

/// Fixed-rate flush clock running on its own thread
pub struct MouseFlusher {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MouseFlusher {
    /// Start flushing `accumulator` into `mouse` every `interval`
    pub fn spawn<M>(accumulator: DeltaAccumulator, mouse: M, interval: Duration) -> io::Result<Self>
    where
        M: MouseBackend + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("mouse-flush".to_string())
            .spawn(move || {
                debug!("Mouse flush thread started ({:?} interval)", interval);
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(shutdown_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            flush_once(&accumulator, &mouse);
                        }
                    }
                }
                // Motion queued after shutdown was requested is discarded
                accumulator.clear();
                debug!("Mouse flush thread exited");
            })?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the clock and join its thread. Idempotent.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Mouse flush thread panicked");
            } else {
                info!("✓ Mouse flush thread stopped");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for MouseFlusher {
    fn drop(&mut self) {
        self.stop();
    }
}
