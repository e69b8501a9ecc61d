//! Timer-driven producer with a blocking worker handoff.
//!
//! The timer side runs as an async task. It must never block and never takes
//! the queue lock; on every tick it hands one unit of work to the blocking
//! pool and waits for it before re-arming. The worker takes the lock and
//! appends the payload if the whole payload fits.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::queue::SynchronizedQueue;

/// Lifecycle of the producer timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    /// No timer scheduled.
    Disarmed,
    /// Timer scheduled to fire after one interval.
    Armed,
    /// Timer fired; a worker is appending or about to.
    Firing,
}

impl ProducerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ProducerState::Armed,
            2 => ProducerState::Firing,
            _ => ProducerState::Disarmed,
        }
    }
}

/// Periodic payload generator for a [`SynchronizedQueue`].
///
/// Arming requires a tokio runtime. Disarming waits until the timer task and
/// any worker it handed off have finished, so once [`disarm`](Self::disarm)
/// returns nothing the producer started can touch the queue.
///
/// Dropping an armed producer cancels the timer but cannot wait for it.
pub struct DeferredProducer {
    inner: Arc<ProducerInner>,
}

struct ProducerInner {
    queue: Arc<SynchronizedQueue>,
    interval: Duration,
    payload: Vec<u8>,
    state: AtomicU8,
    timer: Mutex<Option<Timer>>,
}

struct Timer {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DeferredProducer {
    /// Creates a disarmed producer appending `payload` every `interval`.
    pub fn new(queue: Arc<SynchronizedQueue>, interval: Duration, payload: impl Into<Vec<u8>>) -> Self {
        DeferredProducer {
            inner: Arc::new(ProducerInner {
                queue,
                interval,
                payload: payload.into(),
                state: AtomicU8::new(ProducerState::Disarmed as u8),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn payload(&self) -> &[u8] {
        &self.inner.payload
    }

    /// Returns the current timer state.
    pub fn state(&self) -> ProducerState {
        ProducerState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Returns true while the timer is allowed to re-arm.
    pub fn is_enabled(&self) -> bool {
        let timer = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        timer.as_ref().is_some_and(|t| !t.cancel.is_cancelled())
    }

    /// Schedules the first firing one interval from now.
    ///
    /// Does nothing if the producer is already armed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn arm(&self) {
        let mut timer = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        self.inner.set_state(ProducerState::Armed);
        let task = tokio::spawn(run_timer(Arc::clone(&self.inner), cancel.clone()));
        *timer = Some(Timer { cancel, task });
        debug!(interval = ?self.inner.interval, "vfifo: producer armed");
    }

    /// Stops the timer and waits for any in-flight worker to finish.
    pub async fn disarm(&self) {
        let timer = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(timer) = timer else {
            return;
        };
        timer.cancel.cancel();
        if let Err(e) = timer.task.await {
            warn!("vfifo: producer timer ended abnormally: {}", e);
        }

        // an arm() that raced in while we waited owns the state now
        let slot = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            self.inner.set_state(ProducerState::Disarmed);
        }
        debug!("vfifo: producer disarmed");
    }
}

impl Drop for DeferredProducer {
    fn drop(&mut self) {
        let timer = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.cancel.cancel();
        }
    }
}

impl ProducerInner {
    fn set_state(&self, state: ProducerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Worker body. Runs on the blocking pool and may wait for the lock.
    fn produce(&self) {
        if self.queue.push_all(&self.payload) {
            debug!(len = self.payload.len(), "vfifo: auto-generated data added");
        } else {
            debug!("vfifo: buffer full, skipping auto-gen");
        }
    }
}

async fn run_timer(inner: Arc<ProducerInner>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(inner.interval) => {}
        }

        inner.set_state(ProducerState::Firing);
        let worker = Arc::clone(&inner);
        if let Err(e) = tokio::task::spawn_blocking(move || worker.produce()).await {
            warn!("vfifo: producer worker failed: {}", e);
        }

        if cancel.is_cancelled() {
            break;
        }
        inner.set_state(ProducerState::Armed);
    }
}
