//! The sampling side of the loop.
//!
//! [`Sampler`] is the single-threaded core: it decides on each tick whether a
//! classification may be issued, runs it on a worker thread, and folds the
//! result into the latest [`PositionSample`].  The pending request doubles as
//! the processing flag.  A request that times out is reported as a failure,
//! but its worker is kept and no new request is issued until that worker has
//! exited, so at most one `classify` call is ever running.
//!
//! [`SamplingLoop`] drives a `Sampler` from its own thread at a fixed period
//! and publishes [`SamplerEvent`]s to whoever renders.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::classifier::{ClassifyError, GestureClassifier};
use crate::frame::FrameSource;
use crate::sample::{Observation, PositionSample, ResponseError};

// ════════════════════════════════════════════════════════════════════════════
// Outcomes
// ════════════════════════════════════════════════════════════════════════════

/// What a single sampling tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A classification is still outstanding; this tick is dropped.
    Busy,
    /// The camera had no frame to give.
    NoFrame,
    /// A new classification was started.
    Issued,
}

/// How an outstanding classification ended.
#[derive(Debug)]
pub enum Resolution {
    Updated(PositionSample),
    /// The previous sample is kept.
    Failed(ClassifyError),
}

/// Running totals, mostly for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub ticks:            u64,
    pub issued:           u64,
    pub skipped_busy:     u64,
    pub skipped_no_frame: u64,
    pub completed:        u64,
    pub failed:           u64,
    pub timed_out:        u64,
}

struct Pending {
    rx:        Receiver<Result<Observation, ClassifyError>>,
    issued_at: Instant,
    worker:    Option<JoinHandle<()>>,
}

// ════════════════════════════════════════════════════════════════════════════
// Sampler
// ════════════════════════════════════════════════════════════════════════════

pub struct Sampler<S, C> {
    source:     S,
    classifier: Arc<C>,
    timeout:    Duration,
    latest:     PositionSample,
    pending:    Option<Pending>,
    /// Worker of a timed-out request that has not returned yet.
    abandoned:  Option<JoinHandle<()>>,
    stats:      SamplerStats,
}

impl<S: FrameSource, C: GestureClassifier> Sampler<S, C> {
    /// `timeout` bounds how long one classification may stay outstanding.
    pub fn new(source: S, classifier: Arc<C>, timeout: Duration) -> Self {
        Sampler {
            source,
            classifier,
            timeout,
            latest:  PositionSample::absent(),
            pending: None,
            abandoned: None,
            stats:   SamplerStats::default(),
        }
    }

    pub fn is_processing(&self) -> bool  { self.pending.is_some() }
    pub fn latest(&self) -> PositionSample { self.latest }
    pub fn stats(&self)  -> SamplerStats   { self.stats }
    pub fn timeout(&self) -> Duration      { self.timeout }

    /// A timed-out classification is still running.
    pub fn is_draining(&self) -> bool {
        self.abandoned.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// One sampling tick: skip when busy or frameless, otherwise capture and
    /// hand the frame to a classification worker.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.stats.ticks += 1;

        if self.pending.is_some() {
            self.stats.skipped_busy += 1;
            log::debug!("tick {}: classification outstanding, skipped", self.stats.ticks);
            return TickOutcome::Busy;
        }

        if !self.reap_abandoned() {
            self.stats.skipped_busy += 1;
            log::debug!("tick {}: timed-out classification still running, skipped", self.stats.ticks);
            return TickOutcome::Busy;
        }

        let Some(frame) = self.source.capture_frame() else {
            self.stats.skipped_no_frame += 1;
            log::debug!("tick {}: no frame", self.stats.ticks);
            return TickOutcome::NoFrame;
        };

        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        let worker_tx = tx.clone();
        let spawned = thread::Builder::new()
            .name("classify".into())
            .spawn(move || {
                // The receiver is gone if the request timed out or the loop
                // was torn down; the result is simply dropped.
                let _ = worker_tx.send(classifier.classify(&frame));
            });
        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Surfaces as an ordinary failure on the next poll.
                let _ = tx.send(Err(ClassifyError::Io(e)));
                None
            }
        };

        self.pending = Some(Pending { rx, issued_at: now, worker });
        self.stats.issued += 1;
        log::debug!("tick {}: classification issued", self.stats.ticks);
        TickOutcome::Issued
    }

    /// Non-blocking check on the outstanding request.  A request older than
    /// the timeout at `now` is abandoned as a failure.
    pub fn poll(&mut self, now: Instant) -> Option<Resolution> {
        let pending = self.pending.as_ref()?;
        let result = match pending.rx.try_recv() {
            Ok(r) => r,
            Err(TryRecvError::Empty) => {
                if now.saturating_duration_since(pending.issued_at) < self.timeout {
                    return None;
                }
                Err(ClassifyError::Timeout(self.timeout))
            }
            Err(TryRecvError::Disconnected) => Err(ClassifyError::WorkerLost),
        };
        Some(self.resolve(result))
    }

    /// Block until the outstanding request resolves, times out, or
    /// `deadline` passes, whichever comes first.
    pub fn wait(&mut self, deadline: Instant) -> Option<Resolution> {
        let pending = self.pending.as_ref()?;
        let expires = pending.issued_at + self.timeout;
        let limit = deadline.min(expires);
        let result = match pending.rx.recv_timeout(limit.saturating_duration_since(Instant::now())) {
            Ok(r) => r,
            Err(RecvTimeoutError::Timeout) => {
                if Instant::now() < expires {
                    return None;
                }
                Err(ClassifyError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ClassifyError::WorkerLost),
        };
        Some(self.resolve(result))
    }

    /// `true` once no timed-out worker is left running.
    fn reap_abandoned(&mut self) -> bool {
        match self.abandoned.take() {
            Some(worker) if !worker.is_finished() => {
                self.abandoned = Some(worker);
                false
            }
            Some(worker) => {
                let _ = worker.join();
                log::debug!("timed-out classification finished");
                true
            }
            None => true,
        }
    }

    /// Cancel whatever is still running and wait for its worker to exit.
    fn retire(&mut self) {
        let workers: Vec<JoinHandle<()>> = self.pending.take()
            .and_then(|p| p.worker)
            .into_iter()
            .chain(self.abandoned.take())
            .collect();
        if workers.iter().any(|w| !w.is_finished()) {
            log::debug!("cancelling outstanding classification");
            self.classifier.cancel();
        }
        for worker in workers {
            let _ = worker.join();
        }
    }

    fn resolve(&mut self, result: Result<Observation, ClassifyError>) -> Resolution {
        let worker = self.pending.take().and_then(|p| p.worker);
        if matches!(result, Err(ClassifyError::Timeout(_))) {
            // The late result goes nowhere; the worker is reaped by a later tick.
            self.classifier.cancel();
            self.abandoned = worker;
        } else if let Some(worker) = worker {
            // Already sent its result, so it is about to return.
            let _ = worker.join();
        }

        let result = result.and_then(|obs| {
            if obs.vertical_position.is_finite() {
                Ok(obs)
            } else {
                Err(ClassifyError::Malformed(ResponseError::NonFinite(obs.vertical_position)))
            }
        });

        match result {
            Ok(obs) => {
                self.latest = PositionSample::from(obs);
                self.stats.completed += 1;
                log::debug!(
                    "observation: hand={} position={:.1} confidence={:.2}",
                    self.latest.hand_present, self.latest.vertical_position, obs.confidence()
                );
                Resolution::Updated(self.latest)
            }
            Err(e) => {
                if matches!(e, ClassifyError::Timeout(_)) {
                    self.stats.timed_out += 1;
                } else {
                    self.stats.failed += 1;
                }
                log::warn!("classification failed: {}", e);
                Resolution::Failed(e)
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SamplerEvent — published to the render side
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum SamplerEvent {
    /// The processing flag changed.
    Processing(bool),
    /// A classification succeeded.
    Sample(PositionSample),
    /// A classification failed; diagnostic text only.
    Failed(String),
}

// ════════════════════════════════════════════════════════════════════════════
// SamplingLoop — the sampling thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to a running sampling thread.  Dropping it stops the thread.
pub struct SamplingLoop {
    stop_tx: Option<Sender<()>>,
    events:  Receiver<SamplerEvent>,
    handle:  Option<JoinHandle<SamplerStats>>,
}

impl SamplingLoop {
    /// Start ticking `sampler` every `interval`.
    pub fn spawn<S: FrameSource, C: GestureClassifier>(
        sampler:  Sampler<S, C>,
        interval: Duration,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (event_tx, events) = mpsc::channel::<SamplerEvent>();

        let handle = thread::Builder::new()
            .name("sampling".into())
            .spawn(move || sampling_thread(sampler, interval, stop_rx, event_tx))?;

        log::info!("sampling loop started ({} ms period)", interval.as_millis());
        Ok(SamplingLoop { stop_tx: Some(stop_tx), events, handle: Some(handle) })
    }

    /// Drain pending events (non-blocking).
    pub fn drain(&self) -> Vec<SamplerEvent> {
        let mut out = Vec::new();
        while let Ok(e) = self.events.try_recv() { out.push(e); }
        out
    }

    /// Ask the thread to exit without waiting for it.
    pub fn stop(&mut self) {
        if self.stop_tx.take().is_some() {
            log::info!("sampling loop stopping");
        }
    }

    /// The thread has exited, and with it any classification it started.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stop the thread and wait for it, returning its final stats.
    pub fn shutdown(mut self) -> Option<SamplerStats> {
        self.stop();
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl Drop for SamplingLoop {
    fn drop(&mut self) { self.stop(); }
}

fn sampling_thread<S: FrameSource, C: GestureClassifier>(
    mut sampler: Sampler<S, C>,
    interval:    Duration,
    stop_rx:     Receiver<()>,
    events:      Sender<SamplerEvent>,
) -> SamplerStats {
    let publish = |res: Resolution| -> bool {
        let event = match res {
            Resolution::Updated(s) => SamplerEvent::Sample(s),
            Resolution::Failed(e)  => SamplerEvent::Failed(e.to_string()),
        };
        events.send(event).is_ok() && events.send(SamplerEvent::Processing(false)).is_ok()
    };

    let mut next = Instant::now();
    'run: loop {
        match stop_rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            _ => break,
        }

        let now = Instant::now();
        if sampler.tick(now) == TickOutcome::Issued
            && events.send(SamplerEvent::Processing(true)).is_err()
        {
            break;
        }

        // Missed ticks are dropped, not made up.
        next += interval;
        if next <= now {
            next = now + interval;
        }

        loop {
            if let Some(res) = sampler.poll(Instant::now()) {
                if !publish(res) { break 'run; }
            }
            let now = Instant::now();
            if now >= next { break; }

            if sampler.is_processing() {
                if let Some(res) = sampler.wait(next) {
                    if !publish(res) { break 'run; }
                }
            } else {
                match stop_rx.recv_timeout(next - now) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break 'run,
                }
            }
        }
    }

    if sampler.is_processing() || sampler.is_draining() {
        log::debug!("sampling loop exiting with a classification outstanding; its result is discarded");
    }
    sampler.retire();
    log::info!("sampling loop stopped: {:?}", sampler.stats());
    sampler.stats()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
