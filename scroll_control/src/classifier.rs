//! Gesture classifiers: turn a still frame into an [`Observation`].
//!
//! * [`BlobClassifier`] — in-process luminance blob finder.
//! * [`ProcessClassifier`] — bridge to an external vision helper that speaks
//!   a tiny stdin/stdout protocol.
//! * [`Throttled`] — wraps another classifier with latency and periodic
//!   failures, to behave like a slow hosted model.

use std::ffi::{OsStr, OsString};
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::frame::Frame;
use crate::sample::{Observation, ResponseError};

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

/// A failed classification.  Every variant is recoverable: the sampler logs
/// it and tries again on the next tick.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier I/O: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Malformed(#[from] ResponseError),

    #[error("classifier protocol: {0}")]
    Protocol(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("classification worker exited without a result")]
    WorkerLost,

    #[error("injected failure on call {0}")]
    Injected(u64),
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

/// Locates the hand in a frame.
///
/// Called from a worker thread.  The sampler gives up on a call after its
/// timeout but issues no new one until that call has returned, so a
/// classifier that can hang should also implement [`cancel`](Self::cancel).
pub trait GestureClassifier: Send + Sync + 'static {
    fn classify(&self, frame: &Frame) -> Result<Observation, ClassifyError>;

    /// Make a `classify` call in progress on another thread return soon.
    fn cancel(&self) {}
}

impl<C: GestureClassifier + ?Sized> GestureClassifier for Box<C> {
    fn classify(&self, frame: &Frame) -> Result<Observation, ClassifyError> {
        (**self).classify(frame)
    }

    fn cancel(&self) { (**self).cancel() }
}

// ════════════════════════════════════════════════════════════════════════════
// BlobClassifier
// ════════════════════════════════════════════════════════════════════════════

/// Treats bright pixels as the hand and reports the centroid row.
#[derive(Clone, Debug)]
pub struct BlobClassifier {
    /// Pixels at or above this luminance count as hand.
    pub threshold: u8,
    /// Fraction of the frame that must be bright before a hand is reported.
    pub min_coverage: f32,
    /// Coverage at which confidence saturates at 1.0.
    pub full_coverage: f32,
}

impl Default for BlobClassifier {
    fn default() -> Self {
        BlobClassifier {
            threshold:     200,
            min_coverage:  0.005,
            full_coverage: 0.03,
        }
    }
}

impl GestureClassifier for BlobClassifier {
    fn classify(&self, frame: &Frame) -> Result<Observation, ClassifyError> {
        if !frame.is_well_formed() || frame.width == 0 || frame.height == 0 {
            return Err(ClassifyError::Protocol(format!(
                "frame {}x{} carries {} bytes", frame.width, frame.height, frame.data.len()
            )));
        }

        let width = frame.width as usize;
        let mut count: u64 = 0;
        let mut row_sum: u64 = 0;
        for (i, &luma) in frame.data.iter().enumerate() {
            if luma >= self.threshold {
                count += 1;
                row_sum += (i / width) as u64;
            }
        }

        let total = frame.data.len() as f32;
        let coverage = count as f32 / total;
        if count == 0 || coverage < self.min_coverage {
            return Ok(Observation::absent());
        }

        let centroid = row_sum as f32 / count as f32;
        let span = (frame.height - 1).max(1) as f32;
        let position = centroid / span * 100.0;
        let confidence = (coverage / self.full_coverage).min(1.0);
        Ok(Observation::new(true, position, confidence))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ProcessClassifier
// ════════════════════════════════════════════════════════════════════════════

/// Talks to an external vision helper over its stdin/stdout.
///
/// Protocol:
///
/// 1. The helper prints `READY` on its first line once its model is loaded.
/// 2. Per frame we write `width`, `height`, `channels` as little-endian
///    `u32`, followed by the raw pixel bytes.
/// 3. The helper answers with one line of JSON:
///    `{"handDetected": bool, "verticalPosition": number, "confidence": number}`.
///
/// [`cancel`](GestureClassifier::cancel) kills the helper; the next call
/// starts a fresh one.  The helper is killed when the classifier is dropped.
pub struct ProcessClassifier {
    program: OsString,
    args:    Vec<OsString>,
    io:      Mutex<HelperIo>,
    child:   Mutex<Child>,
    /// Set when the running helper was killed and must be replaced.
    killed:  AtomicBool,
}

struct HelperIo {
    stdin:  ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessClassifier {
    /// Spawn `program` with `args` and wait for its `READY` line.
    pub fn spawn<S: AsRef<OsStr>>(program: S, args: &[S]) -> Result<Self, ClassifyError> {
        let program = program.as_ref().to_os_string();
        let args: Vec<OsString> = args.iter().map(|a| a.as_ref().to_os_string()).collect();
        let (child, io) = launch(&program, &args)?;
        Ok(ProcessClassifier {
            program,
            args,
            io:     Mutex::new(io),
            child:  Mutex::new(child),
            killed: AtomicBool::new(false),
        })
    }

    /// Replace a killed helper.  Runs with the `io` lock held.
    fn relaunch(&self, io: &mut HelperIo) -> Result<(), ClassifyError> {
        let (fresh, fresh_io) = launch(&self.program, &self.args)?;
        *io = fresh_io;
        let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
        let mut old = std::mem::replace(&mut *child, fresh);
        let _ = old.kill();
        let _ = old.wait();
        self.killed.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn launch(program: &OsStr, args: &[OsString]) -> Result<(Child, HelperIo), ClassifyError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
        (Some(i), Some(o)) => (i, o),
        _ => {
            let _ = child.kill();
            return Err(ClassifyError::Protocol("helper pipes unavailable".into()));
        }
    };
    let mut stdout = BufReader::new(stdout);

    let mut ready = String::new();
    stdout.read_line(&mut ready)?;
    if ready.trim() != "READY" {
        let _ = child.kill();
        let _ = child.wait();
        return Err(ClassifyError::Protocol(format!(
            "helper did not signal READY, got {:?}", ready.trim()
        )));
    }
    log::info!("vision helper ready (pid {})", child.id());

    Ok((child, HelperIo { stdin, stdout }))
}

impl GestureClassifier for ProcessClassifier {
    fn classify(&self, frame: &Frame) -> Result<Observation, ClassifyError> {
        let mut io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        if self.killed.load(Ordering::SeqCst) {
            log::info!("restarting vision helper");
            self.relaunch(&mut io)?;
        }

        io.stdin.write_all(&frame.width.to_le_bytes())?;
        io.stdin.write_all(&frame.height.to_le_bytes())?;
        io.stdin.write_all(&frame.format.channels().to_le_bytes())?;
        io.stdin.write_all(&frame.data)?;
        io.stdin.flush()?;

        let mut line = String::new();
        if io.stdout.read_line(&mut line)? == 0 {
            return Err(ClassifyError::Protocol("helper closed its output".into()));
        }
        Ok(Observation::from_json(&line)?)
    }

    fn cancel(&self) {
        let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
        log::warn!("killing unresponsive vision helper (pid {})", child.id());
        self.killed.store(true, Ordering::SeqCst);
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Drop for ProcessClassifier {
    fn drop(&mut self) {
        let child = self.child.get_mut().unwrap_or_else(|e| e.into_inner());
        let _ = child.kill();
        let _ = child.wait();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Throttled — simulated remote latency and flakiness
// ════════════════════════════════════════════════════════════════════════════

/// Delays every call by `latency` and fails every `fail_every`-th call.
pub struct Throttled<C> {
    inner:      C,
    latency:    Duration,
    fail_every: Option<u64>,
    calls:      AtomicU64,
}

impl<C: GestureClassifier> Throttled<C> {
    pub fn new(inner: C, latency: Duration, fail_every: Option<u64>) -> Self {
        Throttled {
            inner,
            latency,
            fail_every: fail_every.filter(|&n| n > 0),
            calls: AtomicU64::new(0),
        }
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> u64 { self.calls.load(Ordering::SeqCst) }
}

impl<C: GestureClassifier> GestureClassifier for Throttled<C> {
    fn classify(&self, frame: &Frame) -> Result<Observation, ClassifyError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        if let Some(every) = self.fail_every {
            if n % every == 0 {
                return Err(ClassifyError::Injected(n));
            }
        }
        self.inner.classify(frame)
    }

    fn cancel(&self) { self.inner.cancel() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
