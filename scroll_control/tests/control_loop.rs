//! End-to-end runs of sampler → controller → driver with scripted classifiers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use scroll_control::{
    AnimationDriver, ClassifyError, Frame, GestureClassifier, Observation, PageViewport,
    PositionSample, Resolution, Sampler, SamplingLoop, ScrollController, Sensitivity,
    TickOutcome, Viewport,
};

fn camera() -> Option<Frame> { Some(Frame::filled(32, 24, 0)) }

/// Answers from a fixed script, one entry per call.
struct Scripted {
    script: Mutex<VecDeque<Result<Observation, ClassifyError>>>,
}

impl Scripted {
    fn new(script: Vec<Result<Observation, ClassifyError>>) -> Arc<Self> {
        Arc::new(Scripted { script: Mutex::new(script.into()) })
    }
}

impl GestureClassifier for Scripted {
    fn classify(&self, _frame: &Frame) -> Result<Observation, ClassifyError> {
        self.script.lock().unwrap().pop_front()
            .unwrap_or_else(|| Err(ClassifyError::Protocol("script exhausted".into())))
    }
}

/// Sleeps on every call and records the peak number of overlapping calls.
struct Slow {
    delay:     Duration,
    in_flight: AtomicUsize,
    peak:      AtomicUsize,
    calls:     AtomicUsize,
}

impl GestureClassifier for Slow {
    fn classify(&self, _frame: &Frame) -> Result<Observation, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Observation::new(true, 90.0, 0.7))
    }
}

/// One sampling tick followed by waiting for its resolution, then feeding the
/// latest sample to the controller the way the render loop does.
fn step<C: GestureClassifier>(
    sampler: &mut Sampler<fn() -> Option<Frame>, C>,
    ctl:     &mut ScrollController,
) -> Option<Resolution> {
    assert_eq!(sampler.tick(Instant::now()), TickOutcome::Issued);
    let res = sampler.wait(Instant::now() + Duration::from_secs(5));
    ctl.observe(sampler.latest());
    res
}

fn new_sampler<C: GestureClassifier>(c: Arc<C>) -> Sampler<fn() -> Option<Frame>, C> {
    Sampler::new(camera as fn() -> Option<Frame>, c, Duration::from_secs(5))
}

#[test]
fn hand_sweeping_down_the_frame() {
    let script = Scripted::new(vec![
        Ok(Observation::new(true, 10.0, 0.9)),
        Ok(Observation::new(true, 50.0, 0.9)),
        Ok(Observation::new(true, 90.0, 0.9)),
    ]);
    let mut sampler = new_sampler(script);
    let mut ctl = ScrollController::new(Sensitivity::new(15));

    let mut velocities = Vec::new();
    for _ in 0..3 {
        step(&mut sampler, &mut ctl);
        velocities.push(ctl.velocity());
    }

    let expected = [-10.714, 0.0, 10.714];
    for (got, want) in velocities.iter().zip(expected) {
        assert!((got - want).abs() < 0.01, "got {:?}", velocities);
    }
}

#[test]
fn failed_tick_keeps_last_good_sample() {
    let script = Scripted::new(vec![
        Ok(Observation::new(true, 20.0, 0.9)),
        Err(ClassifyError::Protocol("upstream 503".into())),
    ]);
    let mut sampler = new_sampler(script);
    let mut ctl = ScrollController::new(Sensitivity::new(15));

    step(&mut sampler, &mut ctl);
    let before = ctl.velocity();
    assert!(before < 0.0);

    let res = step(&mut sampler, &mut ctl);
    assert!(matches!(res, Some(Resolution::Failed(_))));
    assert_eq!(sampler.latest(), PositionSample::new(true, 20.0));
    assert_eq!(ctl.velocity(), before);
}

#[test]
fn no_hand_means_no_motion() {
    let script = Scripted::new(
        [0.0, 100.0, 12.0, 88.0, 50.0]
            .into_iter()
            .map(|p| Ok(Observation::new(false, p, 0.1)))
            .collect(),
    );
    let mut sampler = new_sampler(script);
    let mut ctl = ScrollController::new(Sensitivity::new(30));
    let mut driver = AnimationDriver::new();
    let mut page = PageViewport::new(5000.0, 500.0);
    page.scroll_by(1000.0);

    for _ in 0..5 {
        step(&mut sampler, &mut ctl);
        assert_eq!(ctl.velocity(), 0.0);
        for _ in 0..36 { driver.tick(ctl.velocity(), &mut page); }
    }
    assert_eq!(page.offset(), 1000.0);
    assert_eq!(driver.applied(), 0);
}

#[test]
fn driver_carries_motion_between_samples() {
    let script = Scripted::new(vec![Ok(Observation::new(true, 100.0, 1.0))]);
    let mut sampler = new_sampler(script);
    let mut ctl = ScrollController::new(Sensitivity::new(10));
    let mut driver = AnimationDriver::new();
    let mut page = PageViewport::new(10_000.0, 500.0);

    step(&mut sampler, &mut ctl);
    // ~600 ms of frames at 60 Hz before the next sample arrives.
    for _ in 0..36 { driver.tick(ctl.velocity(), &mut page); }
    assert_eq!(page.offset(), 360.0);
}

#[test]
fn slow_classifier_never_overlaps() {
    let slow = Arc::new(Slow {
        delay:     Duration::from_millis(120),
        in_flight: AtomicUsize::new(0),
        peak:      AtomicUsize::new(0),
        calls:     AtomicUsize::new(0),
    });
    let sampler = Sampler::new(camera as fn() -> Option<Frame>, slow.clone(), Duration::from_secs(5));
    let lp = SamplingLoop::spawn(sampler, Duration::from_millis(30)).unwrap();

    thread::sleep(Duration::from_millis(700));
    let stats = lp.shutdown().unwrap();

    assert_eq!(slow.peak.load(Ordering::SeqCst), 1);
    assert!(slow.calls.load(Ordering::SeqCst) >= 2);
    assert!(stats.skipped_busy >= 1, "{:?}", stats);
}

#[test]
fn classifier_slower_than_timeout_never_overlaps() {
    let slow = Arc::new(Slow {
        delay:     Duration::from_millis(400),
        in_flight: AtomicUsize::new(0),
        peak:      AtomicUsize::new(0),
        calls:     AtomicUsize::new(0),
    });
    let sampler = Sampler::new(camera as fn() -> Option<Frame>, slow.clone(), Duration::from_millis(100));
    let lp = SamplingLoop::spawn(sampler, Duration::from_millis(30)).unwrap();

    thread::sleep(Duration::from_millis(1000));
    let stats = lp.shutdown().unwrap();

    assert_eq!(slow.peak.load(Ordering::SeqCst), 1);
    assert_eq!(slow.in_flight.load(Ordering::SeqCst), 0);
    assert!(stats.timed_out >= 1, "{:?}", stats);
    assert_eq!(stats.completed, 0);
    // Each call holds the classifier for 400 ms, so a 1 s run fits at most three.
    assert!(slow.calls.load(Ordering::SeqCst) <= 3, "{:?}", stats);
}
