//! Top-level application state.
//!
//! `AppState` owns the `ScrollController`, the `AnimationDriver`, the page
//! and the camera.  The sampling loop runs on its own thread and reports
//! through `SamplerEvent`s; everything else happens on the render thread,
//! once per frame.

use std::path::PathBuf;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use scroll_control::{
    AnimationDriver, BlobClassifier, ControlConfig, Frame, GestureClassifier, PageViewport,
    ProcessClassifier, Sampler, SamplerEvent, SamplingLoop, ScrollController, Throttled,
    Viewport, Zone,
};

use crate::article::Article;
use crate::camera::{synth_frame, HandFeed, SimCamera};
use crate::visualizer::{Hud, UiEvent, Visualizer, ARTICLE_COLUMNS, LINE_H, WIN_H};

type SharedClassifier = Arc<Box<dyn GestureClassifier>>;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub control:          ControlConfig,
    /// Artificial delay added to every classification.
    pub latency_ms:       u64,
    /// Make every Nth classification fail.
    pub fail_every:       Option<u64>,
    /// `false` simulates a denied camera permission.
    pub camera_available: bool,
    /// External classifier helper: program followed by its arguments.
    pub classifier_cmd:   Option<Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            control:          ControlConfig::default(),
            latency_ms:       350,
            fail_every:       None,
            camera_available: true,
            classifier_cmd:   None,
        }
    }
}

impl AppConfig {
    /// Parse command-line flags (without the program name).
    ///
    /// `--config` is applied first regardless of its position; the other
    /// flags override it.  `--classifier-cmd` consumes every remaining
    /// argument.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut cfg = AppConfig::default();
        let mut config_path: Option<PathBuf> = None;
        let mut interval:    Option<u64> = None;
        let mut timeout:     Option<u64> = None;
        let mut sensitivity: Option<i64> = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quick"     => {}
                "--no-camera" => cfg.camera_available = false,
                "--config"        => config_path = Some(PathBuf::from(value(&arg, args.next())?)),
                "--interval-ms"   => interval    = Some(number(&arg, args.next())?),
                "--timeout-ms"    => timeout     = Some(number(&arg, args.next())?),
                "--sensitivity"   => sensitivity = Some(number(&arg, args.next())?),
                "--latency-ms"    => cfg.latency_ms = number(&arg, args.next())?,
                "--fail-every"    => cfg.fail_every = Some(number(&arg, args.next())?),
                "--classifier-cmd" => {
                    let cmd: Vec<String> = args.by_ref().collect();
                    if cmd.is_empty() {
                        bail!("--classifier-cmd needs a program");
                    }
                    cfg.classifier_cmd = Some(cmd);
                }
                other => bail!("unknown option {:?}", other),
            }
        }

        if let Some(path) = config_path {
            cfg.control = ControlConfig::load(&path)
                .with_context(|| format!("loading {}", path.display()))?;
        }
        if let Some(ms) = interval    { cfg.control.sample_interval_ms  = ms; }
        if let Some(ms) = timeout     { cfg.control.classify_timeout_ms = ms; }
        if let Some(s)  = sensitivity { cfg.control.sensitivity         = s; }
        cfg.validate()?;

        Ok(cfg)
    }

    /// The simulated latency must leave room for an answer before the
    /// classification timeout, or no sample would ever arrive.
    pub fn validate(&self) -> Result<()> {
        self.control.validate()?;
        if self.classifier_cmd.is_none() && self.latency_ms >= self.control.classify_timeout_ms {
            bail!(
                "simulated latency {} ms must be below the classification timeout {} ms",
                self.latency_ms, self.control.classify_timeout_ms,
            );
        }
        Ok(())
    }
}

fn value(flag: &str, next: Option<String>) -> Result<String> {
    next.ok_or_else(|| anyhow!("{} needs a value", flag))
}

fn number<T: std::str::FromStr>(flag: &str, next: Option<String>) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = value(flag, next)?;
    raw.parse().with_context(|| format!("{} {:?}", flag, raw))
}

/// The classifier every sampling loop of this run shares.
pub fn build_classifier(cfg: &AppConfig) -> Result<SharedClassifier> {
    let classifier: Box<dyn GestureClassifier> = match &cfg.classifier_cmd {
        Some(cmd) => {
            let (program, args) = cmd.split_first()
                .ok_or_else(|| anyhow!("empty classifier command"))?;
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let helper = ProcessClassifier::spawn(program.as_str(), &args)
                .with_context(|| format!("starting classifier {:?}", program))?;
            Box::new(Throttled::new(helper, Duration::ZERO, cfg.fail_every))
        }
        None => Box::new(Throttled::new(
            BlobClassifier::default(),
            Duration::from_millis(cfg.latency_ms),
            cfg.fail_every,
        )),
    };
    Ok(Arc::new(classifier))
}

// ════════════════════════════════════════════════════════════════════════════
// Camera
// ════════════════════════════════════════════════════════════════════════════

enum Camera {
    Live { sampling: SamplingLoop, feed: HandFeed },
    /// Capture unavailable; the message is shown in the error banner.
    Off(String),
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── control loop ─────────────────────────────────────────────────────
    controller: ScrollController,
    driver:     AnimationDriver,
    page:       PageViewport,
    processing: bool,
    failures:   u64,

    // ── perception ───────────────────────────────────────────────────────
    classifier: SharedClassifier,
    control:    ControlConfig,
    camera_allowed: bool,
    camera:     Camera,
    /// A stopped loop whose last classification may still be running.
    retiring:   Option<SamplingLoop>,
    reconnect:  bool,
    hand:       Option<f32>,
    preview:    Option<Frame>,

    // ── content ──────────────────────────────────────────────────────────
    article:    Article,
    pub status: String,
}

impl AppState {
    pub fn new(cfg: AppConfig, classifier: SharedClassifier) -> Result<Self> {
        let sensitivity = cfg.control.sensitivity()?;
        let article = Article::demo(ARTICLE_COLUMNS, LINE_H);
        let page = PageViewport::new(article.height() as f32, WIN_H as f32);

        let mut app = AppState {
            controller: ScrollController::new(sensitivity),
            driver:     AnimationDriver::new(),
            page,
            processing: false,
            failures:   0,
            classifier,
            control:    cfg.control,
            camera_allowed: cfg.camera_available,
            camera:     Camera::Off(String::new()),
            retiring:   None,
            reconnect:  false,
            hand:       None,
            preview:    None,
            article,
            status:     format!("Ready: sensitivity {}", sensitivity.get()),
        };
        app.connect_camera();
        Ok(app)
    }

    // ── camera lifecycle ─────────────────────────────────────────────────

    fn connect_camera(&mut self) {
        // One classifier, one call at a time: the old loop must be gone first.
        if self.retiring.as_ref().is_some_and(|old| !old.is_finished()) {
            self.reconnect = true;
            self.camera = Camera::Off("waiting for the last classification".to_string());
            return;
        }
        self.retiring = None;
        self.reconnect = false;

        let (source, feed) = match SimCamera::open(self.camera_allowed) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("camera unavailable: {}", e);
                self.camera = Camera::Off(e.to_string());
                return;
            }
        };
        feed.send(self.hand);

        let sampler = Sampler::new(source, self.classifier.clone(), self.control.classify_timeout());
        match SamplingLoop::spawn(sampler, self.control.sample_interval()) {
            Ok(sampling) => {
                self.preview = Some(synth_frame(self.hand));
                self.camera = Camera::Live { sampling, feed };
                self.status = "Camera connected".to_string();
            }
            Err(e) => {
                log::error!("could not start sampling thread: {}", e);
                self.camera = Camera::Off(format!("sampling thread: {}", e));
            }
        }
    }

    fn disconnect_camera(&mut self, reason: &str) {
        let previous = std::mem::replace(&mut self.camera, Camera::Off(reason.to_string()));
        if let Camera::Live { mut sampling, .. } = previous {
            sampling.stop();
            self.retiring = Some(sampling);
        }
        self.reconnect = false;
        log::info!("camera off: {}", reason);
        // Nothing is being observed any more.
        self.preview = None;
        self.processing = false;
        self.controller.observe(Default::default());
        self.status = format!("Camera off: {}", reason);
    }

    // ── events ───────────────────────────────────────────────────────────

    pub fn handle_sampler_event(&mut self, event: SamplerEvent) {
        match event {
            SamplerEvent::Processing(busy) => self.processing = busy,
            SamplerEvent::Sample(sample)   => self.controller.observe(sample),
            SamplerEvent::Failed(reason)   => {
                // Logged by the sampler; the last good sample stays in force.
                self.failures += 1;
                log::debug!("failure #{} ignored: {}", self.failures, reason);
            }
        }
    }

    /// Returns `false` when the app should quit.
    pub fn handle_ui(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::Hand(hand) => {
                self.hand = hand;
                let lost = match &self.camera {
                    Camera::Live { feed, .. } => !feed.send(hand),
                    Camera::Off(_) => false,
                };
                if lost {
                    self.disconnect_camera("camera disconnected");
                } else if self.is_camera_live() {
                    self.preview = Some(synth_frame(hand));
                }
            }
            UiEvent::Sensitivity(delta) => {
                let s = self.controller.adjust_sensitivity(delta);
                self.status = format!("Sensitivity {}", s.get());
            }
            UiEvent::ToggleCamera => {
                if self.is_camera_live() {
                    self.disconnect_camera("camera disconnected");
                } else if self.reconnect {
                    // Second press while waiting cancels the reconnect.
                    self.reconnect = false;
                    self.camera = Camera::Off("camera disconnected".to_string());
                } else {
                    self.connect_camera();
                }
            }
            UiEvent::Quit => return false,
        }
        true
    }

    // ── per-frame tick ───────────────────────────────────────────────────

    pub fn tick(&mut self) {
        if self.reconnect && self.retiring.as_ref().map_or(true, SamplingLoop::is_finished) {
            self.connect_camera();
        }

        let events = match &self.camera {
            Camera::Live { sampling, .. } => sampling.drain(),
            Camera::Off(_) => Vec::new(),
        };
        for e in events {
            self.handle_sampler_event(e);
        }
        self.driver.tick(self.controller.velocity(), &mut self.page);
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn is_camera_live(&self) -> bool { matches!(self.camera, Camera::Live { .. }) }

    pub fn camera_error(&self) -> Option<&str> {
        match &self.camera {
            Camera::Off(msg) => Some(msg.as_str()),
            Camera::Live { .. } => None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.controller.zone() {
            None               => "NO HAND DETECTED",
            Some(Zone::Up)     => "SCROLLING UP",
            Some(Zone::Down)   => "SCROLLING DOWN",
            Some(Zone::Neutral) => "NEUTRAL / HOLD",
        }
    }

    pub fn controller(&self) -> &ScrollController { &self.controller }
    pub fn page(&self)       -> &PageViewport     { &self.page }
    pub fn article(&self)    -> &Article          { &self.article }
    pub fn processing(&self) -> bool              { self.processing }

    pub fn hud(&self) -> Hud<'_> {
        Hud {
            preview:     self.preview.as_ref(),
            sample:      self.controller.sample(),
            velocity:    self.controller.velocity(),
            sensitivity: self.controller.sensitivity(),
            processing:  self.processing,
            label:       self.status_label(),
            status:      &self.status,
            error:       self.camera_error(),
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Some(old) = self.retiring.take() {
            old.shutdown();
        }
        let camera = std::mem::replace(&mut self.camera, Camera::Off(String::new()));
        if let Camera::Live { sampling, .. } = camera {
            if let Some(stats) = sampling.shutdown() {
                log::info!("final sampler stats: {:?}", stats);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Creates the window and the camera, then drives the event/render loop at
/// ~60 fps until the window closes or the user quits.
pub fn run(cfg: AppConfig) -> Result<()> {
    let classifier = build_classifier(&cfg)?;

    // ── Visualizer (owns the window and the ui sender) ───────────────────
    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>();
    let mut vis = Visualizer::new(ui_tx).context("opening window")?;

    // ── App state ────────────────────────────────────────────────────────
    let mut app = AppState::new(cfg, classifier)?;

    // ── Main loop ────────────────────────────────────────────────────────
    while vis.is_open() {
        // 1. Poll window input → UiEvents
        if !vis.poll_input() { break; }

        // 2. Apply them
        loop {
            match ui_rx.try_recv() {
                Ok(evt) => {
                    if !app.handle_ui(evt) { return Ok(()); }
                }
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        // 3. Sampler events + one animation step
        app.tick();

        // 4. Render
        let offset = app.page().offset();
        let progress = app.page().progress();
        vis.render(app.article(), offset, progress, &app.hud());
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use scroll_control::{ClassifyError, Observation, PositionSample, Sensitivity};

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn make_app(camera: bool) -> AppState {
        let cfg = AppConfig {
            control: ControlConfig { sample_interval_ms: 20, ..ControlConfig::default() },
            latency_ms: 0,
            camera_available: camera,
            ..AppConfig::default()
        };
        let classifier = build_classifier(&cfg).unwrap();
        AppState::new(cfg, classifier).unwrap()
    }

    /// Tick until `done` holds or two seconds pass.
    fn tick_until(app: &mut AppState, done: impl Fn(&AppState) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            app.tick();
            if done(app) { return true; }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn defaults_from_empty_args() {
        assert_eq!(AppConfig::from_args(Vec::new()).unwrap(), AppConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = AppConfig::from_args(args(
            "--interval-ms 250 --timeout-ms 900 --sensitivity 22 --latency-ms 10 --fail-every 4 --no-camera",
        )).unwrap();
        assert_eq!(cfg.control.sample_interval_ms, 250);
        assert_eq!(cfg.control.classify_timeout_ms, 900);
        assert_eq!(cfg.control.sensitivity, 22);
        assert_eq!(cfg.latency_ms, 10);
        assert_eq!(cfg.fail_every, Some(4));
        assert!(!cfg.camera_available);
    }

    #[test]
    fn latency_must_undercut_timeout() {
        assert!(AppConfig::from_args(args("--latency-ms 1500")).is_err());
        assert!(AppConfig::from_args(args("--latency-ms 2000 --timeout-ms 1800")).is_err());
        assert!(AppConfig::from_args(args("--latency-ms 1499")).is_ok());
        assert!(AppConfig::from_args(args("--latency-ms 2000 --timeout-ms 2500")).is_ok());
        // An external helper has no simulated latency.
        assert!(AppConfig::from_args(args("--latency-ms 5000 --classifier-cmd helper")).is_ok());
    }

    #[test]
    fn classifier_cmd_takes_the_rest() {
        let cfg = AppConfig::from_args(args("--quick --classifier-cmd python3 hand.py --fast")).unwrap();
        assert_eq!(cfg.classifier_cmd, Some(args("python3 hand.py --fast")));
    }

    #[test]
    fn bad_flags_are_rejected() {
        assert!(AppConfig::from_args(args("--sensitivity 31")).is_err());
        assert!(AppConfig::from_args(args("--interval-ms 0")).is_err());
        assert!(AppConfig::from_args(args("--latency-ms soon")).is_err());
        assert!(AppConfig::from_args(args("--timeout-ms")).is_err());
        assert!(AppConfig::from_args(args("--classifier-cmd")).is_err());
        assert!(AppConfig::from_args(args("--frobnicate")).is_err());
    }

    #[test]
    fn status_label_follows_zone() {
        let mut app = make_app(false);
        assert_eq!(app.status_label(), "NO HAND DETECTED");
        app.handle_sampler_event(SamplerEvent::Sample(PositionSample::new(true, 10.0)));
        assert_eq!(app.status_label(), "SCROLLING UP");
        app.handle_sampler_event(SamplerEvent::Sample(PositionSample::new(true, 50.0)));
        assert_eq!(app.status_label(), "NEUTRAL / HOLD");
        app.handle_sampler_event(SamplerEvent::Sample(PositionSample::new(true, 90.0)));
        assert_eq!(app.status_label(), "SCROLLING DOWN");
    }

    #[test]
    fn failure_event_keeps_velocity() {
        let mut app = make_app(false);
        app.handle_sampler_event(SamplerEvent::Sample(PositionSample::new(true, 80.0)));
        let v = app.controller().velocity();
        app.handle_sampler_event(SamplerEvent::Failed("timeout".into()));
        assert_eq!(app.controller().velocity(), v);
        assert_eq!(app.failures, 1);
    }

    #[test]
    fn sensitivity_keys_clamp() {
        let mut app = make_app(false);
        for _ in 0..40 { app.handle_ui(UiEvent::Sensitivity(1)); }
        assert_eq!(app.controller().sensitivity(), Sensitivity::new(30));
        for _ in 0..40 { app.handle_ui(UiEvent::Sensitivity(-1)); }
        assert_eq!(app.controller().sensitivity(), Sensitivity::new(5));
    }

    #[test]
    fn denied_camera_shows_error() {
        let app = make_app(false);
        assert!(!app.is_camera_live());
        assert_eq!(app.camera_error(), Some("camera permission denied"));
    }

    #[test]
    fn quit_event_stops() {
        let mut app = make_app(false);
        assert!(!app.handle_ui(UiEvent::Quit));
    }

    #[test]
    fn pointer_low_in_preview_scrolls_down() {
        let mut app = make_app(true);
        assert!(app.is_camera_live());
        app.handle_ui(UiEvent::Hand(Some(95.0)));
        assert!(tick_until(&mut app, |a| a.controller().velocity() > 0.0));
        let before = app.page().offset();
        app.tick();
        assert!(app.page().offset() > before);
    }

    #[test]
    fn toggling_camera_stops_motion_and_reconnects() {
        let mut app = make_app(true);
        app.handle_ui(UiEvent::Hand(Some(95.0)));
        assert!(tick_until(&mut app, |a| a.controller().velocity() > 0.0));

        app.handle_ui(UiEvent::ToggleCamera);
        assert!(!app.is_camera_live());
        assert_eq!(app.camera_error(), Some("camera disconnected"));
        assert_eq!(app.controller().velocity(), 0.0);

        app.handle_ui(UiEvent::ToggleCamera);
        assert!(tick_until(&mut app, |a| a.is_camera_live()));
        assert!(tick_until(&mut app, |a| a.controller().velocity() > 0.0));
    }

    /// Holds every call for 300 ms and records the peak overlap.
    struct Sluggish {
        in_flight: Arc<AtomicUsize>,
        peak:      Arc<AtomicUsize>,
    }

    impl GestureClassifier for Sluggish {
        fn classify(&self, _frame: &Frame) -> Result<Observation, ClassifyError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(300));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Observation::new(true, 90.0, 1.0))
        }
    }

    #[test]
    fn reconnect_waits_for_the_previous_classification() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let classifier: SharedClassifier = Arc::new(Box::new(Sluggish {
            in_flight: in_flight.clone(),
            peak:      peak.clone(),
        }));
        let cfg = AppConfig {
            control: ControlConfig { sample_interval_ms: 20, ..ControlConfig::default() },
            ..AppConfig::default()
        };
        let mut app = AppState::new(cfg, classifier).unwrap();
        assert!(tick_until(&mut app, |_| in_flight.load(Ordering::SeqCst) == 1));

        // Off and straight back on while the call is still running.
        app.handle_ui(UiEvent::ToggleCamera);
        app.handle_ui(UiEvent::ToggleCamera);
        assert!(!app.is_camera_live());
        assert_eq!(app.camera_error(), Some("waiting for the last classification"));

        assert!(tick_until(&mut app, |a| a.is_camera_live()));
        assert!(tick_until(&mut app, |a| a.controller().velocity() > 0.0));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
