//! # scroll_control
//!
//! The control loop behind hand-gesture scrolling.  A webcam frame is sampled
//! every few hundred milliseconds and handed to a gesture classifier, which
//! reports whether a hand is visible and where it sits vertically (0 = top of
//! the frame, 100 = bottom).  That position is mapped to a signed scroll
//! velocity, and an animation driver reapplies the latest velocity to the
//! viewport on every display frame.
//!
//! ```text
//!  FrameSource ─► GestureClassifier ─► Sampler ─► SamplerEvent ─► ScrollController ─► AnimationDriver ─► Viewport
//!    (camera)        (vision model)    (~1.6 Hz)   (mpsc)          (velocity)          (~60 Hz)
//! ```
//!
//! ## Zones
//!
//! | Position | Zone | Velocity |
//! |---|---|---|
//! | `0 ≤ p < 35` | Up | `-(35 - p) / 35 × sensitivity` |
//! | `35 ≤ p ≤ 65` | Neutral | `0` |
//! | `65 < p ≤ 100` | Down | `(p - 65) / 35 × sensitivity` |
//!
//! Negative velocity scrolls up, positive scrolls down.  Without a hand the
//! velocity is always zero.
//!
//! ## Concurrency
//!
//! At most one classification is ever outstanding.  The [`Sampler`] holds the
//! pending request; a tick that finds one pending is skipped outright, never
//! queued.  A request that outlives the classification timeout is abandoned
//! and counted as a failure, so a hung classifier cannot stall sampling.

pub mod config;
pub mod sample;
pub mod velocity;
pub mod frame;
pub mod classifier;
pub mod sampler;
pub mod driver;

pub use config::{ConfigError, ControlConfig};
pub use sample::{Observation, PositionSample, ResponseError, Sensitivity};
pub use velocity::{compute_velocity, ScrollController, Zone, ZONE_BOTTOM, ZONE_TOP};
pub use frame::{CaptureError, Frame, FrameSource, PixelFormat};
pub use classifier::{BlobClassifier, ClassifyError, GestureClassifier, ProcessClassifier, Throttled};
pub use sampler::{Resolution, Sampler, SamplerEvent, SamplerStats, SamplingLoop, TickOutcome};
pub use driver::{AnimationDriver, PageViewport, Viewport, JITTER_EPSILON};
