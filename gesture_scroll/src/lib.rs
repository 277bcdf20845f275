//! # gesture_scroll
//!
//! Scroll an article with your hand.  A camera frame is classified a little
//! under twice a second; holding the hand high in the frame scrolls up,
//! holding it low scrolls down, and the middle band holds the page still.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────┬──────────────────┐
//! │                                          │  CAMERA PREVIEW  │
//! │  ARTICLE (scrolled by the driver)        │  ── 35% ──       │
//! │                                          │  ── 65% ──       │
//! │                                          │  STATUS + GAUGE  │
//! │                                          │  SENSITIVITY     │
//! │                                          │  [error banner]  │
//! └──────────────────────────────────────────┴──────────────────┘
//! ```
//!
//! ## Simulation
//!
//! By default the camera is simulated: the mouse pointer over the camera
//! preview *is* the hand, and leaving the preview takes the hand out of
//! frame.  Frames go through the built-in blob classifier with an artificial
//! delay, so the control loop sees the same slow, occasionally failing
//! perception it would get from a hosted vision model.  Pass
//! `--classifier-cmd` to use an external vision helper instead.
//!
//! ### Keys
//!
//! | Key | Action |
//! |---|---|
//! | `Up` / `=` | Sensitivity + 1 |
//! | `Down` / `-` | Sensitivity − 1 |
//! | `C` | Disconnect / reconnect the camera |
//! | `Q` / `Escape` | Quit |

pub mod camera;
pub mod article;
pub mod visualizer;
pub mod app;
