//! Simulated webcam.
//!
//! The window forwards the pointer position over the camera preview through a
//! [`HandFeed`]; the [`SimCamera`] on the sampling thread drains it and paints
//! a bright "hand" disc into a dark 320×240 frame at that height.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use scroll_control::{CaptureError, Frame, FrameSource};

const BACKGROUND: u8 = 28;
const HAND_LUMA:  u8 = 235;
const HAND_RADIUS: f32 = 22.0;

/// Render the frame a camera would see with the hand at `hand` percent of the
/// frame height, or an empty scene for `None`.
pub fn synth_frame(hand: Option<f32>) -> Frame {
    let mut frame = Frame::filled(Frame::DEFAULT_WIDTH, Frame::DEFAULT_HEIGHT, BACKGROUND);
    if let Some(pct) = hand {
        let h = frame.height as f32;
        let cy = (pct.clamp(0.0, 100.0) / 100.0) * (h - 1.0) + 0.5;
        let cx = frame.width as f32 / 2.0;
        frame.fill_disc(cx, cy, HAND_RADIUS, HAND_LUMA);
    }
    frame
}

// ════════════════════════════════════════════════════════════════════════════
// HandFeed — window side
// ════════════════════════════════════════════════════════════════════════════

/// Sends pointer updates to the camera.  Dropping it ends the capture
/// session.
pub struct HandFeed {
    tx: Sender<Option<f32>>,
}

impl HandFeed {
    /// Returns `false` once the camera is gone.
    pub fn send(&self, hand: Option<f32>) -> bool {
        self.tx.send(hand).is_ok()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimCamera — sampling side
// ════════════════════════════════════════════════════════════════════════════

pub struct SimCamera {
    rx:     Receiver<Option<f32>>,
    hand:   Option<f32>,
    active: bool,
}

impl SimCamera {
    /// Open the simulated device.  `available = false` behaves like a user
    /// who declined the camera permission prompt.
    pub fn open(available: bool) -> Result<(SimCamera, HandFeed), CaptureError> {
        if !available {
            return Err(CaptureError::PermissionDenied);
        }
        let (tx, rx) = mpsc::channel();
        log::info!("simulated camera opened ({}x{})", Frame::DEFAULT_WIDTH, Frame::DEFAULT_HEIGHT);
        Ok((SimCamera { rx, hand: None, active: true }, HandFeed { tx }))
    }

    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(h) => self.hand = h,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.active {
                        log::info!("simulated camera session ended");
                    }
                    self.active = false;
                    break;
                }
            }
        }
    }
}

impl FrameSource for SimCamera {
    fn capture_frame(&mut self) -> Option<Frame> {
        self.drain();
        self.active.then(|| synth_frame(self.hand))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scroll_control::{BlobClassifier, GestureClassifier};

    #[test]
    fn denied_permission_is_an_error() {
        assert!(matches!(SimCamera::open(false), Err(CaptureError::PermissionDenied)));
    }

    #[test]
    fn latest_pointer_wins() {
        let (mut cam, feed) = SimCamera::open(true).unwrap();
        feed.send(Some(10.0));
        feed.send(None);
        feed.send(Some(90.0));
        let obs = BlobClassifier::default().classify(&cam.capture_frame().unwrap()).unwrap();
        assert!(obs.hand_present);
        assert!((obs.vertical_position - 90.0).abs() < 2.0, "got {}", obs.vertical_position);
    }

    #[test]
    fn empty_scene_has_no_hand() {
        let obs = BlobClassifier::default().classify(&synth_frame(None)).unwrap();
        assert!(!obs.hand_present);
    }

    #[test]
    fn dropped_feed_ends_session() {
        let (mut cam, feed) = SimCamera::open(true).unwrap();
        assert!(cam.capture_frame().is_some());
        drop(feed);
        assert!(cam.capture_frame().is_none());
    }

    #[test]
    fn synth_frame_tracks_pointer_across_range() {
        let c = BlobClassifier::default();
        for pct in [20.0_f32, 50.0, 80.0] {
            let obs = c.classify(&synth_frame(Some(pct))).unwrap();
            assert!((obs.vertical_position - pct).abs() < 2.0, "{} → {}", pct, obs.vertical_position);
        }
    }
}
