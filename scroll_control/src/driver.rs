//! Per-frame application of the current velocity to a viewport.

/// Velocities at or below this magnitude are not applied, so a near-zero
/// velocity does not jitter the page by sub-pixel amounts forever.
pub const JITTER_EPSILON: f32 = 0.5;

/// Something with a vertical scroll offset that accepts relative nudges.
pub trait Viewport {
    fn scroll_by(&mut self, delta: f32);
    fn offset(&self) -> f32;
}

// ════════════════════════════════════════════════════════════════════════════
// AnimationDriver
// ════════════════════════════════════════════════════════════════════════════

/// Reapplies the most recent velocity once per display frame.
///
/// Frame-rate driven: each call moves the viewport by exactly `velocity`
/// units, with no timestep scaling.
#[derive(Clone, Debug, Default)]
pub struct AnimationDriver {
    frames:  u64,
    applied: u64,
}

impl AnimationDriver {
    pub fn new() -> Self { Self::default() }

    /// Advance one frame.  Returns `true` if the viewport was moved.
    pub fn tick<V: Viewport + ?Sized>(&mut self, velocity: f32, viewport: &mut V) -> bool {
        self.frames += 1;
        if velocity.abs() > JITTER_EPSILON {
            viewport.scroll_by(velocity);
            self.applied += 1;
            true
        } else {
            false
        }
    }

    pub fn frames(&self)  -> u64 { self.frames }
    pub fn applied(&self) -> u64 { self.applied }
}

// ════════════════════════════════════════════════════════════════════════════
// PageViewport
// ════════════════════════════════════════════════════════════════════════════

/// A window of `view_height` over content `content_height` tall.  The offset
/// stays within `[0, content_height - view_height]`.
#[derive(Clone, Debug, PartialEq)]
pub struct PageViewport {
    offset:         f32,
    content_height: f32,
    view_height:    f32,
}

impl PageViewport {
    pub fn new(content_height: f32, view_height: f32) -> Self {
        PageViewport { offset: 0.0, content_height, view_height }
    }

    pub fn max_offset(&self) -> f32 {
        (self.content_height - self.view_height).max(0.0)
    }

    pub fn view_height(&self) -> f32 { self.view_height }
    pub fn content_height(&self) -> f32 { self.content_height }

    /// Fraction scrolled, 0.0 at the top and 1.0 at the bottom.
    pub fn progress(&self) -> f32 {
        let max = self.max_offset();
        if max == 0.0 { 0.0 } else { self.offset / max }
    }
}

impl Viewport for PageViewport {
    fn scroll_by(&mut self, delta: f32) {
        self.offset = (self.offset + delta).clamp(0.0, self.max_offset());
    }

    fn offset(&self) -> f32 { self.offset }
}
