//! Still frames and the camera-side abstraction that produces them.

use thiserror::Error;

/// Pixel layout of a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// One luminance byte per pixel, row-major.
    Gray8,
}

impl PixelFormat {
    pub fn channels(self) -> u32 {
        match self {
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A single snapshot from the camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width:  u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data:   Vec<u8>,
}

impl Frame {
    /// Default snapshot size; small enough to keep classification cheap.
    pub const DEFAULT_WIDTH:  u32 = 320;
    pub const DEFAULT_HEIGHT: u32 = 240;

    /// A frame filled with a single luminance value.
    pub fn filled(width: u32, height: u32, luma: u8) -> Self {
        Frame {
            width,
            height,
            format: PixelFormat::Gray8,
            data: vec![luma; (width * height) as usize],
        }
    }

    pub fn luma(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height { return None; }
        self.data.get((y * self.width + x) as usize).copied()
    }

    /// Paint a filled disc, clipped to the frame.
    pub fn fill_disc(&mut self, cx: f32, cy: f32, radius: f32, luma: u8) {
        let r2 = radius * radius;
        let y0 = (cy - radius).floor().max(0.0) as u32;
        let y1 = ((cy + radius).ceil().max(0.0) as u32).min(self.height);
        let x0 = (cx - radius).floor().max(0.0) as u32;
        let x1 = ((cx + radius).ceil().max(0.0) as u32).min(self.width);
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.data[(y * self.width + x) as usize] = luma;
                }
            }
        }
    }

    /// `true` when the buffer length matches the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == (self.width * self.height * self.format.channels()) as usize
    }
}

/// Why the camera could not be opened or was lost.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device found")]
    NoDevice,

    #[error("camera disconnected")]
    Disconnected,
}

/// Anything that can hand out a still frame on demand.
///
/// Returns `None` when there is no active capture session; the caller skips
/// that sampling tick without side effects.
pub trait FrameSource: Send + 'static {
    fn capture_frame(&mut self) -> Option<Frame>;
}

impl<F: FnMut() -> Option<Frame> + Send + 'static> FrameSource for F {
    fn capture_frame(&mut self) -> Option<Frame> { self() }
}
