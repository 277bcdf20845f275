//! Software-rendered window using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌─────────────────────────────────────────────┬───────────────┐
//! │  Article, scrolled by the animation driver  │ camera preview│
//! │                                             │  (zone lines) │
//! │                                             │ status label  │
//! │                                             │ pos / vel     │
//! │                                             │ sensitivity   │
//! │                                             │ error banner  │
//! │ scroll progress bar ▌                       │ key legend    │
//! └─────────────────────────────────────────────┴───────────────┘
//! ```

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use scroll_control::{Frame, PositionSample, Sensitivity, ZONE_BOTTOM, ZONE_TOP};

use crate::article::{Article, LineStyle};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:       usize = 1000;
pub const WIN_H:       usize = 620;
pub const ARTICLE_W:   usize = 700;
const PANEL_X:         usize = ARTICLE_W;
const PANEL_W:         usize = WIN_W - ARTICLE_W;
const MARGIN:          usize = 20;
const PREVIEW_X:       usize = PANEL_X + 30;
const PREVIEW_Y:       usize = 20;
const PREVIEW_W:       usize = 240;
const PREVIEW_H:       usize = 180;
const STATUS_Y:        usize = PREVIEW_Y + PREVIEW_H + 20;
const BAR_W:           usize = 6;

/// Body text is drawn at 2× the 3×5 glyphs: 8 px per character.
pub const TEXT_SCALE:  usize = 2;
pub const CHAR_ADV:    usize = 4 * TEXT_SCALE;
pub const LINE_H:      usize = 18;
pub const ARTICLE_COLUMNS: usize = (ARTICLE_W - 2 * MARGIN - BAR_W) / CHAR_ADV;

const BG_COLOR:        u32   = 0xFF111827;
const PANEL_BG:        u32   = 0xFF1F2937;
const TEXT_COLOR:      u32   = 0xFFD1D5DB;
const TITLE_COLOR:     u32   = 0xFFFFFFFF;
const HEADING_COLOR:   u32   = 0xFF818CF8;
const UP_COLOR:        u32   = 0xFF4ADE80;
const DOWN_COLOR:      u32   = 0xFF60A5FA;
const DIM_COLOR:       u32   = 0xFF6B7280;
const ERROR_BG:        u32   = 0xFF7F1D1D;
const ERROR_TEXT:      u32   = 0xFFFECACA;

// ════════════════════════════════════════════════════════════════════════════
// UiEvent — raw input from the window
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    /// Pointer entered, moved over, or left the camera preview.
    Hand(Option<f32>),
    /// Sensitivity nudge.
    Sensitivity(i32),
    ToggleCamera,
    Quit,
}

/// Map a window-space pointer to a hand position, if it is over the preview.
pub fn pointer_to_hand(x: f32, y: f32) -> Option<f32> {
    let inside_x = x >= PREVIEW_X as f32 && x < (PREVIEW_X + PREVIEW_W) as f32;
    let inside_y = y >= PREVIEW_Y as f32 && y < (PREVIEW_Y + PREVIEW_H) as f32;
    (inside_x && inside_y).then(|| (y - PREVIEW_Y as f32) / PREVIEW_H as f32 * 100.0)
}

// ════════════════════════════════════════════════════════════════════════════
// Hud — everything the side panel shows for one frame
// ════════════════════════════════════════════════════════════════════════════

pub struct Hud<'a> {
    pub preview:     Option<&'a Frame>,
    pub sample:      PositionSample,
    pub velocity:    f32,
    pub sensitivity: Sensitivity,
    pub processing:  bool,
    pub label:       &'a str,
    pub status:      &'a str,
    pub error:       Option<&'a str>,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:    Window,
    buf:       Vec<u32>,
    ui_tx:     Sender<UiEvent>,
    last_hand: Option<f32>,
}

impl Visualizer {
    pub fn new(ui_tx: Sender<UiEvent>) -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "Gesture Scroll",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            ui_tx,
            last_hand: None,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll pointer and keys and forward them as [`UiEvent`]s.
    /// Returns false when the window should close.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            let _ = self.ui_tx.send(UiEvent::Quit);
            return false;
        }
        if one_shot(Key::C) {
            let _ = self.ui_tx.send(UiEvent::ToggleCamera);
        }
        if held(Key::Up) || held(Key::Equal) {
            let _ = self.ui_tx.send(UiEvent::Sensitivity(1));
        }
        if held(Key::Down) || held(Key::Minus) {
            let _ = self.ui_tx.send(UiEvent::Sensitivity(-1));
        }

        let hand = self.window
            .get_mouse_pos(MouseMode::Discard)
            .and_then(|(x, y)| pointer_to_hand(x, y));
        if hand != self.last_hand {
            self.last_hand = hand;
            let _ = self.ui_tx.send(UiEvent::Hand(hand));
        }

        true
    }

    /// Render one frame.
    pub fn render(&mut self, article: &Article, offset: f32, progress: f32, hud: &Hud) {
        self.buf.fill(BG_COLOR);

        self.draw_article(article, offset);
        self.draw_progress(progress);

        self.fill_rect(PANEL_X, 0, PANEL_W, WIN_H, PANEL_BG);
        self.draw_preview(hud.preview, hud.sample);
        self.draw_status(hud);

        self.draw_label("UP/DOWN=SPEED  C=CAMERA", PANEL_X + 12, WIN_H - 40, DIM_COLOR, 1);
        self.draw_label("Q=QUIT", PANEL_X + 12, WIN_H - 28, DIM_COLOR, 1);

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Article ───────────────────────────────────────────────────────────

    fn draw_article(&mut self, article: &Article, offset: f32) {
        // Lines crossing the top or bottom edge are clipped, not dropped.
        for (y, line) in article.visible(offset, WIN_H) {
            match line.style {
                LineStyle::Title   => self.draw_text(&line.text, MARGIN, y, TITLE_COLOR, TEXT_SCALE * 2),
                LineStyle::Heading => self.draw_text(&line.text, MARGIN, y + 4, HEADING_COLOR, TEXT_SCALE),
                LineStyle::Body    => self.draw_text(&line.text, MARGIN, y + 4, TEXT_COLOR, TEXT_SCALE),
                LineStyle::Blank   => {}
            }
        }
    }

    fn draw_progress(&mut self, progress: f32) {
        let x = ARTICLE_W - BAR_W - 4;
        self.fill_rect(x, 0, BAR_W, WIN_H, 0xFF374151);
        let thumb_h = 40;
        let y = ((WIN_H - thumb_h) as f32 * progress.clamp(0.0, 1.0)) as usize;
        self.fill_rect(x, y, BAR_W, thumb_h, HEADING_COLOR);
    }

    // ── Camera preview ────────────────────────────────────────────────────

    fn draw_preview(&mut self, frame: Option<&Frame>, sample: PositionSample) {
        match frame {
            Some(f) if f.width > 0 && f.height > 0 => {
                for py in 0..PREVIEW_H {
                    let fy = (py as u32 * f.height / PREVIEW_H as u32).min(f.height - 1);
                    let band = band_tint(py as f32 / PREVIEW_H as f32 * 100.0);
                    for px in 0..PREVIEW_W {
                        let fx = (px as u32 * f.width / PREVIEW_W as u32).min(f.width - 1);
                        let l = f.luma(fx, fy).unwrap_or(0) as u32;
                        let gray = 0xFF000000 | (l << 16) | (l << 8) | l;
                        let c = match band {
                            Some(tint) => blend(gray, tint, 0.18),
                            None       => gray,
                        };
                        self.set_pixel(PREVIEW_X + px, PREVIEW_Y + py, c);
                    }
                }
            }
            _ => {
                self.fill_rect(PREVIEW_X, PREVIEW_Y, PREVIEW_W, PREVIEW_H, 0xFF000000);
                self.draw_label("NO SIGNAL", PREVIEW_X + 84, PREVIEW_Y + 84, DIM_COLOR, TEXT_SCALE);
            }
        }

        // Zone boundaries
        for pct in [ZONE_TOP, ZONE_BOTTOM] {
            let y = PREVIEW_Y + (pct / 100.0 * PREVIEW_H as f32) as usize;
            for x in (PREVIEW_X..PREVIEW_X + PREVIEW_W).step_by(4) {
                self.set_pixel(x,     y, 0xFF9CA3AF);
                self.set_pixel(x + 1, y, 0xFF9CA3AF);
            }
        }

        // Last classified position
        if sample.hand_present {
            let y = PREVIEW_Y + (sample.vertical_position / 100.0 * (PREVIEW_H - 1) as f32) as usize;
            self.fill_rect(PREVIEW_X, y, PREVIEW_W, 2, 0xFFFFFFFF);
            let pct = format!("{}%", sample.vertical_position.round() as i32);
            self.draw_label(&pct, PREVIEW_X + PREVIEW_W - 30, y.saturating_sub(8), 0xFFFFFFFF, 1);
        }

        self.draw_border(PREVIEW_X, PREVIEW_Y, PREVIEW_W, PREVIEW_H, 0xFF4B5563);
    }

    // ── Status panel ──────────────────────────────────────────────────────

    fn draw_status(&mut self, hud: &Hud) {
        let x = PANEL_X + 30;
        let mut y = STATUS_Y;

        let label_color = if !hud.sample.hand_present {
            DIM_COLOR
        } else if hud.velocity < 0.0 {
            UP_COLOR
        } else if hud.velocity > 0.0 {
            DOWN_COLOR
        } else {
            TITLE_COLOR
        };
        self.draw_label(hud.label, x, y, label_color, TEXT_SCALE);

        // Processing indicator
        let dot = if hud.processing { UP_COLOR } else { 0xFF4B5563 };
        self.fill_rect(PREVIEW_X + PREVIEW_W - 8, y, 8, 8, dot);
        y += 24;

        let pos = if hud.sample.hand_present {
            format!("POS {:5.1}%", hud.sample.vertical_position)
        } else {
            "POS   -".to_string()
        };
        self.draw_label(&pos, x, y, TEXT_COLOR, TEXT_SCALE);
        y += 18;
        self.draw_label(&format!("VEL {:+5.1} PX/F", hud.velocity), x, y, TEXT_COLOR, TEXT_SCALE);
        y += 30;

        // Sensitivity slider
        self.draw_label("SENSITIVITY", x, y, DIM_COLOR, TEXT_SCALE);
        y += 16;
        let span = (Sensitivity::MAX - Sensitivity::MIN) as f32;
        let t = (hud.sensitivity.get() - Sensitivity::MIN) as f32 / span;
        self.fill_rect(x, y + 3, 180, 4, 0xFF374151);
        self.fill_rect(x, y + 3, (180.0 * t) as usize, 4, HEADING_COLOR);
        self.fill_rect(x + (176.0 * t) as usize, y, 6, 10, TITLE_COLOR);
        self.draw_label(&hud.sensitivity.get().to_string(), x + 196, y, HEADING_COLOR, TEXT_SCALE);
        y += 28;

        self.draw_label(hud.status, x, y, DIM_COLOR, 1);
        y += 20;

        if let Some(err) = hud.error {
            self.fill_rect(PANEL_X + 12, y, PANEL_W - 24, 44, ERROR_BG);
            self.draw_label("ERROR:", PANEL_X + 20, y + 8, ERROR_TEXT, 1);
            self.draw_label(err, PANEL_X + 48, y + 8, ERROR_TEXT, 1);
            self.draw_label("CHECK CAMERA PERMISSIONS", PANEL_X + 20, y + 24, ERROR_TEXT, 1);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(WIN_W) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y+h).min(WIN_H) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32, scale: usize) {
        self.draw_text(text, x, y as isize, color, scale);
    }

    /// 3×5 bitmap font scaled by `scale`; `y` may lie above the window.
    fn draw_text(&mut self, text: &str, x: usize, y: isize, color: u32, scale: usize) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        let top = y + (row * scale) as isize;
                        if let Some((py, h)) = clip_rows(top, scale) {
                            self.fill_rect(cx + col * scale, py, scale, h, color);
                        }
                    }
                }
            }
            cx += 4 * scale;
            if cx + 4 * scale > WIN_W { break; }
        }
    }
}

/// Visible part of `h` rows starting at `top`, as (first row, height).
fn clip_rows(top: isize, h: usize) -> Option<(usize, usize)> {
    let bottom = (top + h as isize).min(WIN_H as isize);
    let top = top.max(0);
    (bottom > top).then(|| (top as usize, (bottom - top) as usize))
}

/// Faint color for the up/down bands of the preview.
fn band_tint(pct: f32) -> Option<u32> {
    if pct < ZONE_TOP {
        Some(UP_COLOR)
    } else if pct > ZONE_BOTTOM {
        Some(DOWN_COLOR)
    } else {
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        ';' => [0b000, 0b010, 0b000, 0b010, 0b100],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b011, 0b000, 0b010],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}
