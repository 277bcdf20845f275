//! The page being scrolled: a long article laid out into fixed-height lines.

/// One block of the article before layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Block {
    Title(&'static str),
    Heading(&'static str),
    Body(&'static str),
}

/// Visual role of a laid-out line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Body,
    Blank,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub text:  String,
    pub style: LineStyle,
}

/// The article after word-wrapping to a column width.
#[derive(Clone, Debug)]
pub struct Article {
    pub lines:       Vec<Line>,
    pub line_height: usize,
}

impl Article {
    /// Lay out `blocks` at `columns` characters per line.
    pub fn layout(blocks: &[Block], columns: usize, line_height: usize) -> Self {
        let mut lines = Vec::new();
        for block in blocks {
            let (text, style) = match *block {
                Block::Title(t)   => (t, LineStyle::Title),
                Block::Heading(t) => (t, LineStyle::Heading),
                Block::Body(t)    => (t, LineStyle::Body),
            };
            let width = if style == LineStyle::Title { columns / 2 } else { columns };
            for row in wrap(text, width.max(1)) {
                lines.push(Line { text: row, style });
            }
            lines.push(Line { text: String::new(), style: LineStyle::Blank });
        }
        Article { lines, line_height }
    }

    pub fn demo(columns: usize, line_height: usize) -> Self {
        Self::layout(DEMO_ARTICLE, columns, line_height)
    }

    pub fn height(&self) -> usize { self.lines.len() * self.line_height }

    /// Lines intersecting `[offset, offset + view)` with their y relative to
    /// the top of the view (may be negative for a partially visible line).
    pub fn visible(&self, offset: f32, view: usize) -> impl Iterator<Item = (isize, &Line)> {
        let lh = self.line_height.max(1);
        let first = (offset.max(0.0) as usize) / lh;
        let last = (offset.max(0.0) as usize + view) / lh + 1;
        let top = offset as isize;
        self.lines.iter()
            .enumerate()
            .skip(first)
            .take(last.saturating_sub(first))
            .map(move |(i, line)| ((i * lh) as isize - top, line))
    }
}

/// Greedy word wrap by character count; words longer than `width` are split.
/// A zero `width` is treated as one.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let split = word.char_indices().nth(width).map_or(word.len(), |(i, _)| i);
            out.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() { continue; }
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() { out.push(current); }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Demo content
// ────────────────────────────────────────────────────────────────────────────

pub const DEMO_ARTICLE: &[Block] = &[
    Block::Title("Reading Without Touching"),
    Block::Body("Hands-free scrolling demo. Raise your hand to scroll up, lower it to scroll down, keep it level to stay put."),
    Block::Heading("Why gestures"),
    Block::Body("Keyboards and mice ask the reader to find a device, reach for it, and aim. A raised palm needs none of that. When the content is long and the reader's hands are busy or dirty or far from the desk, a coarse gesture that means go up or go down is often all the control that is wanted."),
    Block::Body("Coarse is the key word. A camera sampled a couple of times per second cannot track a finger with precision, and a vision model answering over the network is slower still. The interface has to be designed around that latency instead of pretending it is not there."),
    Block::Heading("Three bands"),
    Block::Body("The camera frame is split into three horizontal bands. The top third, down to thirty five percent of the frame height, scrolls the page up. The bottom band, from sixty five percent to the lower edge, scrolls it down. Between them lies a generous neutral band where the page holds still."),
    Block::Body("Inside a scrolling band the speed ramps linearly: zero at the band boundary, full speed at the edge of the frame. Full speed is the sensitivity setting, measured in pixels per display frame, adjustable from five to thirty."),
    Block::Body("Because the neutral band is wide, small tremors of a resting hand never start the page moving. No separate hysteresis state is needed; the mapping is recomputed from scratch for every new observation."),
    Block::Heading("Slow eyes, smooth motion"),
    Block::Body("Perception and motion run on separate clocks. The sampling loop captures and classifies a frame every six hundred milliseconds, and never has more than one classification outstanding: a tick that finds the previous request still pending is simply dropped."),
    Block::Body("Motion runs at the display rate. Every frame the animation driver reads the latest velocity and nudges the page by that amount, so the page glides continuously between observations instead of lurching each time a new one arrives. Velocities under half a pixel are ignored to avoid endless sub-pixel creep."),
    Block::Heading("When perception fails"),
    Block::Body("Networks drop requests and models return nonsense. A failed or malformed classification is logged and otherwise ignored: the last good observation stays in force and the next tick tries again. A request that takes too long is abandoned, so one hung call cannot freeze the loop."),
    Block::Body("Losing the camera itself is different. Without frames there is nothing to classify, so sampling stops and a message explains why. Reconnect the camera and sampling resumes where it left off."),
    Block::Heading("Trying it"),
    Block::Body("Move the pointer over the camera preview on the right. The pointer stands in for your hand: near the top of the preview the article scrolls up, near the bottom it scrolls down, in the middle it holds. Move the pointer off the preview and the hand leaves the frame."),
    Block::Body("Use the arrow keys to change sensitivity and watch the speed change on the very next frame. Press C to unplug the simulated camera and again to plug it back in."),
    Block::Heading("Beyond scrolling"),
    Block::Body("The same loop shape fits any control driven by slow, noisy perception: a position sampled occasionally, mapped through dead bands and ramps to a rate, and integrated smoothly at display speed. Volume knobs, map panning and presentation slides all fit the pattern."),
    Block::Body("End of article. Raise your hand to head back to the top."),
];
