//! Render command vocabulary and pixel sinks.
//!
//! The display engine never touches pixels or fonts. It emits frames of
//! [`RenderCommand`]s and a [`PixelSink`] turns them into light.

use std::fmt;

use tracing::{debug, trace};

use crate::domain::UrgencyTier;

/// 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const ORANGE: Rgb = Rgb::new(255, 128, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GRAY: Rgb = Rgb::new(100, 100, 100);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Colors used by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPalette {
    pub now: Rgb,
    pub imminent: Rgb,
    pub soon: Rgb,
    pub later: Rgb,
    /// The "no data" visual.
    pub error: Rgb,
    /// Supporting text (following arrivals, update time).
    pub secondary: Rgb,
    pub clock: Rgb,
}

impl TierPalette {
    /// Color for an arrival in `tier`.
    pub fn tier_color(&self, tier: UrgencyTier) -> Rgb {
        match tier {
            UrgencyTier::Now => self.now,
            UrgencyTier::Imminent => self.imminent,
            UrgencyTier::Soon => self.soon,
            UrgencyTier::Later => self.later,
        }
    }
}

impl Default for TierPalette {
    fn default() -> Self {
        Self {
            now: Rgb::RED,
            imminent: Rgb::RED,
            soon: Rgb::ORANGE,
            later: Rgb::GREEN,
            error: Rgb::WHITE,
            secondary: Rgb::GRAY,
            clock: Rgb::YELLOW,
        }
    }
}

/// Pixel position of the top-left corner of a glyph run.
///
/// Signed so that text can sit partly off-screen mid-transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Rectangular area of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub origin: Point,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// The whole matrix.
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            origin: Point::new(0, 0),
            width,
            height,
        }
    }
}

/// One instruction to the pixel sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCommand {
    ClearRegion(Region),
    DrawText {
        content: String,
        position: Point,
        color: Rgb,
    },
    PresentFrame,
}

/// Complete command sequence for one animation step.
pub type Frame = Vec<RenderCommand>;

/// A pixel sink failed to accept a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("pixel sink error: {0}")]
pub struct SinkError(pub String);

/// Destination for rendered frames.
///
/// Implementations receive only fully formed frames; they never see the
/// display or animation state.
pub trait PixelSink {
    fn render(&mut self, frame: &[RenderCommand]) -> Result<(), SinkError>;
}

/// Sink that keeps every frame it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    frames: Vec<Frame>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Drain recorded frames.
    pub fn take(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.frames)
    }
}

impl PixelSink for RecordingSink {
    fn render(&mut self, frame: &[RenderCommand]) -> Result<(), SinkError> {
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

/// Sink that logs frames instead of driving hardware.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    presented: u64,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl PixelSink for TracingSink {
    fn render(&mut self, frame: &[RenderCommand]) -> Result<(), SinkError> {
        for command in frame {
            match command {
                RenderCommand::ClearRegion(region) => trace!(?region, "clear"),
                RenderCommand::DrawText {
                    content,
                    position,
                    color,
                } => trace!(%content, x = position.x, y = position.y, %color, "draw"),
                RenderCommand::PresentFrame => {
                    self.presented += 1;
                    debug!(frame = self.presented, texts = ?frame_texts(frame), "present");
                }
            }
        }
        Ok(())
    }
}

/// Text runs drawn in a frame, in order.
pub fn frame_texts(frame: &[RenderCommand]) -> Vec<&str> {
    frame
        .iter()
        .filter_map(|command| match command {
            RenderCommand::DrawText { content, .. } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_matches_tiers() {
        let palette = TierPalette::default();

        assert_eq!(palette.tier_color(UrgencyTier::Now), Rgb::RED);
        assert_eq!(palette.tier_color(UrgencyTier::Imminent), Rgb::RED);
        assert_eq!(palette.tier_color(UrgencyTier::Soon), Rgb::ORANGE);
        assert_eq!(palette.tier_color(UrgencyTier::Later), Rgb::GREEN);

        for tier in UrgencyTier::ALL {
            assert_ne!(palette.tier_color(tier), palette.error);
        }
    }

    #[test]
    fn rgb_display() {
        assert_eq!(Rgb::ORANGE.to_string(), "#ff8000");
    }

    #[test]
    fn recording_sink_keeps_frames() {
        let mut sink = RecordingSink::new();
        let frame = vec![
            RenderCommand::ClearRegion(Region::full(64, 32)),
            RenderCommand::DrawText {
                content: "NO DATA".into(),
                position: Point::new(10, 12),
                color: Rgb::WHITE,
            },
            RenderCommand::PresentFrame,
        ];

        sink.render(&frame).unwrap();

        assert_eq!(sink.frames().len(), 1);
        assert_eq!(frame_texts(sink.last_frame().unwrap()), vec!["NO DATA"]);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn tracing_sink_counts_presents() {
        let mut sink = TracingSink::new();
        sink.render(&[RenderCommand::PresentFrame]).unwrap();
        sink.render(&[RenderCommand::ClearRegion(Region::full(64, 32))])
            .unwrap();
        assert_eq!(sink.presented(), 1);
    }
}
