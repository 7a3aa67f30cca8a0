//! Display engine: primary selection, animation, and render output.

mod animation;
mod render;
mod select;

pub use animation::{AnimationConfig, AnimationState, Animator, Phase, Submission};
pub use render::{
    Frame, PixelSink, Point, RecordingSink, Region, RenderCommand, Rgb, SinkError, TierPalette,
    TracingSink, frame_texts,
};
pub use select::{DisplayState, PrimaryArrival, PrimarySelector};
