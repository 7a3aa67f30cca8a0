//! Exit/enter animation state machine.
//!
//! Successive [`DisplayState`]s are turned into a deterministic sequence of
//! frames. Any visible change (new primary, new tier, error, recovery) runs
//! a full slide-out of the old content followed by a slide-in of the new
//! one. Transitions are not interruptible: a state that arrives mid-flight
//! waits in a single pending slot until the display is idle again.
//!
//! Stepping is driven by the caller, one frame per [`Animator::step`], so
//! the machine runs identically with or without real time passing.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::{debug, trace};

use super::render::{Frame, Point, Region, RenderCommand, Rgb, TierPalette};
use super::select::DisplayState;
use crate::domain::UrgencyTier;

const MARGIN_X: i32 = 1;
const HEADER_Y: i32 = 2;
const ETA_Y: i32 = 12;
const FOOTER_Y: i32 = 25;
const ERROR_POS: Point = Point::new(10, 12);
const ERROR_TEXT: &str = "NO DATA";

/// Animation and layout parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationConfig {
    /// Steps in the exit phase.
    pub exit_steps: u16,
    /// Steps in the enter phase.
    pub enter_steps: u16,
    /// Wall-clock pacing between steps when running live.
    pub frame_interval: Duration,
    /// Matrix width in pixels.
    pub width: u32,
    /// Matrix height in pixels.
    pub height: u32,
    /// Horizontal advance per glyph in pixels.
    pub glyph_advance: u32,
    pub palette: TierPalette,
    /// Offset applied to the clock and update-time rows.
    pub clock_offset: FixedOffset,
}

impl AnimationConfig {
    /// Total frames of one full transition.
    pub fn transition_steps(&self) -> u32 {
        u32::from(self.exit_steps) + u32::from(self.enter_steps)
    }

    /// Wall-clock length of one full transition.
    pub fn transition_duration(&self) -> Duration {
        self.frame_interval * self.transition_steps()
    }

    fn max_glyphs(&self) -> usize {
        let usable = self.width.saturating_sub(MARGIN_X as u32);
        (usable / self.glyph_advance.max(1)) as usize
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            exit_steps: 12,
            enter_steps: 12,
            frame_interval: Duration::from_millis(40),
            width: 64,
            height: 32,
            glyph_advance: 6,
            palette: TierPalette::default(),
            clock_offset: Utc.fix(),
        }
    }
}

/// Animation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Static display, no transition running.
    Idle,
    /// Previous content sliding out.
    ExitingOld,
    /// New content sliding in.
    EnteringNew,
}

/// The animation record: phase, the states on either side of the
/// transition, and steps completed in the current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationState {
    pub phase: Phase,
    pub exiting: Option<DisplayState>,
    pub entering: Option<DisplayState>,
    pub progress: u16,
}

impl AnimationState {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            exiting: None,
            entering: None,
            progress: 0,
        }
    }
}

/// What happened to a submitted display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// First state ever; shown directly.
    Initial,
    /// Same content as shown; nothing to do.
    Unchanged,
    /// Not a visible change; the idle frame is redrawn in place.
    Redraw,
    /// A transition to this state has started.
    TransitionStarted,
    /// A transition is running; the state waits until it ends.
    Queued,
}

/// Single-owner animation state machine.
#[derive(Debug, Clone)]
pub struct Animator {
    config: AnimationConfig,
    state: AnimationState,
    /// Settled state on screen while idle.
    shown: Option<DisplayState>,
    pending: Option<DisplayState>,
    /// Idle frame needs drawing.
    dirty: bool,
}

impl Animator {
    pub fn new(mut config: AnimationConfig) -> Self {
        config.exit_steps = config.exit_steps.max(1);
        config.enter_steps = config.enter_steps.max(1);
        Self {
            config,
            state: AnimationState::idle(),
            shown: None,
            pending: None,
            dirty: false,
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.phase != Phase::Idle
    }

    /// The settled state, when idle.
    pub fn shown(&self) -> Option<&DisplayState> {
        self.shown.as_ref()
    }

    pub fn pending(&self) -> Option<&DisplayState> {
        self.pending.as_ref()
    }

    /// Whether a call to [`Animator::step`] would produce a frame.
    pub fn has_work(&self) -> bool {
        self.is_transitioning() || self.dirty
    }

    /// Offer a new display state.
    pub fn submit(&mut self, incoming: DisplayState) -> Submission {
        if self.is_transitioning() {
            trace!(sequence = incoming.sequence(), "queued behind running transition");
            self.pending = Some(incoming);
            return Submission::Queued;
        }
        self.accept(incoming)
    }

    fn accept(&mut self, incoming: DisplayState) -> Submission {
        let (changed, same) = match &self.shown {
            None => {
                self.shown = Some(incoming);
                self.dirty = true;
                return Submission::Initial;
            }
            Some(shown) => (incoming.is_change_from(shown), *shown == incoming),
        };

        if changed {
            debug!(
                from = ?self.shown.as_ref().map(DisplayState::sequence),
                to = incoming.sequence(),
                tier = ?incoming.tier(),
                error = incoming.is_error(),
                "starting transition"
            );
            self.state = AnimationState {
                phase: Phase::ExitingOld,
                exiting: self.shown.take(),
                entering: Some(incoming),
                progress: 0,
            };
            self.dirty = false;
            return Submission::TransitionStarted;
        }

        if same {
            return Submission::Unchanged;
        }

        self.shown = Some(incoming);
        self.dirty = true;
        Submission::Redraw
    }

    /// Advance one step, returning the frame to present, if any.
    pub fn step(&mut self) -> Option<Frame> {
        let width = self.config.width as i32;

        match self.state.phase {
            Phase::Idle => {
                if !self.dirty {
                    return None;
                }
                self.dirty = false;
                self.shown.as_ref().map(|s| self.render(s, 0))
            }
            Phase::ExitingOld => {
                self.state.progress += 1;
                let steps = self.config.exit_steps;
                let offset = -scaled(width, self.state.progress, steps);
                let frame = self.render_optional(self.state.exiting.as_ref(), offset);

                if self.state.progress >= steps {
                    self.state.phase = Phase::EnteringNew;
                    self.state.progress = 0;
                }
                Some(frame)
            }
            Phase::EnteringNew => {
                self.state.progress += 1;
                let steps = self.config.enter_steps;
                let offset = width - scaled(width, self.state.progress, steps);
                let frame = self.render_optional(self.state.entering.as_ref(), offset);

                if self.state.progress >= steps {
                    self.finish_transition();
                }
                Some(frame)
            }
        }
    }

    fn finish_transition(&mut self) {
        let entering = self.state.entering.take();
        self.state = AnimationState::idle();
        self.shown = entering;

        if let Some(pending) = self.pending.take() {
            self.accept(pending);
        }
    }

    fn render_optional(&self, state: Option<&DisplayState>, offset: i32) -> Frame {
        match state {
            Some(state) => self.render(state, offset),
            None => self.frame(Vec::new()),
        }
    }

    /// Render `state` shifted horizontally by `offset` pixels.
    ///
    /// An arrival frame has three rows: line and destination; the ETA with
    /// the following arrivals right-aligned after it; and the update time,
    /// followed by the clock on displays wide enough to hold both.
    fn render(&self, state: &DisplayState, offset: i32) -> Frame {
        let palette = &self.config.palette;
        let width = self.config.width as i32;
        let mut runs = Vec::new();

        match state.primary() {
            None => runs.push(text_run(ERROR_TEXT, ERROR_POS, offset, palette.error)),
            Some(primary) => {
                let color = palette.tier_color(primary.tier);
                let event = &primary.event;
                let header = self.fit(&format!("{} {}", event.line(), event.destination()));
                runs.push(text_run(&header, Point::new(MARGIN_X, HEADER_Y), offset, color));

                let eta = if primary.tier == UrgencyTier::Now {
                    "NOW".to_string()
                } else {
                    format!("{} MIN", event.minutes_until(state.as_of()))
                };
                runs.push(text_run(&eta, Point::new(MARGIN_X, ETA_Y), offset, color));

                let eta_end = MARGIN_X + self.span(&eta);
                if let Some(following) = self.following(state, eta_end) {
                    let at = Point::new(width - self.span(&following), ETA_Y);
                    runs.push(text_run(&following, at, offset, palette.secondary));
                }

                let updated = format!("UPD {}", self.clock_text(state.updated_at()));
                let at = Point::new(MARGIN_X, FOOTER_Y);
                runs.push(text_run(&updated, at, offset, palette.secondary));

                let clock = self.clock_text(state.as_of());
                let clock_x = width - self.span(&clock);
                if at.x + self.span(&updated) + self.advance() <= clock_x {
                    let at = Point::new(clock_x, FOOTER_Y);
                    runs.push(text_run(&clock, at, offset, palette.clock));
                }
            }
        }

        self.frame(runs)
    }

    /// Minutes to the following arrivals, as many as fit after `start`
    /// with a one-glyph gap.
    fn following(&self, state: &DisplayState, start: i32) -> Option<String> {
        let room = self.config.width as i32 - start - self.advance();
        let mut text = String::new();

        for event in state.upcoming() {
            let minutes = event.minutes_until(state.as_of());
            let next = if text.is_empty() {
                minutes.to_string()
            } else {
                format!("{text},{minutes}")
            };
            if self.span(&next) > room {
                break;
            }
            text = next;
        }

        (!text.is_empty()).then_some(text)
    }

    fn clock_text(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.config.clock_offset)
            .format("%H:%M")
            .to_string()
    }

    fn advance(&self) -> i32 {
        self.config.glyph_advance.max(1) as i32
    }

    /// Width in pixels of `text` on one row.
    fn span(&self, text: &str) -> i32 {
        text.chars().count() as i32 * self.advance()
    }

    fn frame(&self, runs: Vec<RenderCommand>) -> Frame {
        let mut frame = Vec::with_capacity(runs.len() + 2);
        frame.push(RenderCommand::ClearRegion(Region::full(
            self.config.width,
            self.config.height,
        )));
        frame.extend(runs);
        frame.push(RenderCommand::PresentFrame);
        frame
    }

    /// Upper-case and truncate to what fits on one row.
    fn fit(&self, text: &str) -> String {
        text.to_uppercase()
            .chars()
            .take(self.config.max_glyphs())
            .collect::<String>()
            .trim_end()
            .to_string()
    }
}

fn scaled(width: i32, progress: u16, steps: u16) -> i32 {
    width * i32::from(progress) / i32::from(steps)
}

fn text_run(content: &str, at: Point, offset: i32, color: Rgb) -> RenderCommand {
    RenderCommand::DrawText {
        content: content.to_string(),
        position: Point::new(at.x + offset, at.y),
        color,
    }
}
