//! Cycle scheduler.
//!
//! One cooperative loop owns everything: each poll tick pulls a payload,
//! parses it, selects the primary arrival and hands the result to the
//! animator; each frame tick advances a running transition by one step.
//! Nothing here is shared, so no locks are needed.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::DisplayConfig;
use crate::display::{Animator, DisplayState, PixelSink, PrimarySelector, Submission};
use crate::domain::{Snapshot, SnapshotError, UrgencyTier};
use crate::feed::{FeedError, FeedSource, parse_snapshot};

/// Which instant urgency is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceClock {
    /// Wall-clock time at the moment of the cycle.
    Wall,
    /// The snapshot's own capture instant, for deterministic replay.
    Recorded,
}

impl ReferenceClock {
    /// The instant `snapshot` should be classified against.
    pub fn reference_for(&self, snapshot: &Snapshot) -> DateTime<Utc> {
        match self {
            ReferenceClock::Wall => Utc::now(),
            ReferenceClock::Recorded => snapshot.captured_at(),
        }
    }
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Replay index of the payload, for recorded sources.
    pub entry: Option<usize>,
    pub snapshot_error: Option<SnapshotError>,
    pub events: usize,
    pub dropped: usize,
    pub sequence: u64,
    pub tier: Option<UrgencyTier>,
    pub submission: Submission,
}

/// Drives a feed source through parsing, selection and animation.
pub struct Scheduler<S, K> {
    source: S,
    sink: K,
    selector: PrimarySelector,
    animator: Animator,
    clock: ReferenceClock,
    poll_interval: Duration,
    fetch_timeout: Duration,
    last_state: Option<DisplayState>,
    cycles: u64,
}

impl<S: FeedSource, K: PixelSink> Scheduler<S, K> {
    /// Create a scheduler from resolved configuration.
    ///
    /// Live mode measures urgency against the wall clock; replay mode
    /// against each snapshot's recorded capture instant.
    pub fn new(source: S, sink: K, config: &DisplayConfig) -> Self {
        let clock = if config.mode.is_live() {
            ReferenceClock::Wall
        } else {
            ReferenceClock::Recorded
        };

        Self {
            source,
            sink,
            selector: config.selector(),
            animator: Animator::new(config.animation.clone()),
            clock,
            poll_interval: config.poll_interval,
            fetch_timeout: config.fetch_timeout(),
            last_state: None,
            cycles: 0,
        }
    }

    /// Override the reference clock.
    pub fn with_clock(mut self, clock: ReferenceClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Most recent display state produced by the selector.
    pub fn last_state(&self) -> Option<&DisplayState> {
        self.last_state.as_ref()
    }

    /// Number of completed poll cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one poll cycle.
    ///
    /// Never fails: fetch errors and bad payloads become erroneous
    /// snapshots and flow through to the error visual. If the display is
    /// idle afterwards, any in-place redraw is rendered immediately.
    pub async fn cycle(&mut self) -> CycleReport {
        let (snapshot, entry) = self.acquire().await;

        let now = self.clock.reference_for(&snapshot);

        let state = self.selector.select(&snapshot, self.last_state.as_ref(), now);

        let previous_sequence = self.last_state.as_ref().map(DisplayState::sequence);
        if previous_sequence != Some(state.sequence()) {
            match state.primary() {
                Some(primary) => info!(
                    sequence = state.sequence(),
                    arrival = %primary.event.key(),
                    tier = %primary.tier,
                    "primary arrival changed"
                ),
                None => info!(
                    sequence = state.sequence(),
                    fault = ?state.fault(),
                    "no arrival to display"
                ),
            }
        }

        let report = CycleReport {
            entry,
            snapshot_error: snapshot.error(),
            events: snapshot.events().len(),
            dropped: snapshot.dropped().total(),
            sequence: state.sequence(),
            tier: state.tier(),
            submission: self.animator.submit(state.clone()),
        };
        self.last_state = Some(state);
        self.cycles += 1;

        if !self.animator.is_transitioning() {
            self.step_frame();
        }

        debug!(
            cycle = self.cycles,
            entry = ?report.entry,
            events = report.events,
            dropped = report.dropped,
            submission = ?report.submission,
            "cycle complete"
        );

        report
    }

    /// Fetch the next payload within the time budget and parse it.
    async fn acquire(&mut self) -> (Snapshot, Option<usize>) {
        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.next_payload())
            .await
            .unwrap_or(Err(FeedError::Timeout(self.fetch_timeout)));

        match fetched {
            Ok(Some(payload)) => (
                parse_snapshot(&payload.body, payload.received_at),
                payload.entry,
            ),
            Ok(None) => {
                debug!("feed source had no payload");
                (Snapshot::failed(Utc::now(), SnapshotError::NoData), None)
            }
            Err(e) => {
                warn!(error = %e, "feed fetch failed");
                (Snapshot::failed(Utc::now(), SnapshotError::Malformed), None)
            }
        }
    }

    /// Advance the animation one step and present the frame.
    ///
    /// Returns whether a frame was produced.
    pub fn step_frame(&mut self) -> bool {
        let Some(frame) = self.animator.step() else {
            return false;
        };
        if let Err(e) = self.sink.render(&frame) {
            warn!(error = %e, "pixel sink rejected frame");
        }
        true
    }

    /// Step until the animator is idle with nothing left to draw.
    ///
    /// Returns the number of frames produced.
    pub fn settle(&mut self) -> usize {
        let mut frames = 0;
        while self.animator.has_work() {
            if self.step_frame() {
                frames += 1;
            }
        }
        frames
    }

    /// Run until `shutdown` resolves.
    ///
    /// Shutdown is checked before every tick, so a transition in progress
    /// may be abandoned between steps.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let frame_interval = self
            .animator
            .config()
            .frame_interval
            .max(Duration::from_millis(1));
        let mut frames = tokio::time::interval(frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        info!(
            poll_secs = self.poll_interval.as_secs_f64(),
            clock = ?self.clock,
            "display loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(cycles = self.cycles, "shutdown requested");
                    break;
                }
                _ = poll.tick() => {
                    self.cycle().await;
                }
                _ = frames.tick(), if self.animator.has_work() => {
                    self.step_frame();
                }
            }
        }
    }
}
