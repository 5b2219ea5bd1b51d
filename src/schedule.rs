//! Frame pacing for the compositing pipeline.
//!
//! The scheduler is driven by an external "animation opportunity" (a display
//! refresh or timer tick) and decides, per tick, whether the pipeline should
//! process a frame. It reads a continuous clock on every tick instead of
//! relying on the driver period, so rounding in the driver never accumulates.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

/// Named target frame rate for processing and presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityProfile {
    High,
    #[default]
    Good,
    Low,
}

impl QualityProfile {
    pub const ALL: [Self; 3] = [Self::High, Self::Good, Self::Low];

    pub const fn target_fps(self) -> u32 {
        match self {
            Self::High => 60,
            Self::Good => 30,
            Self::Low => 15,
        }
    }

    /// Minimum spacing between accepted frames.
    pub const fn frame_interval(self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.target_fps() as u64)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Good => "good",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityProfile {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.as_str() == raw)
            .ok_or_else(|| format!("unknown quality '{raw}', expected one of: high, good, low"))
    }
}

/// What the scheduler decided for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// The frame callback ran and the baseline moved to this tick.
    Accept,
    /// Less than one target interval since the last accepted frame.
    TooEarly,
    /// Interval elapsed but the source has no playable frame.
    SourceUnready,
    /// Capture is switched off.
    Disabled,
}

impl TickDecision {
    pub const fn accepted(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Gates frame processing to at most one frame per target interval.
///
/// Skipped ticks are dropped, never queued: there is no backlog to coalesce.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    profile: QualityProfile,
    interval: Duration,
    last_accepted: Instant,
}

impl FrameScheduler {
    pub fn new(profile: QualityProfile, now: Instant) -> Self {
        Self {
            profile,
            interval: profile.frame_interval(),
            last_accepted: now,
        }
    }

    pub const fn profile(&self) -> QualityProfile {
        self.profile
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Time since the last accepted frame (or since the last restart).
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accepted)
    }

    /// Tear down the current cadence and start again from a zero baseline.
    ///
    /// Elapsed time accumulated under the previous profile is discarded, so the
    /// first frame after a switch arrives one full new interval later.
    pub fn restart(&mut self, profile: QualityProfile, now: Instant) {
        if profile != self.profile {
            info!(from = %self.profile, to = %profile, "quality profile switched");
        }
        self.profile = profile;
        self.interval = profile.frame_interval();
        self.last_accepted = now;
    }

    /// Decide one tick without running anything.
    pub fn gate(&mut self, now: Instant, source_ready: bool, enabled: bool) -> TickDecision {
        if !enabled {
            return TickDecision::Disabled;
        }
        if self.elapsed(now) < self.interval {
            return TickDecision::TooEarly;
        }
        if !source_ready {
            return TickDecision::SourceUnready;
        }
        self.last_accepted = now;
        TickDecision::Accept
    }

    /// Run `on_frame` if this tick is due, the source is ready and capture is on.
    pub fn tick<F: FnOnce()>(
        &mut self,
        now: Instant,
        source_ready: bool,
        enabled: bool,
        on_frame: F,
    ) -> TickDecision {
        let decision = self.gate(now, source_ready, enabled);
        if decision.accepted() {
            on_frame();
        } else if decision == TickDecision::SourceUnready {
            debug!("frame source not ready; skipping tick");
        }
        decision
    }
}
