//! Single-owner compositing engine.
//!
//! One call to [`Compositor::tick`] runs the whole frame synchronously:
//! scheduler gate, draw into the offscreen buffer, chroma key, present. The
//! presenter therefore never sees a partially keyed buffer.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::Error;
use crate::processing::chroma_key::{ChromaKeySpec, KeyToggle};
use crate::render::canvas::Presenter;
use crate::schedule::{FrameScheduler, QualityProfile, TickDecision};
use crate::source::{FrameSource, MediaTrackProvider, TrackId};
use crate::surface::{CompositeSurface, check_dimensions};
use crate::transform::{
    CommitOutcome, NodeId, PointerTarget, TransformCommit, TransformController, Vec2,
};

/// Node id of the composited video on the canvas.
pub const COMPOSITE_NODE: NodeId = NodeId(1);

/// Tick counters. A tick the scheduler accepted but whose source then had
/// no frame counts as `unready`; the cadence baseline has still moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub accepted: u64,
    pub too_early: u64,
    pub unready: u64,
    pub disabled: u64,
    pub presented: u64,
    pub draw_failures: u64,
    pub last_keyed: usize,
}

impl PipelineStats {
    fn record(&mut self, decision: TickDecision) {
        match decision {
            TickDecision::Accept => self.accepted += 1,
            TickDecision::TooEarly => self.too_early += 1,
            TickDecision::SourceUnready => self.unready += 1,
            TickDecision::Disabled => self.disabled += 1,
        }
    }
}

/// Result of one driver tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub decision: TickDecision,
    pub presented: bool,
    /// Keyed pixel count when a new frame was processed.
    pub keyed: Option<usize>,
}

struct AttachedTrack {
    id: TrackId,
    source: Box<dyn FrameSource>,
}

pub struct Compositor {
    scheduler: FrameScheduler,
    surface: Option<CompositeSurface>,
    track: Option<AttachedTrack>,
    key: ChromaKeySpec,
    transform: TransformController,
    size: (u32, u32),
    capture_enabled: bool,
    placement_dirty: bool,
    pending_canvas_size: Option<(u32, u32)>,
    stats: PipelineStats,
}

impl Compositor {
    pub fn new(cfg: &Configuration, now: Instant) -> Self {
        let size = (cfg.surface.width, cfg.surface.height);
        Self {
            scheduler: FrameScheduler::new(cfg.quality, now),
            surface: None,
            track: None,
            key: ChromaKeySpec::from(&cfg.chroma_key),
            transform: TransformController::with_min_span(size.0, size.1, cfg.min_span),
            size,
            capture_enabled: true,
            placement_dirty: false,
            pending_canvas_size: None,
            stats: PipelineStats::default(),
        }
    }

    /// Attach `track`, replacing any current one, and allocate the buffer.
    ///
    /// # Errors
    /// [`Error::AttachFailure`] from the provider, or
    /// [`Error::BufferAllocation`]; in the latter case the track is detached
    /// again and the compositor stays inert.
    pub fn attach<P>(&mut self, provider: &mut P, track: TrackId, now: Instant) -> Result<(), Error>
    where
        P: MediaTrackProvider + ?Sized,
    {
        self.detach(provider);
        let source = provider.attach(&track)?;
        let surface = match CompositeSurface::new(self.size.0, self.size.1) {
            Ok(surface) => surface,
            Err(err) => {
                warn!(%track, error = %err, "offscreen buffer unavailable; releasing track");
                provider.detach(&track);
                return Err(err);
            }
        };
        info!(%track, width = self.size.0, height = self.size.1, quality = %self.scheduler.profile(), "compositor started");
        self.surface = Some(surface);
        self.track = Some(AttachedTrack { id: track, source });
        self.scheduler.restart(self.scheduler.profile(), now);
        self.placement_dirty = false;
        Ok(())
    }

    /// Stop processing, release the buffer and the source. Returns the track
    /// that was attached, if any.
    pub fn detach<P>(&mut self, provider: &mut P) -> Option<TrackId>
    where
        P: MediaTrackProvider + ?Sized,
    {
        self.surface = None;
        let track = self.track.take()?;
        provider.detach(&track.id);
        self.transform.detach_node();
        info!(track = %track.id, "compositor stopped");
        Some(track.id)
    }

    pub fn is_attached(&self) -> bool {
        self.track.is_some()
    }

    pub fn attached_track(&self) -> Option<&TrackId> {
        self.track.as_ref().map(|t| &t.id)
    }

    pub fn quality(&self) -> QualityProfile {
        self.scheduler.profile()
    }

    /// Restart the cadence under `profile` from a zero baseline.
    pub fn set_quality(&mut self, profile: QualityProfile, now: Instant) {
        self.scheduler.restart(profile, now);
    }

    pub fn capture_enabled(&self) -> bool {
        self.capture_enabled
    }

    pub fn set_capture_enabled(&mut self, enabled: bool) {
        if self.capture_enabled != enabled {
            debug!(enabled, "capture toggled");
        }
        self.capture_enabled = enabled;
    }

    /// Handle for switching the key on and off between ticks.
    pub fn key_toggle(&self) -> KeyToggle {
        self.key.enabled.clone()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Change the display size. An attached buffer is recreated before the
    /// next draw and the canvas follows on the next present; on failure the
    /// old buffer and size stay.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        check_dimensions(width, height)?;
        if let Some(surface) = self.surface.as_mut() {
            surface.recreate(width, height)?;
        }
        self.size = (width, height);
        self.pending_canvas_size = Some(self.size);
        self.transform.set_node_size(width, height);
        self.placement_dirty = true;
        Ok(())
    }

    pub fn surface(&self) -> Option<&CompositeSurface> {
        self.surface.as_ref()
    }

    pub fn transform(&self) -> &TransformController {
        &self.transform
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn pointer_down(&mut self, target: PointerTarget) -> bool {
        let changed = self.transform.pointer_down(target);
        self.placement_dirty |= changed;
        changed
    }

    pub fn commit_drag(&mut self, position: Vec2) -> CommitOutcome {
        let outcome = self.transform.commit_drag(position);
        self.placement_dirty |= outcome == CommitOutcome::Applied;
        outcome
    }

    pub fn commit_transform(&mut self, commit: TransformCommit) -> CommitOutcome {
        let outcome = self.transform.commit_transform(commit);
        self.placement_dirty |= outcome == CommitOutcome::Applied;
        outcome
    }

    /// One driver tick. Processes and presents a frame when the scheduler
    /// accepts; otherwise redraws only if the placement changed.
    pub fn tick(&mut self, now: Instant, presenter: &mut dyn Presenter) -> Result<TickReport, Error> {
        let ready = self.surface.is_some()
            && self.track.as_ref().is_some_and(|t| t.source.is_ready());
        let mut decision = self.scheduler.gate(now, ready, self.capture_enabled);
        let mut report = TickReport {
            decision,
            presented: false,
            keyed: None,
        };

        let (Some(surface), Some(track)) = (self.surface.as_mut(), self.track.as_mut()) else {
            self.stats.record(decision);
            return Ok(report);
        };

        let frame = if decision.accepted() {
            let frame = track.source.current_frame();
            if frame.is_none() {
                debug!(track = %track.id, "source reported ready without a frame");
                decision = TickDecision::SourceUnready;
                report.decision = decision;
            }
            frame
        } else {
            None
        };
        self.stats.record(decision);

        if let Some(frame) = frame {
            let keyed = match surface.process_frame(frame, &self.key) {
                Ok(keyed) => keyed,
                Err(err) => {
                    self.stats.draw_failures += 1;
                    return Err(err);
                }
            };
            self.stats.last_keyed = keyed;
            report.keyed = Some(keyed);
        } else if !self.placement_dirty {
            return Ok(report);
        }

        if let Some((width, height)) = self.pending_canvas_size.take() {
            presenter.resize(width, height)?;
        }
        presenter.present(surface.buffer(), self.transform.state())?;
        self.placement_dirty = false;
        self.stats.presented += 1;
        report.presented = true;
        Ok(report)
    }
}
