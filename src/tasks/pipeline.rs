use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compositor::Compositor;
use crate::events::{CompositorCommand, PipelineEvent};
use crate::render::canvas::Presenter;
use crate::source::MediaTrackProvider;

/// Drives the compositor from a fixed-period ticker until cancelled.
///
/// The ticker stands in for the display's animation opportunities: it fires
/// whether or not a frame gets accepted, so re-enabling capture or a source
/// coming back resumes on the next tick. Missed ticks are skipped, never
/// replayed. On exit the track is detached and the buffer released before
/// the presenter is handed back.
pub async fn run<P, R>(
    mut compositor: Compositor,
    mut provider: P,
    mut presenter: R,
    mut control: Receiver<CompositorCommand>,
    events: Sender<PipelineEvent>,
    cancel: CancellationToken,
    driver_interval: Duration,
) -> Result<R>
where
    P: MediaTrackProvider,
    R: Presenter,
{
    let mut ticker = interval(driver_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        select! {
            _ = cancel.cancelled() => break,

            Some(command) = control.recv() => {
                apply_command(&mut compositor, &mut provider, command, &events);
            }

            _ = ticker.tick() => {
                let now = Instant::now().into_std();
                match compositor.tick(now, &mut presenter) {
                    Ok(report) if report.presented => {
                        let frame = compositor.stats().presented;
                        emit(&events, PipelineEvent::Presented { frame, keyed: report.keyed });
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "frame dropped"),
                }
            }
        }
    }

    if let Some(track) = compositor.detach(&mut provider) {
        emit(&events, PipelineEvent::Detached(track));
    }
    let stats = compositor.stats();
    info!(
        accepted = stats.accepted,
        presented = stats.presented,
        unready = stats.unready,
        "pipeline stopped"
    );
    Ok(presenter)
}

fn apply_command<P: MediaTrackProvider>(
    compositor: &mut Compositor,
    provider: &mut P,
    command: CompositorCommand,
    events: &Sender<PipelineEvent>,
) {
    debug!(?command, "pipeline command");
    let now = Instant::now().into_std();
    match command {
        CompositorCommand::Attach(track) => {
            if let Some(previous) = compositor.attached_track().cloned() {
                emit(events, PipelineEvent::Detached(previous));
            }
            if let Err(err) = compositor.attach(provider, track.clone(), now) {
                warn!(%track, error = %err, "attach failed; pipeline idle");
                emit(
                    events,
                    PipelineEvent::AttachFailed {
                        track,
                        reason: err.to_string(),
                    },
                );
            }
        }
        CompositorCommand::Detach => {
            if let Some(track) = compositor.detach(provider) {
                emit(events, PipelineEvent::Detached(track));
            }
        }
        CompositorCommand::SetQuality(profile) => compositor.set_quality(profile, now),
        CompositorCommand::SetCaptureEnabled(enabled) => compositor.set_capture_enabled(enabled),
        CompositorCommand::Resize { width, height } => {
            if let Err(err) = compositor.resize(width, height) {
                warn!(width, height, error = %err, "resize failed; keeping current buffer");
            }
        }
        CompositorCommand::Pointer(target) => {
            compositor.pointer_down(target);
        }
        CompositorCommand::CommitDrag(position) => {
            compositor.commit_drag(position);
        }
        CompositorCommand::CommitTransform(commit) => {
            compositor.commit_transform(commit);
        }
    }
}

/// Non-blocking: a slow consumer loses events rather than stalling frames.
fn emit(events: &Sender<PipelineEvent>, event: PipelineEvent) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => debug!(?event, "event channel full; dropping"),
        Err(TrySendError::Closed(_)) => {}
    }
}
