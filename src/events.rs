use crate::schedule::QualityProfile;
use crate::source::TrackId;
use crate::transform::{PointerTarget, TransformCommit, Vec2};

/// Control messages for the pipeline task.
///
/// The chroma-key toggle is not a command: it is a shared handle read on
/// every frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositorCommand {
    Attach(TrackId),
    Detach,
    SetQuality(QualityProfile),
    SetCaptureEnabled(bool),
    Resize { width: u32, height: u32 },
    Pointer(PointerTarget),
    CommitDrag(Vec2),
    CommitTransform(TransformCommit),
}

/// Emitted by the pipeline task.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The canvas was redrawn. `keyed` is `None` for placement-only redraws.
    Presented { frame: u64, keyed: Option<usize> },
    AttachFailed { track: TrackId, reason: String },
    Detached(TrackId),
}
