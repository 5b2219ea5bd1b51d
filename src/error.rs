use thiserror::Error;

/// Library error type for compositing operations.
///
/// Per-frame conditions (unready source, disabled key, rejected transform
/// commits) are outcomes, not errors, and never show up here.
#[derive(Debug, Error)]
pub enum Error {
    /// The media track could not be attached to a playback surface.
    #[error("failed to attach track {track}: {reason}")]
    AttachFailure { track: String, reason: String },

    /// The offscreen buffer could not be allocated.
    #[error("cannot allocate {width}x{height} offscreen buffer")]
    BufferAllocation { width: u32, height: u32 },

    /// Drawing a frame into the offscreen buffer failed.
    #[error("draw error: {0}")]
    Draw(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Image decode error from a file-backed track.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
