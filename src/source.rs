//! Frame sources and the media-track providers that hand them out.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::{Rgba, RgbaImage};
use tracing::{debug, info};

use crate::error::Error;

/// Borrowed RGBA8 frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

impl<'a> From<&'a RgbaImage> for FrameRef<'a> {
    fn from(img: &'a RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            pixels: img.as_raw(),
        }
    }
}

/// A live, decodable video surface.
pub trait FrameSource: Send {
    /// Decoded size; `(0, 0)` until the first frame is available.
    fn intrinsic_size(&self) -> (u32, u32);

    fn is_playing(&self) -> bool;

    /// A fresh frame can be drawn.
    fn is_ready(&self) -> bool {
        let (w, h) = self.intrinsic_size();
        w > 0 && h > 0 && self.is_playing()
    }

    /// The frame to draw on this tick.
    fn current_frame(&mut self) -> Option<FrameRef<'_>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies playable surfaces for track references.
pub trait MediaTrackProvider: Send {
    /// # Errors
    /// [`Error::AttachFailure`] when the track cannot be turned into a source.
    fn attach(&mut self, track: &TrackId) -> Result<Box<dyn FrameSource>, Error>;

    /// Release whatever `attach` set up for `track`.
    fn detach(&mut self, track: &TrackId);
}

/// Observable play/pause state shared with a source.
#[derive(Debug, Clone)]
pub struct PlaybackControl(Arc<AtomicBool>);

impl PlaybackControl {
    pub fn new(playing: bool) -> Self {
        Self(Arc::new(AtomicBool::new(playing)))
    }

    pub fn play(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn pause(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cycles through a fixed list of frames, one per `current_frame` call.
#[derive(Debug)]
pub struct LoopingSource {
    frames: Arc<Vec<RgbaImage>>,
    cursor: usize,
    playback: PlaybackControl,
}

impl LoopingSource {
    pub fn new(frames: Arc<Vec<RgbaImage>>, playback: PlaybackControl) -> Self {
        Self {
            frames,
            cursor: 0,
            playback,
        }
    }
}

impl FrameSource for LoopingSource {
    fn intrinsic_size(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| f.dimensions())
            .unwrap_or((0, 0))
    }

    fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    fn current_frame(&mut self) -> Option<FrameRef<'_>> {
        if self.frames.is_empty() {
            return None;
        }
        let idx = self.cursor % self.frames.len();
        self.cursor = self.cursor.wrapping_add(1);
        self.frames.get(idx).map(FrameRef::from)
    }
}

struct StaticTrack {
    frames: Arc<Vec<RgbaImage>>,
    playback: PlaybackControl,
}

/// In-memory provider: each track is a list of frames played in a loop.
#[derive(Default)]
pub struct StaticTrackProvider {
    tracks: HashMap<TrackId, StaticTrack>,
    attached: HashSet<TrackId>,
}

impl StaticTrackProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a track. Tracks start out playing.
    pub fn insert(&mut self, track: TrackId, frames: Vec<RgbaImage>) -> PlaybackControl {
        let playback = PlaybackControl::new(true);
        self.tracks.insert(
            track,
            StaticTrack {
                frames: Arc::new(frames),
                playback: playback.clone(),
            },
        );
        playback
    }

    /// Register a track decoded from image files, in order.
    pub fn insert_files<P: AsRef<Path>>(
        &mut self,
        track: TrackId,
        paths: &[P],
    ) -> Result<PlaybackControl, Error> {
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            frames.push(decode_rgba8(path.as_ref())?);
        }
        Ok(self.insert(track, frames))
    }

    pub fn playback(&self, track: &TrackId) -> Option<PlaybackControl> {
        self.tracks.get(track).map(|t| t.playback.clone())
    }

    pub fn is_attached(&self, track: &TrackId) -> bool {
        self.attached.contains(track)
    }
}

impl MediaTrackProvider for StaticTrackProvider {
    fn attach(&mut self, track: &TrackId) -> Result<Box<dyn FrameSource>, Error> {
        let fail = |reason: &str| Error::AttachFailure {
            track: track.to_string(),
            reason: reason.to_owned(),
        };
        let entry = self.tracks.get(track).ok_or_else(|| fail("unknown track"))?;
        let Some(first) = entry.frames.first() else {
            return Err(fail("track has no frames"));
        };
        let size = first.dimensions();
        if size.0 == 0 || size.1 == 0 {
            return Err(fail("track has empty frames"));
        }
        if entry.frames.iter().any(|f| f.dimensions() != size) {
            return Err(fail("track frames differ in size"));
        }
        if !self.attached.insert(track.clone()) {
            return Err(fail("track already attached"));
        }
        info!(%track, width = size.0, height = size.1, "track attached");
        Ok(Box::new(LoopingSource::new(
            Arc::clone(&entry.frames),
            entry.playback.clone(),
        )))
    }

    fn detach(&mut self, track: &TrackId) {
        if self.attached.remove(track) {
            info!(%track, "track detached");
        }
    }
}

/// Decode an image file to RGBA8.
pub fn decode_rgba8(path: &Path) -> Result<RgbaImage, Error> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    debug!(path = %path.display(), width = img.width(), height = img.height(), "decoded frame");
    Ok(img)
}

/// Green-screen backdrop with a subject disc and a slightly off-key rim.
///
/// The rim sits just outside the key radius so it survives keying.
pub fn test_pattern(width: u32, height: u32) -> RgbaImage {
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let radius = width.min(height) as f32 / 3.0;
    RgbaImage::from_fn(width, height, |x, y| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < radius {
            let shade = (255.0 * (1.0 - dist / radius)) as u8;
            Rgba([200, 80u8.saturating_add(shade / 4), 60, 255])
        } else if dist < radius + 4.0 {
            Rgba([30, 240, 20, 255])
        } else {
            Rgba([0, 255, 1, 255])
        }
    })
}
