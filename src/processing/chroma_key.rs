use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ChromaKeyConfig;

/// Reference green used by the booth backdrop.
pub const DEFAULT_KEY_COLOR: [u8; 3] = [0, 255, 1];
/// RGB distance below which a pixel is keyed out.
pub const DEFAULT_THRESHOLD: f64 = 30.0;

/// Shared on/off switch for the key, read fresh on every frame.
///
/// Flipping it takes effect on the next processed frame without restarting
/// the scheduling loop.
#[derive(Debug, Clone)]
pub struct KeyToggle(Arc<AtomicBool>);

impl KeyToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for KeyToggle {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Clone)]
pub struct ChromaKeySpec {
    pub key_color: [u8; 3],
    pub threshold: f64,
    pub enabled: KeyToggle,
}

impl Default for ChromaKeySpec {
    fn default() -> Self {
        Self {
            key_color: DEFAULT_KEY_COLOR,
            threshold: DEFAULT_THRESHOLD,
            enabled: KeyToggle::default(),
        }
    }
}

impl From<&ChromaKeyConfig> for ChromaKeySpec {
    fn from(cfg: &ChromaKeyConfig) -> Self {
        Self {
            key_color: cfg.key_color,
            threshold: cfg.threshold,
            enabled: KeyToggle::new(cfg.enabled),
        }
    }
}

impl ChromaKeySpec {
    /// Whether a color sits strictly inside the key radius.
    #[inline]
    pub fn matches(&self, r: u8, g: u8, b: u8) -> bool {
        key_distance([r, g, b], self.key_color) < self.threshold
    }
}

/// Euclidean RGB distance, unrounded.
#[inline]
pub fn key_distance(color: [u8; 3], key: [u8; 3]) -> f64 {
    let dr = i32::from(color[0]) - i32::from(key[0]);
    let dg = i32::from(color[1]) - i32::from(key[1]);
    let db = i32::from(color[2]) - i32::from(key[2]);
    f64::from(dr * dr + dg * dg + db * db).sqrt()
}

/// Keys an RGBA8 buffer in place and returns how many pixels were cleared.
///
/// Matching pixels get alpha 0 and keep their color channels; every other
/// pixel is left untouched. Hard cut-off only. Returns 0 without touching the
/// buffer when the toggle is off.
pub fn apply_chroma_key(pixels: &mut [u8], spec: &ChromaKeySpec) -> usize {
    if !spec.enabled.is_enabled() {
        return 0;
    }
    let mut keyed = 0;
    for px in pixels.chunks_exact_mut(4) {
        if spec.matches(px[0], px[1], px[2]) {
            px[3] = 0;
            keyed += 1;
        }
    }
    keyed
}
