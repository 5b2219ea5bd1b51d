//! Presentation of the composite buffer on the visible canvas.

use image::{Rgba, RgbaImage};
use tracing::{debug, trace};

use crate::error::Error;
use crate::processing::layout::{Affine, clip_to_canvas, placed_bounds};
use crate::surface::{OffscreenBuffer, check_dimensions};
use crate::transform::TransformState;

/// Redraws the visible layer. Both arguments are read-only: presenting never
/// changes the buffer or the placement.
pub trait Presenter: Send {
    fn present(&mut self, buffer: &OffscreenBuffer, transform: &TransformState) -> Result<(), Error>;

    /// Follow a display-size change. Called before the next present.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), Error>;
}

/// Software canvas: clears to a background color and blends the buffer on
/// top using the node placement.
#[derive(Debug, Clone)]
pub struct CanvasPresenter {
    canvas: RgbaImage,
    background: Rgba<u8>,
    presented: u64,
}

impl CanvasPresenter {
    pub fn new(width: u32, height: u32, background: [u8; 4]) -> Self {
        let background = Rgba(background);
        Self {
            canvas: RgbaImage::from_pixel(width, height, background),
            background,
            presented: 0,
        }
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_canvas(self) -> RgbaImage {
        self.canvas
    }

    pub const fn presented(&self) -> u64 {
        self.presented
    }
}

impl Presenter for CanvasPresenter {
    fn present(&mut self, buffer: &OffscreenBuffer, transform: &TransformState) -> Result<(), Error> {
        for px in self.canvas.pixels_mut() {
            *px = self.background;
        }
        self.presented += 1;

        let Some(inverse) = Affine::from_transform(transform).inverse() else {
            trace!("node collapsed to zero area; nothing to draw");
            return Ok(());
        };
        let (min, max) = placed_bounds(transform, buffer.width(), buffer.height());
        let Some((x0, y0, x1, y1)) =
            clip_to_canvas(min, max, self.canvas.width(), self.canvas.height())
        else {
            return Ok(());
        };

        let (bw, bh) = (buffer.width() as f32, buffer.height() as f32);
        for y in y0..y1 {
            for x in x0..x1 {
                let (u, v) = inverse.apply(x as f32 + 0.5, y as f32 + 0.5);
                if !(0.0..bw).contains(&u) || !(0.0..bh).contains(&v) {
                    continue;
                }
                let Some(src) = buffer.pixel(u as u32, v as u32) else {
                    continue;
                };
                blend_over(self.canvas.get_pixel_mut(x, y), src);
            }
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if self.canvas.dimensions() == (width, height) {
            return Ok(());
        }
        check_dimensions(width, height)?;
        debug!(width, height, "canvas resized");
        self.canvas = RgbaImage::from_pixel(width, height, self.background);
        Ok(())
    }
}

/// Source-over with straight alpha.
#[inline]
fn blend_over(dst: &mut Rgba<u8>, src: [u8; 4]) {
    match src[3] {
        0 => {}
        255 => dst.0 = src,
        sa => {
            let sa = u32::from(sa);
            let da = u32::from(dst[3]);
            let out_a = sa * 255 + da * (255 - sa);
            if out_a == 0 {
                dst.0 = [0, 0, 0, 0];
                return;
            }
            for c in 0..3 {
                let num = u32::from(src[c]) * sa * 255 + u32::from(dst[c]) * da * (255 - sa);
                dst[c] = ((num + out_a / 2) / out_a) as u8;
            }
            dst[3] = ((out_a + 127) / 255) as u8;
        }
    }
}
