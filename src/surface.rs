//! Persistent offscreen buffer that receives each accepted frame.

use fast_image_resize as fir;
use tracing::{debug, info};

use crate::error::Error;
use crate::processing::chroma_key::{ChromaKeySpec, apply_chroma_key};
use crate::source::FrameRef;

/// Largest width or height accepted for a buffer.
pub const MAX_SURFACE_DIM: u32 = 8192;

/// Fixed-size RGBA8 pixel buffer. Its size never changes; a new display size
/// means a new buffer.
#[derive(Debug, Clone)]
pub struct OffscreenBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Rejects empty or oversized buffer dimensions.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), Error> {
    if (1..=MAX_SURFACE_DIM).contains(&width) && (1..=MAX_SURFACE_DIM).contains(&height) {
        Ok(())
    } else {
        Err(Error::BufferAllocation { width, height })
    }
}

impl OffscreenBuffer {
    /// # Errors
    /// Returns [`Error::BufferAllocation`] for empty or oversized dimensions,
    /// or when the allocator cannot satisfy the request.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        check_dimensions(width, height)?;
        let alloc_err = || Error::BufferAllocation { width, height };
        let len = width as usize * height as usize * 4;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| alloc_err())?;
        pixels.resize(len, 0);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA at `(x, y)`, or `None` outside the buffer.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Owns the offscreen buffer and fills it once per accepted tick.
pub struct CompositeSurface {
    buffer: OffscreenBuffer,
    resizer: fir::Resizer,
    options: fir::ResizeOptions,
    frames_drawn: u64,
}

impl CompositeSurface {
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        let buffer = OffscreenBuffer::new(width, height)?;
        debug!(width, height, "offscreen buffer allocated");
        Ok(Self {
            buffer,
            resizer: fir::Resizer::new(),
            options: fir::ResizeOptions::new()
                .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear)),
            frames_drawn: 0,
        })
    }

    /// Read-only view for the render path.
    pub const fn buffer(&self) -> &OffscreenBuffer {
        &self.buffer
    }

    pub const fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Swap in a buffer of a new size. The replacement is built first, so a
    /// failed allocation leaves the current buffer in place.
    pub fn recreate(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == self.buffer.width && height == self.buffer.height {
            return Ok(());
        }
        let next = OffscreenBuffer::new(width, height)?;
        info!(
            from_w = self.buffer.width,
            from_h = self.buffer.height,
            to_w = width,
            to_h = height,
            "offscreen buffer recreated"
        );
        self.buffer = next;
        Ok(())
    }

    /// Draw `frame` stretched to the buffer size.
    pub fn draw_frame(&mut self, frame: FrameRef<'_>) -> Result<(), Error> {
        let expected = frame.width as usize * frame.height as usize * 4;
        if frame.width == 0 || frame.height == 0 || frame.pixels.len() != expected {
            return Err(Error::Draw(format!(
                "frame {}x{} carries {} bytes, expected {}",
                frame.width,
                frame.height,
                frame.pixels.len(),
                expected
            )));
        }
        let (width, height) = (self.buffer.width, self.buffer.height);
        if frame.width == width && frame.height == height {
            self.buffer.pixels.copy_from_slice(frame.pixels);
        } else {
            let src = fir::images::ImageRef::new(
                frame.width,
                frame.height,
                frame.pixels,
                fir::PixelType::U8x4,
            )
            .map_err(|err| Error::Draw(err.to_string()))?;
            let mut dst = fir::images::Image::from_slice_u8(
                width,
                height,
                &mut self.buffer.pixels,
                fir::PixelType::U8x4,
            )
            .map_err(|err| Error::Draw(err.to_string()))?;
            self.resizer
                .resize(&src, &mut dst, Some(&self.options))
                .map_err(|err| Error::Draw(err.to_string()))?;
        }
        self.frames_drawn += 1;
        Ok(())
    }

    /// Draw then key, as one uninterrupted step. Returns keyed pixel count.
    pub fn process_frame(&mut self, frame: FrameRef<'_>, key: &ChromaKeySpec) -> Result<usize, Error> {
        self.draw_frame(frame)?;
        Ok(apply_chroma_key(&mut self.buffer.pixels, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat(width as usize * height as usize)
    }

    #[test]
    fn rejects_empty_and_oversized_buffers() {
        assert!(matches!(
            OffscreenBuffer::new(0, 10),
            Err(Error::BufferAllocation { width: 0, height: 10 })
        ));
        assert!(OffscreenBuffer::new(MAX_SURFACE_DIM + 1, 1).is_err());
        assert!(check_dimensions(MAX_SURFACE_DIM, 1).is_ok());
        assert!(matches!(
            check_dimensions(4, 0),
            Err(Error::BufferAllocation { width: 4, height: 0 })
        ));
    }

    #[test]
    fn draws_same_size_frame_verbatim() {
        let mut surface = CompositeSurface::new(4, 2).unwrap();
        let pixels = solid(4, 2, [9, 8, 7, 255]);
        surface
            .draw_frame(FrameRef {
                width: 4,
                height: 2,
                pixels: &pixels,
            })
            .unwrap();
        assert_eq!(surface.buffer().as_raw(), pixels.as_slice());
        assert_eq!(surface.frames_drawn(), 1);
    }

    #[test]
    fn scales_frame_to_buffer_size() {
        let mut surface = CompositeSurface::new(8, 6).unwrap();
        let pixels = solid(16, 12, [200, 100, 50, 255]);
        surface
            .draw_frame(FrameRef {
                width: 16,
                height: 12,
                pixels: &pixels,
            })
            .unwrap();
        let px = surface.buffer().pixel(3, 3).unwrap();
        for (got, want) in px.iter().zip([200u8, 100, 50, 255]) {
            assert!(got.abs_diff(want) <= 1, "{px:?}");
        }
    }

    #[test]
    fn malformed_frame_is_a_draw_error() {
        let mut surface = CompositeSurface::new(2, 2).unwrap();
        let err = surface
            .draw_frame(FrameRef {
                width: 2,
                height: 2,
                pixels: &[0; 3],
            })
            .unwrap_err();
        assert!(matches!(err, Error::Draw(_)));
    }

    #[test]
    fn failed_recreate_keeps_old_buffer() {
        let mut surface = CompositeSurface::new(3, 3).unwrap();
        assert!(surface.recreate(0, 3).is_err());
        assert_eq!((surface.buffer().width(), surface.buffer().height()), (3, 3));
        surface.recreate(5, 4).unwrap();
        assert_eq!(surface.buffer().as_raw().len(), 5 * 4 * 4);
    }
}
