//! Placement math for the composited node on the visible canvas.
//!
//! Screen space is y-down. A node of size `w`×`h` has its origin at the
//! top-left corner and maps to the canvas as
//! `canvas = position + R(rotation) * (scale ⊙ local)`, with rotation in
//! degrees, clockwise on screen.

use crate::transform::{TransformState, Vec2};

/// 2D affine map `[a c tx; b d ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Affine {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Node-local to canvas.
    pub fn from_transform(state: &TransformState) -> Self {
        let (sin, cos) = state.rotation.to_radians().sin_cos();
        Self {
            a: cos * state.scale.x,
            b: sin * state.scale.x,
            c: -sin * state.scale.y,
            d: cos * state.scale.y,
            tx: state.position.x,
            ty: state.position.y,
        }
    }

    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// `None` when the map collapses (zero scale).
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if !det.is_finite() || det.abs() <= f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Self {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            tx: (self.c * self.ty - self.d * self.tx) * inv,
            ty: (self.b * self.tx - self.a * self.ty) * inv,
        })
    }
}

/// Axis-aligned bounds of the placed node, as `(min, max)` canvas corners.
pub fn placed_bounds(state: &TransformState, width: u32, height: u32) -> (Vec2, Vec2) {
    let m = Affine::from_transform(state);
    let (w, h) = (width as f32, height as f32);
    let corners = [m.apply(0.0, 0.0), m.apply(w, 0.0), m.apply(0.0, h), m.apply(w, h)];
    let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
    let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for (x, y) in corners {
        min.x = min.x.min(x);
        min.y = min.y.min(y);
        max.x = max.x.max(x);
        max.y = max.y.max(y);
    }
    (min, max)
}

/// Clamp float bounds to a pixel range `[x0, x1) × [y0, y1)` inside the canvas.
pub fn clip_to_canvas(min: Vec2, max: Vec2, canvas_w: u32, canvas_h: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = min.x.floor().max(0.0);
    let y0 = min.y.floor().max(0.0);
    let x1 = max.x.ceil().min(canvas_w as f32);
    let y1 = max.y.ceil().min(canvas_h as f32);
    if !(x0 < x1 && y0 < y1) {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Size of the node on screen, ignoring rotation.
pub fn scaled_span(width: u32, height: u32, scale: Vec2) -> (f32, f32) {
    ((width as f32 * scale.x).abs(), (height as f32 * scale.y).abs())
}
