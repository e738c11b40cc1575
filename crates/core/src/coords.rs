use serde::{Deserialize, Serialize};

use crate::types::{Point, Region};

/// Fixed logical resolution every authored coordinate is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCanvas {
    pub width: u32,
    pub height: u32,
}

impl Default for ReferenceCanvas {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

/// Chrome around the rendered surface when the emulator runs bordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Insets {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// Named windowed-mode insets.
pub fn windowed_preset(name: &str) -> Option<Insets> {
    match name {
        "google_play" => Some(Insets { left: 9, right: 8, top: 31, bottom: 8 }),
        _ => None,
    }
}

/// Maps reference-canvas points onto the current window.
///
/// Holds the last geometry snapshot handed to it by [`set_geometry`]; the
/// caller refreshes it from the OS before each operation that depends on it.
///
/// [`set_geometry`]: CoordinateMapper::set_geometry
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    canvas: ReferenceCanvas,
    insets: Option<Insets>,
    geometry: Option<Region>,
    // last known size, used while the window is missing
    size: (i32, i32),
}

impl CoordinateMapper {
    pub fn new(canvas: ReferenceCanvas, insets: Option<Insets>) -> Self {
        Self {
            canvas,
            insets,
            geometry: None,
            size: (canvas.width as i32, canvas.height as i32),
        }
    }

    pub fn canvas(&self) -> ReferenceCanvas {
        self.canvas
    }

    pub fn geometry(&self) -> Option<Region> {
        self.geometry
    }

    /// Window size in pixels, or the last known size if the window is gone.
    pub fn size(&self) -> (i32, i32) {
        self.size
    }

    pub fn set_geometry(&mut self, geometry: Option<Region>) {
        if let Some(g) = geometry {
            if g.w > 0 && g.h > 0 {
                self.size = (g.w, g.h);
            }
        }
        self.geometry = geometry;
    }

    fn effective_canvas(&self, x: i32, y: i32) -> (f64, f64, f64, f64) {
        let (mut bx, mut by) = (x as f64, y as f64);
        let (mut bw, mut bh) = (self.canvas.width as f64, self.canvas.height as f64);
        if let Some(i) = self.insets {
            bx += i.left as f64;
            by += i.top as f64;
            bw -= (i.left + i.right) as f64;
            bh -= (i.top + i.bottom) as f64;
        }
        (bx, by, bw.max(1.0), bh.max(1.0))
    }

    /// Reference point -> window-relative pixel.
    pub fn scaled(&self, x: i32, y: i32) -> (i32, i32) {
        let (bx, by, bw, bh) = self.effective_canvas(x, y);
        let (w, h) = self.size;
        (
            (bx * w as f64 / bw).floor() as i32,
            (by * h as f64 / bh).floor() as i32,
        )
    }

    pub fn scaled_point(&self, p: Point) -> (i32, i32) {
        self.scaled(p.x, p.y)
    }

    /// Reference point -> absolute screen pixel. None when no window is known.
    pub fn absolute(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        let g = self.geometry?;
        let (sx, sy) = self.scaled(x, y);
        Some((sx + g.l, sy + g.t))
    }

    /// Window-relative pixel -> reference point (inverse of [`scaled`]).
    ///
    /// [`scaled`]: CoordinateMapper::scaled
    pub fn to_reference(&self, sx: i32, sy: i32) -> (i32, i32) {
        let (_, _, bw, bh) = self.effective_canvas(0, 0);
        let (w, h) = self.size;
        let (left, top) = self.insets.map_or((0, 0), |i| (i.left, i.top));
        (
            (sx as f64 * bw / w as f64).round() as i32 - left,
            (sy as f64 * bh / h as f64).round() as i32 - top,
        )
    }
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(ReferenceCanvas::default(), None)
    }
}
