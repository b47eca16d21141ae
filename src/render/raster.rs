//! Scanline-free triangle rasterizer over a luminance + depth buffer.
//!
//! Coverage is decided with edge functions at pixel centers. Shared edges are
//! owned by exactly one of the two triangles so translucent meshes do not
//! double-blend along their seams.

/// Vertex position in pixel space; `z` grows towards the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Framebuffer {
    width: usize,
    height: usize,
    color: Vec<f32>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            color: vec![0.0; len],
            depth: vec![f32::NEG_INFINITY; len],
        }
    }

    pub(crate) fn color(&self) -> &[f32] {
        &self.color
    }

    pub(crate) fn clear(&mut self) {
        self.color.fill(0.0);
        self.clear_depth();
    }

    pub(crate) fn clear_depth(&mut self) {
        self.depth.fill(f32::NEG_INFINITY);
    }

    /// Blends `value` with coverage `alpha` into every pixel center inside
    /// the triangle.
    pub(crate) fn fill_triangle(
        &mut self,
        corners: [ScreenPoint; 3],
        value: f32,
        alpha: f32,
        depth_test: bool,
    ) {
        if alpha <= 0.0 || self.width == 0 || self.height == 0 {
            return;
        }

        let [a, mut b, mut c] = corners;
        let mut area = edge(a, b, c.x, c.y);
        if area.abs() < 1e-12 || !area.is_finite() {
            return;
        }
        if area < 0.0 {
            std::mem::swap(&mut b, &mut c);
            area = -area;
        }

        let Some((x0, x1)) = span(a.x.min(b.x).min(c.x), a.x.max(b.x).max(c.x), self.width) else {
            return;
        };
        let Some((y0, y1)) = span(a.y.min(b.y).min(c.y), a.y.max(b.y).max(c.y), self.height) else {
            return;
        };

        let owns = [owns_edge(b, c), owns_edge(c, a), owns_edge(a, b)];
        for py in y0..=y1 {
            let sy = py as f64 + 0.5;
            for px in x0..=x1 {
                let sx = px as f64 + 0.5;
                let w = [edge(b, c, sx, sy), edge(c, a, sx, sy), edge(a, b, sx, sy)];
                let inside = w
                    .iter()
                    .zip(owns)
                    .all(|(&w, owned)| w > 0.0 || (w == 0.0 && owned));
                if !inside {
                    continue;
                }

                let index = py * self.width + px;
                #[allow(clippy::cast_possible_truncation)]
                let z = ((w[0] * a.z + w[1] * b.z + w[2] * c.z) / area) as f32;
                if depth_test {
                    if z < self.depth[index] {
                        continue;
                    }
                    self.depth[index] = z;
                }
                let dst = self.color[index];
                self.color[index] = alpha * value + (1.0 - alpha) * dst;
            }
        }
    }
}

fn edge(a: ScreenPoint, b: ScreenPoint, x: f64, y: f64) -> f64 {
    (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x)
}

/// Tie-break for pixel centers exactly on an edge. Antisymmetric, so of two
/// triangles sharing an edge only one claims it.
fn owns_edge(a: ScreenPoint, b: ScreenPoint) -> bool {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    dy > 0.0 || (dy == 0.0 && dx > 0.0)
}

/// Inclusive pixel range whose centers may fall inside `[lo, hi]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn span(lo: f64, hi: f64, len: usize) -> Option<(usize, usize)> {
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let first = (lo - 0.5).ceil().max(0.0);
    let last = (hi - 0.5).floor().min(len as f64 - 1.0);
    (first <= last).then(|| (first as usize, last as usize))
}
