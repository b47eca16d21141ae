//! Headless rendering of primitives into a single-channel image.
//!
//! The view is an orthographic projection looking down the scene z axis with
//! x mirrored, so east lies to the left as on the sky. One pixel spans
//! `scale` scene units.

use crate::geom::{GeomMesh, Point3, TessellationOptions};
use crate::scene::SceneError;

mod raster;
pub mod worker;

pub use raster::ScreenPoint;
pub use worker::{RenderOutput, RenderWorker};

use raster::Framebuffer;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid render target: {0}")]
    InvalidTarget(String),
    #[error("render worker is not running")]
    WorkerUnavailable,
    #[error("scene lock poisoned by a panicked thread")]
    Poisoned,
    #[error("failed to start render worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Size and sampling of the render target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Scene units per pixel.
    pub scale: f64,
    pub tessellation: TessellationOptions,
    /// Julian date used when a render does not name one.
    pub epoch: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            scale: 0.05,
            tessellation: TessellationOptions::default(),
            epoch: 0.0,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidTarget(format!(
                "image size {}x{} is empty",
                self.width, self.height
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(RenderError::InvalidTarget(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if !self.epoch.is_finite() {
            return Err(RenderError::InvalidTarget(format!(
                "epoch must be finite, got {}",
                self.epoch
            )));
        }
        Ok(())
    }

    /// Half the field of view along x, in scene units.
    #[must_use]
    pub fn half_width(&self) -> f64 {
        f64::from(self.width) * self.scale / 2.0
    }

    #[must_use]
    pub fn half_height(&self) -> f64 {
        f64::from(self.height) * self.scale / 2.0
    }
}

/// Rendered luminance, row-major with the top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
}

impl Image {
    /// `None` when `pixels` does not hold `width * height` values.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<f32>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Sum of all pixel values.
    #[must_use]
    pub fn total_flux(&self) -> f64 {
        self.pixels.iter().map(|&v| f64::from(v)).sum()
    }

    /// Pixels quantized to 8 bits, for image export.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_luma8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}

/// Render target owned by whoever renders: the framebuffer, its depth buffer
/// and the projection.
#[derive(Debug, Clone)]
pub struct RenderContext {
    options: RenderOptions,
    frame: Framebuffer,
    epoch: f64,
}

impl RenderContext {
    pub fn new(options: RenderOptions) -> Result<Self, RenderError> {
        options.validate()?;
        Ok(Self {
            frame: Framebuffer::new(options.width as usize, options.height as usize),
            epoch: options.epoch,
            options,
        })
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Epoch that moving primitives are placed at.
    #[must_use]
    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn set_epoch(&mut self, epoch: f64) {
        self.epoch = epoch;
    }

    pub fn clear(&mut self) {
        self.frame.clear();
    }

    /// Maps a scene point to pixel space.
    #[must_use]
    pub fn project(&self, p: Point3) -> ScreenPoint {
        let scale = self.options.scale;
        ScreenPoint {
            x: (self.options.half_width() - p.x) / scale,
            y: (self.options.half_height() - p.y) / scale,
            z: p.z,
        }
    }

    /// Rasterizes a scene-space mesh with luminance `color`.
    ///
    /// Depth testing, when enabled, only compares against surfaces of this
    /// same mesh; earlier meshes are always drawn over.
    pub fn draw_mesh(&mut self, mesh: &GeomMesh, color: f64, depth_test: bool) {
        self.frame.clear_depth();
        #[allow(clippy::cast_possible_truncation)]
        let value = color.clamp(0.0, 1.0) as f32;
        for (corners, opacity) in mesh.triangles() {
            #[allow(clippy::cast_possible_truncation)]
            let alpha = opacity as f32;
            let screen = corners.map(|p| self.project(p));
            self.frame.fill_triangle(screen, value, alpha, depth_test);
        }
    }

    /// Copies the current framebuffer out.
    #[must_use]
    pub fn read_back(&self) -> Image {
        Image {
            width: self.options.width,
            height: self.options.height,
            pixels: self.frame.color().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Image, RenderContext, RenderError, RenderOptions};
    use crate::geom::{GeomMesh, Point3};

    fn options() -> RenderOptions {
        RenderOptions {
            width: 16,
            height: 16,
            scale: 0.25,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn empty_or_unscaled_targets_are_rejected() {
        let zero = RenderOptions {
            width: 0,
            ..options()
        };
        assert!(matches!(RenderContext::new(zero), Err(RenderError::InvalidTarget(_))));
        let flat = RenderOptions {
            scale: 0.0,
            ..options()
        };
        assert!(matches!(RenderContext::new(flat), Err(RenderError::InvalidTarget(_))));
        let timeless = RenderOptions {
            epoch: f64::NAN,
            ..options()
        };
        assert!(matches!(RenderContext::new(timeless), Err(RenderError::InvalidTarget(_))));
    }

    #[test]
    fn context_starts_at_the_configured_epoch() {
        let mut ctx = RenderContext::new(RenderOptions {
            epoch: 2_455_000.5,
            ..options()
        })
        .unwrap();
        assert_eq!(ctx.epoch(), 2_455_000.5);
        ctx.set_epoch(12.0);
        assert_eq!(ctx.epoch(), 12.0);
    }

    #[test]
    fn projection_mirrors_x() {
        let ctx = RenderContext::new(options()).unwrap();
        let center = ctx.project(Point3::ORIGIN);
        assert_eq!((center.x, center.y), (8.0, 8.0));
        let east = ctx.project(Point3::new(1.0, 1.0, 0.0));
        assert_eq!((east.x, east.y), (4.0, 4.0));
    }

    #[test]
    fn mesh_lands_on_the_mirrored_side() {
        let mut ctx = RenderContext::new(options()).unwrap();
        let mut mesh = GeomMesh::new();
        let a = mesh.push_vertex(Point3::new(0.5, -1.0, 0.0));
        let b = mesh.push_vertex(Point3::new(1.5, -1.0, 0.0));
        let c = mesh.push_vertex(Point3::new(1.5, 1.0, 0.0));
        let d = mesh.push_vertex(Point3::new(0.5, 1.0, 0.0));
        mesh.push_quad(a, b, c, d, 1.0);
        ctx.draw_mesh(&mesh, 0.8, true);

        let image = ctx.read_back();
        // +x maps to pixel columns 2..6
        assert!((image.get(3, 8).unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(image.get(12, 8), Some(0.0));
        assert!((image.total_flux() - 0.8 * 4.0 * 8.0).abs() < 1e-4);

        ctx.clear();
        assert_eq!(ctx.read_back().total_flux(), 0.0);
    }

    #[test]
    fn image_accessors() {
        assert!(Image::from_pixels(2, 2, vec![0.0; 3]).is_none());
        let image = Image::from_pixels(2, 1, vec![0.5, 2.0]).unwrap();
        assert_eq!(image.to_luma8(), vec![128, 255]);
        assert_eq!(image.get(2, 0), None);
    }
}
