//! Parametric surface primitives.
//!
//! Every primitive owns its model parameters (the four base orientation/color
//! entries followed by shape-specific ones) and a [`Position`] model, `xy` by
//! default. In the flat optimizer buffer the free model values come first,
//! then the free position values.

use std::fmt;

use crate::geom::{GeomMesh, TessellationOptions, Transform, Vec3};
use crate::params::{BASE_PARAMETER_COUNT, ParameterError, ParameterSet};
use crate::position::{Position, PositionXy};
use crate::render::RenderContext;

pub mod disk;
pub mod rings;
pub mod sphere;

pub use disk::{Disk, DiskKind, RimProfile};
pub use rings::{ConcentricRings, RingOpacity};
pub use sphere::Sphere;

/// Base parameter indices.
pub const INCLINATION: usize = 0;
pub const POSITION_ANGLE: usize = 1;
pub const ROTATION: usize = 2;
pub const COLOR: usize = 3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PrimitiveError {
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// A renderable parametric model.
///
/// Implementors supply their parameter sets and a local-space mesh; the
/// orientation transform, color lookup, buffer exchange and rasterization
/// are shared.
pub trait Primitive: Send + Sync + fmt::Debug {
    /// Registry identifier of the concrete type.
    fn identifier(&self) -> &'static str;

    /// Human readable name.
    fn name(&self) -> &'static str;

    fn parameters(&self) -> &ParameterSet;

    fn parameters_mut(&mut self) -> &mut ParameterSet;

    fn placement(&self) -> &dyn Position;

    fn placement_mut(&mut self) -> &mut dyn Position;

    /// Swaps the position model; the buffer layout changes with it.
    fn set_placement(&mut self, placement: Box<dyn Position>);

    /// Parameters of the position model.
    fn position(&self) -> &ParameterSet {
        self.placement().parameters()
    }

    fn position_mut(&mut self) -> &mut ParameterSet {
        self.placement_mut().parameters_mut()
    }

    /// Local-space triangle mesh for the current parameter values.
    fn build_geometry(&self, options: &TessellationOptions) -> Result<GeomMesh, PrimitiveError>;

    fn base_parameter_count(&self) -> usize {
        BASE_PARAMETER_COUNT
    }

    /// Wall radius at height `z` of a body with the given half height, band
    /// height `dz` and rim radius. Cylinders keep the rim radius.
    fn radius_profile(&self, _half_height: f64, _z: f64, _dz: f64, rim_radius: f64) -> f64 {
        rim_radius
    }

    /// Opacity of the lateral band starting at `z`.
    fn transparency(&self, _half_height: f64, _z: f64) -> f64 {
        1.0
    }

    /// Whether the primitive depth-tests against its own surfaces.
    fn depth_test(&self) -> bool {
        true
    }

    /// Luminance the primitive is drawn with.
    fn color(&self) -> f64 {
        self.parameters().value(COLOR).unwrap_or(1.0)
    }

    /// `translate(offset(epoch)) * Rx(inclination) * Ry(-position_angle) * Rz(rotation)`.
    fn model_transform(&self, epoch: f64) -> Transform {
        let params = self.parameters();
        let angle = |index| params.value(index).unwrap_or(0.0);

        Transform::translate(self.placement().offset(epoch))
            * Transform::rotate_degrees(Vec3::X, angle(INCLINATION))
            * Transform::rotate_degrees(Vec3::Y, -angle(POSITION_ANGLE))
            * Transform::rotate_degrees(Vec3::Z, angle(ROTATION))
    }

    /// Mesh in scene coordinates at `epoch`.
    fn world_geometry(
        &self,
        options: &TessellationOptions,
        epoch: f64,
    ) -> Result<GeomMesh, PrimitiveError> {
        let mesh = self.build_geometry(options)?;
        Ok(mesh.transformed(&self.model_transform(epoch)))
    }

    /// Draws the primitive at the context's epoch.
    fn render(&self, ctx: &mut RenderContext) -> Result<(), PrimitiveError> {
        let mesh = self.world_geometry(&ctx.options().tessellation, ctx.epoch())?;
        ctx.draw_mesh(&mesh, self.color(), self.depth_test());
        Ok(())
    }

    fn free_parameter_count(&self) -> usize {
        self.parameters().count_free() + self.position().count_free()
    }

    fn write_free_values(&self, buffer: &mut [f64], offset: usize) -> Result<usize, ParameterError> {
        let n = self.parameters().write_free_values(buffer, offset)?;
        let m = self.position().write_free_values(buffer, offset + n)?;
        Ok(n + m)
    }

    /// Validates the incoming values against both sets before storing any.
    fn check_free_values(&self, buffer: &[f64], offset: usize) -> Result<(), ParameterError> {
        let needed = self.free_parameter_count();
        let available = buffer.len();
        let values = buffer
            .get(offset..offset.saturating_add(needed))
            .ok_or(ParameterError::BufferTooSmall {
                needed,
                offset,
                available,
            })?;
        let (model, position) = values.split_at(self.parameters().count_free());
        self.parameters().check_free_values(model)?;
        self.position().check_free_values(position)
    }

    fn read_free_values(&mut self, buffer: &[f64], offset: usize) -> Result<usize, ParameterError> {
        self.check_free_values(buffer, offset)?;
        let n = self.parameters_mut().read_free_values(buffer, offset)?;
        let m = self.position_mut().read_free_values(buffer, offset + n)?;
        Ok(n + m)
    }
}

/// Position model every primitive starts with.
pub(crate) fn default_placement() -> Box<dyn Position> {
    Box::new(PositionXy::new())
}

/// Fails with [`PrimitiveError::DegenerateGeometry`] unless `value > 0`.
pub(crate) fn require_positive(name: &str, value: f64) -> Result<f64, PrimitiveError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(PrimitiveError::DegenerateGeometry(format!(
            "`{name}` must be positive, got {value}"
        )))
    }
}

/// Value of a declared parameter; missing names are reported as out of range.
pub(crate) fn param(set: &ParameterSet, name: &str) -> Result<f64, PrimitiveError> {
    set.value_of(name).ok_or_else(|| {
        PrimitiveError::Parameter(ParameterError::OutOfRange {
            index: set.len(),
            len: set.len(),
        })
    })
}
