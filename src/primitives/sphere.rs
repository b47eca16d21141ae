use crate::geom::{revolve, CircleTable, GeomMesh, TessellationOptions};
use crate::params::ParameterSet;
use crate::position::Position;

use super::{default_placement, param, require_positive, Primitive, PrimitiveError};

/// Uniform opaque sphere.
#[derive(Debug)]
pub struct Sphere {
    params: ParameterSet,
    placement: Box<dyn Position>,
}

impl Default for Sphere {
    fn default() -> Self {
        Self::new()
    }
}

impl Sphere {
    pub const IDENTIFIER: &'static str = "sphere";

    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::base().free("radius", 0.5, 0.01, 1.0).build(),
            placement: default_placement(),
        }
    }
}

impl Primitive for Sphere {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn name(&self) -> &'static str {
        "Sphere"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    fn placement(&self) -> &dyn Position {
        &*self.placement
    }

    fn placement_mut(&mut self) -> &mut dyn Position {
        &mut *self.placement
    }

    fn set_placement(&mut self, placement: Box<dyn Position>) {
        self.placement = placement;
    }

    fn build_geometry(&self, options: &TessellationOptions) -> Result<GeomMesh, PrimitiveError> {
        let radius = require_positive("radius", param(&self.params, "radius")?)?;
        let options = options.sanitized();
        let table = CircleTable::new(options.slices);
        let mut mesh = GeomMesh::new();
        revolve::sphere(&mut mesh, &table, radius, options.stacks);
        Ok(mesh)
    }
}
