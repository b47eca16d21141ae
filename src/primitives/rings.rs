use crate::geom::{revolve, CircleTable, GeomMesh, TessellationOptions};
use crate::params::ParameterSet;
use crate::position::Position;

use super::{default_placement, param, Primitive, PrimitiveError};

/// Radial and vertical opacity laws of a ring ensemble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingOpacity {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl RingOpacity {
    /// `1 - ((r - r_in) / (r_out - r_in))^alpha`, clamped to `[0, 1]`.
    #[must_use]
    pub fn midplane(&self, r: f64) -> f64 {
        let span = self.outer_radius - self.inner_radius;
        let t = ((r - self.inner_radius) / span).clamp(0.0, 1.0);
        (1.0 - t.powf(self.alpha)).clamp(0.0, 1.0)
    }

    /// `1 - (|z| / hh)^beta`, clamped to `[0, 1]`.
    #[must_use]
    pub fn vertical(&self, half_height: f64, z: f64) -> f64 {
        let t = (z.abs() / half_height).clamp(0.0, 1.0);
        (1.0 - t.powf(self.beta)).clamp(0.0, 1.0)
    }
}

/// Stack of thin cylindrical rings between an inner and an outer radius.
///
/// Each ring contributes a midplane annulus and a vertical wall; the ensemble
/// is drawn without depth testing so the translucent layers accumulate.
#[derive(Debug)]
pub struct ConcentricRings {
    params: ParameterSet,
    placement: Box<dyn Position>,
}

impl Default for ConcentricRings {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcentricRings {
    pub const IDENTIFIER: &'static str = "disk_concentric_rings";

    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::base()
                .free("inner_radius", 0.1, 0.1, 6.0)
                .free("outer_radius", 3.0, 0.1, 6.0)
                .free("height", 0.5, 0.1, 2.0)
                .free("alpha", 1.0, 0.1, 10.0)
                .free("beta", 1.0, 0.1, 10.0)
                .fixed("ring_count", 50.0, 1.0, 200.0)
                .build(),
            placement: default_placement(),
        }
    }

    pub fn opacity(&self) -> Result<RingOpacity, PrimitiveError> {
        Ok(RingOpacity {
            inner_radius: param(&self.params, "inner_radius")?,
            outer_radius: param(&self.params, "outer_radius")?,
            alpha: param(&self.params, "alpha")?,
            beta: param(&self.params, "beta")?,
        })
    }

    /// Number of rings drawn, at least one.
    pub fn ring_count(&self) -> Result<usize, PrimitiveError> {
        let count = param(&self.params, "ring_count")?.ceil().max(1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = count as usize;
        Ok(count)
    }
}

impl Primitive for ConcentricRings {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn name(&self) -> &'static str {
        "Concentric Rings"
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

    fn transparency(&self, half_height: f64, z: f64) -> f64 {
        self.opacity()
            .map_or(1.0, |opacity| opacity.vertical(half_height, z))
    }

    fn depth_test(&self) -> bool {
        false
    }

    fn build_geometry(&self, options: &TessellationOptions) -> Result<GeomMesh, PrimitiveError> {
        let height = param(&self.params, "height")?;
        let opacity = self.opacity()?;
        if height <= 0.0 || opacity.inner_radius < 0.0 || opacity.outer_radius <= opacity.inner_radius
        {
            return Err(PrimitiveError::DegenerateGeometry(format!(
                "rings need height > 0 and 0 <= inner < outer, got height {height}, radii [{}, {}]",
                opacity.inner_radius, opacity.outer_radius
            )));
        }

        let options = options.sanitized();
        let table = CircleTable::new(options.slices);
        let half_height = height / 2.0;
        let rings = self.ring_count()?;
        let dr = (opacity.outer_radius - opacity.inner_radius) / rings as f64;

        let mut mesh = GeomMesh::new();
        for i in 0..rings {
            let r = opacity.inner_radius + dr * i as f64;
            revolve::annulus(&mut mesh, &table, r, r + dr, 0.0, opacity.midplane(r));
            revolve::lateral_surface(
                &mut mesh,
                &table,
                height,
                options.stacks,
                |z, dz| self.radius_profile(half_height, z, dz, r),
                |z0| opacity.vertical(half_height, z0),
            );
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConcentricRings, RingOpacity};
    use crate::geom::TessellationOptions;
    use crate::primitives::{Primitive, PrimitiveError};

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    fn law() -> RingOpacity {
        RingOpacity {
            inner_radius: 1.0,
            outer_radius: 3.0,
            alpha: 2.0,
            beta: 1.0,
        }
    }

    #[test]
    fn midplane_opacity_falls_off_radially() {
        let law = law();
        assert!(approx_eq(law.midplane(1.0), 1.0, 1e-12));
        assert!(approx_eq(law.midplane(2.0), 0.75, 1e-12));
        assert!(approx_eq(law.midplane(3.0), 0.0, 1e-12));
        assert!(approx_eq(law.midplane(10.0), 0.0, 1e-12));
    }

    #[test]
    fn vertical_opacity_falls_off_with_height() {
        let law = law();
        assert!(approx_eq(law.vertical(0.5, 0.0), 1.0, 1e-12));
        assert!(approx_eq(law.vertical(0.5, -0.25), 0.5, 1e-12));
        assert!(approx_eq(law.vertical(0.5, 0.5), 0.0, 1e-12));
    }

    #[test]
    fn ensemble_replaces_disk_parameters() {
        let rings = ConcentricRings::new();
        let names: Vec<_> = rings.parameters().names().skip(4).collect();
        assert_eq!(
            names,
            ["inner_radius", "outer_radius", "height", "alpha", "beta", "ring_count"]
        );
        assert_eq!(rings.free_parameter_count(), 5);
        assert!(!rings.depth_test());
    }

    #[test]
    fn one_annulus_and_wall_per_ring() {
        let mut rings = ConcentricRings::new();
        let index = rings.parameters().index_of("ring_count").unwrap();
        rings.parameters_mut().set_value(index, 2.4).unwrap();
        assert_eq!(rings.ring_count().unwrap(), 3);

        let options = TessellationOptions::PREVIEW;
        let mesh = rings.build_geometry(&options).unwrap();
        let per_ring = 2 * options.slices + 2 * options.slices * options.stacks;
        assert_eq!(mesh.triangle_count(), 3 * per_ring);
        assert!(mesh.validate().is_ok());
        let (_, hi) = mesh.bounds().unwrap();
        assert!(approx_eq(hi.x, 3.0, 1e-9));
    }

    #[test]
    fn inverted_radii_are_degenerate() {
        let mut rings = ConcentricRings::new();
        let outer = rings.parameters().index_of("outer_radius").unwrap();
        rings.parameters_mut().set_value(outer, 0.1).unwrap();
        assert!(matches!(
            rings.build_geometry(&TessellationOptions::PREVIEW),
            Err(PrimitiveError::DegenerateGeometry(_))
        ));
    }
}
