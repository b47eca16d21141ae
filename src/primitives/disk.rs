//! Cylinder and rim-profile disks.
//!
//! All variants share the `diameter`/`height` parameters and the same mesh
//! layout; they differ only in the [`RimProfile`] evaluated along the wall.

use crate::geom::{revolve, CircleTable, GeomMesh, TessellationOptions};
use crate::params::ParameterSet;
use crate::position::Position;

use super::{default_placement, param, require_positive, Primitive, PrimitiveError};

/// Height-dependent wall radius of a disk.
///
/// `h = |z|` is clamped below to the band height `dz` before evaluation so the
/// logarithmic and power-law forms stay finite at the midplane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RimProfile {
    Cylinder,
    /// `rim - k * ln(h / hh)`
    Exponential { decay: f64 },
    /// `rim + sqrt(-2 k^2 ln(h / hh))`
    Gaussian { decay: f64 },
    /// `rim * (hh / h)^beta`
    PowerLaw { beta: f64 },
}

impl RimProfile {
    #[must_use]
    pub fn radius(self, half_height: f64, z: f64, dz: f64, rim_radius: f64) -> f64 {
        let h = z.abs().max(dz);
        match self {
            Self::Cylinder => rim_radius,
            Self::Exponential { decay } => rim_radius - decay * (h / half_height).ln(),
            Self::Gaussian { decay } => {
                let arg = -2.0 * decay * decay * (h / half_height).ln();
                rim_radius + arg.max(0.0).sqrt()
            }
            Self::PowerLaw { beta } => rim_radius * (half_height / h).powf(beta),
        }
    }
}

/// Which rim profile a [`Disk`] uses, and how it is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiskKind {
    Cylinder,
    Exponential,
    Gaussian,
    PowerLaw,
}

impl DiskKind {
    pub const ALL: [Self; 4] = [
        Self::Cylinder,
        Self::Exponential,
        Self::Gaussian,
        Self::PowerLaw,
    ];

    #[must_use]
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Cylinder => "cylinder",
            Self::Exponential => "disk_a",
            Self::Gaussian => "disk_b",
            Self::PowerLaw => "disk_c",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cylinder => "Cylinder",
            Self::Exponential => "Disk A",
            Self::Gaussian => "Disk B",
            Self::PowerLaw => "Disk C",
        }
    }

    /// Name of the profile coefficient appended after `height`.
    #[must_use]
    pub fn coefficient(self) -> Option<&'static str> {
        match self {
            Self::Cylinder => None,
            Self::Exponential | Self::Gaussian => Some("decay"),
            Self::PowerLaw => Some("beta"),
        }
    }

    fn parameters(self) -> ParameterSet {
        let builder = ParameterSet::base()
            .free("diameter", 3.0, 0.1, 6.0)
            .free("height", 0.5, 0.1, 2.0);
        match self.coefficient() {
            Some(name) => builder.free(name, 0.05, 0.01, 2.0).build(),
            None => builder.build(),
        }
    }
}

#[derive(Debug)]
pub struct Disk {
    kind: DiskKind,
    params: ParameterSet,
    placement: Box<dyn Position>,
}

impl Disk {
    #[must_use]
    pub fn new(kind: DiskKind) -> Self {
        Self {
            kind,
            params: kind.parameters(),
            placement: default_placement(),
        }
    }

    #[must_use]
    pub fn cylinder() -> Self {
        Self::new(DiskKind::Cylinder)
    }

    #[must_use]
    pub fn exponential() -> Self {
        Self::new(DiskKind::Exponential)
    }

    #[must_use]
    pub fn gaussian() -> Self {
        Self::new(DiskKind::Gaussian)
    }

    #[must_use]
    pub fn power_law() -> Self {
        Self::new(DiskKind::PowerLaw)
    }

    #[must_use]
    pub fn kind(&self) -> DiskKind {
        self.kind
    }

    /// Profile built from the current coefficient value.
    #[must_use]
    pub fn rim_profile(&self) -> RimProfile {
        let coefficient = self
            .kind
            .coefficient()
            .and_then(|name| self.params.value_of(name))
            .unwrap_or(0.0);
        match self.kind {
            DiskKind::Cylinder => RimProfile::Cylinder,
            DiskKind::Exponential => RimProfile::Exponential { decay: coefficient },
            DiskKind::Gaussian => RimProfile::Gaussian { decay: coefficient },
            DiskKind::PowerLaw => RimProfile::PowerLaw { beta: coefficient },
        }
    }
}

impl Primitive for Disk {
    fn identifier(&self) -> &'static str {
        self.kind.identifier()
    }

    fn name(&self) -> &'static str {
        self.kind.name()
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

    fn radius_profile(&self, half_height: f64, z: f64, dz: f64, rim_radius: f64) -> f64 {
        self.rim_profile().radius(half_height, z, dz, rim_radius)
    }

    fn build_geometry(&self, options: &TessellationOptions) -> Result<GeomMesh, PrimitiveError> {
        let diameter = require_positive("diameter", param(&self.params, "diameter")?)?;
        let height = require_positive("height", param(&self.params, "height")?)?;
        let options = options.sanitized();
        let table = CircleTable::new(options.slices);
        let rim = diameter / 2.0;
        let half_height = height / 2.0;

        let mut mesh = GeomMesh::new();
        revolve::cap(&mut mesh, &table, rim, half_height, 1.0);
        revolve::lateral_surface(
            &mut mesh,
            &table,
            height,
            options.stacks,
            |z, dz| self.radius_profile(half_height, z, dz, rim),
            |z0| self.transparency(half_height, z0),
        );
        revolve::cap(&mut mesh, &table, rim, -half_height, 1.0);

        if mesh.has_invalid_vertices() {
            return Err(PrimitiveError::DegenerateGeometry(format!(
                "{} profile produced non-finite radii",
                self.kind.name()
            )));
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::{Disk, DiskKind, RimProfile};
    use crate::geom::TessellationOptions;
    use crate::primitives::{Primitive, PrimitiveError};

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn cylinder_ignores_height() {
        let profile = RimProfile::Cylinder;
        assert_eq!(profile.radius(0.25, 0.0, 0.01, 1.5), 1.5);
        assert_eq!(profile.radius(0.25, 0.2, 0.01, 1.5), 1.5);
    }

    #[test]
    fn exponential_profile_is_rim_at_half_height() {
        let profile = RimProfile::Exponential { decay: 0.05 };
        assert!(approx_eq(profile.radius(0.25, 0.25, 0.01, 1.0), 1.0, 1e-12));
        assert!(approx_eq(profile.radius(0.25, -0.25, 0.01, 1.0), 1.0, 1e-12));
    }

    #[test]
    fn heights_below_band_height_are_clamped() {
        let profile = RimProfile::Exponential { decay: 0.05 };
        let clamped = profile.radius(0.25, 0.001, 0.01, 1.0);
        assert!(approx_eq(clamped, profile.radius(0.25, 0.01, 0.01, 1.0), 1e-15));
        assert!(approx_eq(clamped, 1.0 - 0.05 * (0.04_f64).ln(), 1e-12));
        assert!(clamped.is_finite());
        assert!(RimProfile::PowerLaw { beta: 1.0 }.radius(1.0, 0.0, 0.1, 1.0).is_finite());
    }

    #[test]
    fn power_law_profile() {
        let profile = RimProfile::PowerLaw { beta: 1.0 };
        assert!(approx_eq(profile.radius(1.0, 0.5, 0.01, 2.0), 4.0, 1e-12));
    }

    #[test]
    fn gaussian_profile_grows_towards_midplane() {
        let profile = RimProfile::Gaussian { decay: 0.1 };
        assert!(approx_eq(profile.radius(1.0, 1.0, 0.01, 1.0), 1.0, 1e-12));
        let expected = 1.0 + (-2.0 * 0.01 * (0.5_f64).ln()).sqrt();
        assert!(approx_eq(profile.radius(1.0, 0.5, 0.01, 1.0), expected, 1e-12));
    }

    #[test]
    fn variants_append_one_free_coefficient() {
        assert_eq!(Disk::cylinder().parameters().len(), 6);
        assert_eq!(Disk::cylinder().free_parameter_count(), 2);
        for kind in [DiskKind::Exponential, DiskKind::Gaussian, DiskKind::PowerLaw] {
            let disk = Disk::new(kind);
            assert_eq!(disk.parameters().len(), 7);
            assert_eq!(disk.free_parameter_count(), 3);
        }
        assert_eq!(Disk::power_law().parameters().value_of("beta"), Some(0.05));
    }

    #[test]
    fn rim_profile_tracks_parameter_changes() {
        let mut disk = Disk::exponential();
        let index = disk.parameters().index_of("decay").unwrap();
        disk.parameters_mut().set_value(index, 0.5).unwrap();
        assert_eq!(disk.rim_profile(), RimProfile::Exponential { decay: 0.5 });
    }

    #[test]
    fn geometry_spans_height_and_rim() {
        let disk = Disk::cylinder();
        let mesh = disk.build_geometry(&TessellationOptions::PREVIEW).unwrap();
        assert!(mesh.validate().is_ok());
        let (lo, hi) = mesh.bounds().unwrap();
        assert!(approx_eq(hi.z, 0.25, 1e-12));
        assert!(approx_eq(lo.z, -0.25, 1e-12));
        assert!(approx_eq(hi.x, 1.5, 1e-12));
        // two fans plus the lateral bands
        let slices = TessellationOptions::PREVIEW.slices;
        let stacks = TessellationOptions::PREVIEW.stacks;
        assert_eq!(mesh.triangle_count(), 2 * slices + 2 * slices * stacks);
    }

    #[test]
    fn flared_disk_is_wider_at_midplane() {
        let disk = Disk::exponential();
        let mesh = disk.build_geometry(&TessellationOptions::PREVIEW).unwrap();
        let (_, hi) = mesh.bounds().unwrap();
        assert!(hi.x > 1.5);
    }

    #[test]
    fn geometry_is_deterministic() {
        let disk = Disk::gaussian();
        let options = TessellationOptions::PREVIEW;
        assert_eq!(
            disk.build_geometry(&options).unwrap(),
            disk.build_geometry(&options).unwrap()
        );
    }

    #[test]
    fn zero_diameter_is_degenerate() {
        let mut disk = Disk::cylinder();
        let index = disk.parameters().index_of("diameter").unwrap();
        disk.parameters_mut().set_bounds(index, 0.0, 6.0).unwrap();
        disk.parameters_mut().set_value(index, 0.0).unwrap();
        assert!(matches!(
            disk.build_geometry(&TessellationOptions::default()),
            Err(PrimitiveError::DegenerateGeometry(_))
        ));
    }
}
