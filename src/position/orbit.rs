use std::f64::consts::{PI, TAU};

use crate::geom::Vec3;
use crate::params::ParameterSet;

use super::{Position, value};

const KEPLER_MAX_ITERATIONS: usize = 50;
const KEPLER_TOLERANCE: f64 = 1e-12;

/// Bound Keplerian orbit around the scene origin.
///
/// Angles are in degrees, the semi-major axis in scene units and times in
/// days. Eccentricity stays below 1, so the orbit is always closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    params: ParameterSet,
}

impl Default for Orbit {
    fn default() -> Self {
        Self::new()
    }
}

impl Orbit {
    pub const IDENTIFIER: &'static str = "orbit";

    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::builder()
                .fixed("ascending_node", 0.0, 0.0, 360.0)
                .fixed("inclination", 0.0, 0.0, 360.0)
                .fixed("periastron_argument", 0.0, 0.0, 360.0)
                .fixed("semi_major_axis", 0.0, 0.0, 10.0)
                .fixed("eccentricity", 0.0, 0.0, 0.99)
                .fixed("periastron_time", 0.0, 0.0, 3.0e6)
                .fixed("period", 1.0, 0.01, 1.0e5)
                .build(),
        }
    }
}

impl Position for Orbit {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn name(&self) -> &'static str {
        "Orbit"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    /// Thiele-Innes projection of the orbit (Roy, *Orbital Motion*).
    fn offset(&self, epoch: f64) -> Vec3 {
        let p = |name| value(&self.params, name);
        let (s_node, c_node) = p("ascending_node").to_radians().sin_cos();
        let (s_inc, c_inc) = p("inclination").to_radians().sin_cos();
        let (s_arg, c_arg) = p("periastron_argument").to_radians().sin_cos();
        let a = p("semi_major_axis");
        let e = p("eccentricity");

        let mean_motion = TAU / p("period");
        let mean_anomaly = mean_motion * (epoch - p("periastron_time"));
        let (sin_e, cos_e) = eccentric_anomaly(mean_anomaly, e).sin_cos();
        let beta = (1.0 - e * e).sqrt();

        let l1 = c_node * c_arg - s_node * s_arg * c_inc;
        let m1 = s_node * c_arg + c_node * s_arg * c_inc;
        let n1 = s_arg * s_inc;
        let l2 = -c_node * s_arg - s_node * c_arg * c_inc;
        let m2 = -s_node * s_arg + c_node * c_arg * c_inc;
        let n2 = c_arg * s_inc;

        let along = |c1: f64, c2: f64| a * (c1 * cos_e + beta * c2 * sin_e - e * c1);
        let north = along(l1, l2);
        let east = along(m1, m2);
        Vec3::new(east, north, along(n1, n2))
    }
}

/// Solves Kepler's equation `M = E - e sin E` for `E` by Newton iteration.
#[must_use]
pub fn eccentric_anomaly(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let m = mean_anomaly.rem_euclid(TAU);
    let e = eccentricity;
    let mut anomaly = if e > 0.8 { PI } else { m };
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let step = (anomaly - e * anomaly.sin() - m) / (1.0 - e * anomaly.cos());
        anomaly -= step;
        if step.abs() < KEPLER_TOLERANCE {
            break;
        }
    }
    anomaly
}

#[cfg(test)]
mod tests {
    use super::{Orbit, eccentric_anomaly};
    use crate::position::Position;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    fn orbit(values: &[(&str, f64)]) -> Orbit {
        let mut orbit = Orbit::new();
        for &(name, v) in values {
            let params = orbit.parameters_mut();
            let index = params.index_of(name).unwrap();
            params.set_value(index, v).unwrap();
        }
        orbit
    }

    #[test]
    fn kepler_solution_satisfies_equation() {
        for &e in &[0.0, 0.3, 0.9, 0.99] {
            for &m in &[0.1, 1.0, 3.0, 5.5] {
                let big_e = eccentric_anomaly(m, e);
                assert!(approx_eq(big_e - e * big_e.sin(), m, 1e-10), "e={e} M={m}");
            }
        }
    }

    #[test]
    fn circular_face_on_orbit_starts_north() {
        let orbit = orbit(&[("semi_major_axis", 2.0), ("period", 10.0)]);

        let start = orbit.offset(0.0);
        assert!(approx_eq(start.x, 0.0, 1e-12));
        assert!(approx_eq(start.y, 2.0, 1e-12));

        // a quarter period later the companion is due east
        let quarter = orbit.offset(2.5);
        assert!(approx_eq(quarter.x, 2.0, 1e-9));
        assert!(approx_eq(quarter.y, 0.0, 1e-9));

        // a full period returns to the start
        let full = orbit.offset(10.0);
        assert!(approx_eq(full.y, start.y, 1e-9));
    }

    #[test]
    fn eccentric_orbit_starts_at_periastron() {
        let orbit = orbit(&[
            ("semi_major_axis", 1.0),
            ("eccentricity", 0.5),
            ("periastron_time", 100.0),
        ]);
        let peri = orbit.offset(100.0);
        assert!(approx_eq(peri.y, 0.5, 1e-12));
        let apo = orbit.offset(100.5);
        assert!(approx_eq(apo.y, -1.5, 1e-9));
    }

    #[test]
    fn edge_on_orbit_moves_along_line_of_sight() {
        let orbit = orbit(&[
            ("semi_major_axis", 1.0),
            ("inclination", 90.0),
            ("period", 4.0),
        ]);
        let quarter = orbit.offset(1.0);
        assert!(approx_eq(quarter.x, 0.0, 1e-9));
        assert!(approx_eq(quarter.z, 1.0, 1e-9));
    }
}
