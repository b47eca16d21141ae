use crate::geom::Vec3;
use crate::params::ParameterSet;

use super::{Position, value};

/// Constant acceleration from a reference epoch `t0`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMotion {
    params: ParameterSet,
}

impl Default for LinearMotion {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearMotion {
    pub const IDENTIFIER: &'static str = "linear";

    #[must_use]
    pub fn new() -> Self {
        let mut builder = ParameterSet::builder().fixed("t0", 0.0, 0.0, 3.0e6);
        for axis in ["x", "y", "z"] {
            builder = builder
                .fixed(axis, 0.0, -100.0, 100.0)
                .fixed(&format!("v{axis}"), 0.0, -10.0, 10.0)
                .fixed(&format!("a{axis}"), 0.0, -1.0, 1.0);
        }
        Self {
            params: builder.build(),
        }
    }

    fn axis(&self, axis: &str) -> Vec3 {
        Vec3::new(
            value(&self.params, axis),
            value(&self.params, &format!("v{axis}")),
            value(&self.params, &format!("a{axis}")),
        )
    }
}

impl Position for LinearMotion {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn name(&self) -> &'static str {
        "Linear Motion"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    fn offset(&self, epoch: f64) -> Vec3 {
        let t = epoch - value(&self.params, "t0");
        // (position, velocity, acceleration) per axis
        let along = |axis: &str| self.axis(axis).dot(Vec3::new(1.0, t, 0.5 * t * t));
        Vec3::new(along("x"), along("y"), along("z"))
    }
}

#[cfg(test)]
mod tests {
    use super::LinearMotion;
    use crate::position::Position;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    fn set(motion: &mut LinearMotion, name: &str, v: f64) {
        let params = motion.parameters_mut();
        let index = params.index_of(name).unwrap();
        params.set_value(index, v).unwrap();
    }

    #[test]
    fn moves_from_reference_epoch() {
        let mut motion = LinearMotion::new();
        set(&mut motion, "t0", 100.0);
        set(&mut motion, "x", 1.0);
        set(&mut motion, "vx", 0.5);
        set(&mut motion, "ay", 0.2);

        assert_eq!(motion.offset(100.0).x, 1.0);
        let later = motion.offset(104.0);
        assert!(approx_eq(later.x, 3.0, 1e-12));
        assert!(approx_eq(later.y, 1.6, 1e-12));
        assert_eq!(later.z, 0.0);
    }

    #[test]
    fn declares_ten_parameters() {
        assert_eq!(LinearMotion::new().parameters().len(), 10);
    }
}
