use crate::geom::Vec3;
use crate::params::ParameterSet;

use super::{Position, value};

/// Fixed on-sky offset `{x, y}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionXy {
    params: ParameterSet,
}

impl Default for PositionXy {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionXy {
    pub const IDENTIFIER: &'static str = "xy";

    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::builder()
                .fixed("x", 0.0, -100.0, 100.0)
                .fixed("y", 0.0, -100.0, 100.0)
                .build(),
        }
    }
}

impl Position for PositionXy {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn name(&self) -> &'static str {
        "XY"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    fn offset(&self, _epoch: f64) -> Vec3 {
        Vec3::new(value(&self.params, "x"), value(&self.params, "y"), 0.0)
    }
}

/// Fixed offset `{x, y, z}`; z only matters for occlusion between primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionXyz {
    params: ParameterSet,
}

impl Default for PositionXyz {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionXyz {
    pub const IDENTIFIER: &'static str = "xyz";

    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::builder()
                .fixed("x", 0.0, -100.0, 100.0)
                .fixed("y", 0.0, -100.0, 100.0)
                .fixed("z", 0.0, -100.0, 100.0)
                .build(),
        }
    }
}

impl Position for PositionXyz {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn name(&self) -> &'static str {
        "XYZ"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    fn offset(&self, _epoch: f64) -> Vec3 {
        Vec3::new(
            value(&self.params, "x"),
            value(&self.params, "y"),
            value(&self.params, "z"),
        )
    }
}
