//! Where a primitive sits on the sky.
//!
//! Every primitive owns one [`Position`]. Static positions hold a fixed
//! offset; dynamic ones (orbits, linear motion) move with the observation
//! epoch, given as a Julian date. Offsets are in scene units with x pointing
//! east, y north and z toward the observer.

use std::fmt;

use crate::geom::Vec3;
use crate::params::ParameterSet;

mod cartesian;
mod linear;
mod orbit;

pub use cartesian::{PositionXy, PositionXyz};
pub use linear::LinearMotion;
pub use orbit::{Orbit, eccentric_anomaly};

/// Placement model of a primitive.
pub trait Position: Send + Sync + fmt::Debug {
    /// Registry identifier of the concrete type.
    fn identifier(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn parameters(&self) -> &ParameterSet;

    fn parameters_mut(&mut self) -> &mut ParameterSet;

    /// Offset of the primitive's origin at `epoch`.
    fn offset(&self, epoch: f64) -> Vec3;
}

/// Parameters are declared by the position itself, so a miss only happens on
/// a renamed declaration.
fn value(set: &ParameterSet, name: &str) -> f64 {
    set.value_of(name).unwrap_or(0.0)
}
