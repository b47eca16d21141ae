//! Named scalar parameters and the ordered sets primitives expose to fitting.
//!
//! The index of a parameter inside its [`ParameterSet`] is its canonical
//! address: free values are copied to and from the optimizer buffer in index
//! order. Every mutator validates its input and leaves the set untouched on
//! failure. Out-of-bounds values are rejected, never clamped.

use std::fmt;

/// Number of orientation/color parameters every primitive starts with.
pub const BASE_PARAMETER_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("parameter index {index} out of range (set has {len} parameters)")]
    OutOfRange { index: usize, len: usize },
    #[error("invalid bounds for `{name}`: [{min}, {max}]")]
    InvalidBounds { name: String, min: f64, max: f64 },
    #[error("value {value} for `{name}` is outside [{min}, {max}]")]
    ValueOutOfBounds {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("value for `{name}` is not finite")]
    NonFinite { name: String },
    #[error("buffer too small: need {needed} values from offset {offset}, have {available}")]
    BufferTooSmall {
        needed: usize,
        offset: usize,
        available: usize,
    },
}

/// One named scalar with bounds and a free/fixed flag.
///
/// Fields are private so the `min <= value <= max` invariant can only be
/// changed through [`ParameterSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: f64,
    free: bool,
    min: f64,
    max: f64,
}

impl Parameter {
    /// Builds a parameter, validating bounds and the initial value.
    pub fn new(
        name: impl Into<String>,
        value: f64,
        min: f64,
        max: f64,
        free: bool,
    ) -> Result<Self, ParameterError> {
        let name = name.into();
        check_bounds(&name, min, max)?;
        check_value(&name, value, min, max)?;
        Ok(Self {
            name,
            value,
            free,
            min,
            max,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.free
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    fn accepts(&self, value: f64) -> Result<(), ParameterError> {
        check_value(&self.name, value, self.min, self.max)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} [{}, {}]{}",
            self.name,
            self.value,
            self.min,
            self.max,
            if self.free { " free" } else { "" }
        )
    }
}

fn check_bounds(name: &str, min: f64, max: f64) -> Result<(), ParameterError> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(ParameterError::InvalidBounds {
            name: name.to_owned(),
            min,
            max,
        });
    }
    Ok(())
}

fn check_value(name: &str, value: f64, min: f64, max: f64) -> Result<(), ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NonFinite {
            name: name.to_owned(),
        });
    }
    if value < min || value > max {
        return Err(ParameterError::ValueOutOfBounds {
            name: name.to_owned(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Ordered parameters of one primitive.
///
/// Sets are assembled with [`ParameterSet::builder`]; once built the count and
/// order are fixed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    #[must_use]
    pub fn builder() -> ParameterSetBuilder {
        ParameterSetBuilder::default()
    }

    /// Orientation and color parameters shared by every primitive.
    #[must_use]
    pub fn base() -> ParameterSetBuilder {
        Self::builder()
            .fixed("inclination", 0.0, -180.0, 180.0)
            .fixed("position_angle", 0.0, -180.0, 180.0)
            .fixed("rotation", 0.0, -180.0, 180.0)
            .fixed("color", 1.0, 0.0, 1.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Parameter, ParameterError> {
        self.params.get(index).ok_or(ParameterError::OutOfRange {
            index,
            len: self.params.len(),
        })
    }

    pub fn value(&self, index: usize) -> Result<f64, ParameterError> {
        self.get(index).map(Parameter::value)
    }

    /// Index of the parameter called `name` (exact match).
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Current value of the parameter called `name`.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.params[i].value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.params.iter()
    }

    pub fn set_value(&mut self, index: usize, value: f64) -> Result<(), ParameterError> {
        let param = self.get_mut(index)?;
        param.accepts(value)?;
        param.value = value;
        Ok(())
    }

    pub fn set_free(&mut self, index: usize, free: bool) -> Result<(), ParameterError> {
        self.get_mut(index)?.free = free;
        Ok(())
    }

    pub fn set_bounds(&mut self, index: usize, min: f64, max: f64) -> Result<(), ParameterError> {
        let param = self.get_mut(index)?;
        check_bounds(&param.name, min, max)?;
        check_value(&param.name, param.value, min, max)?;
        param.min = min;
        param.max = max;
        Ok(())
    }

    /// Replaces value, bounds and free flag of one parameter in one step.
    pub fn assign(
        &mut self,
        index: usize,
        value: f64,
        min: f64,
        max: f64,
        free: bool,
    ) -> Result<(), ParameterError> {
        let param = self.get_mut(index)?;
        check_bounds(&param.name, min, max)?;
        check_value(&param.name, value, min, max)?;
        param.value = value;
        param.min = min;
        param.max = max;
        param.free = free;
        Ok(())
    }

    #[must_use]
    pub fn count_free(&self) -> usize {
        self.params.iter().filter(|p| p.free).count()
    }

    /// Copies free values into `buffer[offset..]` and returns how many were written.
    pub fn write_free_values(
        &self,
        buffer: &mut [f64],
        offset: usize,
    ) -> Result<usize, ParameterError> {
        let slots = self.free_slots(buffer.len(), offset)?;
        let free = self.params.iter().filter(|p| p.free);
        for (slot, param) in buffer[slots].iter_mut().zip(free) {
            *slot = param.value;
        }
        Ok(self.count_free())
    }

    /// Reads free values from `buffer[offset..]` and returns how many were read.
    ///
    /// Every incoming value is checked before any is stored.
    pub fn read_free_values(
        &mut self,
        buffer: &[f64],
        offset: usize,
    ) -> Result<usize, ParameterError> {
        let slots = self.free_slots(buffer.len(), offset)?;
        let incoming = &buffer[slots];
        self.check_free_values(incoming)?;

        let free = self.params.iter_mut().filter(|p| p.free);
        for (param, &value) in free.zip(incoming) {
            param.value = value;
        }
        Ok(incoming.len())
    }

    /// Validates `values` against the free parameters without storing them.
    pub fn check_free_values(&self, values: &[f64]) -> Result<(), ParameterError> {
        self.params
            .iter()
            .filter(|p| p.free)
            .zip(values)
            .try_for_each(|(param, &value)| param.accepts(value))
    }

    fn free_slots(
        &self,
        available: usize,
        offset: usize,
    ) -> Result<std::ops::Range<usize>, ParameterError> {
        let needed = self.count_free();
        let end = offset.checked_add(needed).filter(|&end| end <= available);
        end.map(|end| offset..end)
            .ok_or(ParameterError::BufferTooSmall {
                needed,
                offset,
                available,
            })
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Parameter, ParameterError> {
        let len = self.params.len();
        self.params
            .get_mut(index)
            .ok_or(ParameterError::OutOfRange { index, len })
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// Declares parameters in order. Built-in declarations are static data, so an
/// invalid one is a programming error and `build` panics on it.
#[derive(Debug, Default)]
pub struct ParameterSetBuilder {
    params: Vec<Parameter>,
    error: Option<ParameterError>,
}

impl ParameterSetBuilder {
    #[must_use]
    pub fn free(self, name: &str, value: f64, min: f64, max: f64) -> Self {
        self.push(Parameter::new(name, value, min, max, true))
    }

    #[must_use]
    pub fn fixed(self, name: &str, value: f64, min: f64, max: f64) -> Self {
        self.push(Parameter::new(name, value, min, max, false))
    }

    #[must_use]
    pub fn parameter(self, param: Parameter) -> Self {
        self.push(Ok(param))
    }

    fn push(mut self, param: Result<Parameter, ParameterError>) -> Self {
        match param {
            Ok(param) if self.error.is_none() => self.params.push(param),
            Ok(_) => {}
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Finishes the set, reporting the first invalid declaration.
    pub fn try_build(self) -> Result<ParameterSet, ParameterError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(ParameterSet {
                params: self.params,
            }),
        }
    }

    /// # Panics
    /// When a declaration had invalid bounds or an out-of-bounds default.
    #[must_use]
    pub fn build(self) -> ParameterSet {
        self.try_build()
            .expect("built-in parameter declarations are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::{BASE_PARAMETER_COUNT, Parameter, ParameterError, ParameterSet};

    fn disk_like() -> ParameterSet {
        ParameterSet::base()
            .free("diameter", 3.0, 0.1, 6.0)
            .free("height", 0.5, 0.1, 2.0)
            .build()
    }

    #[test]
    fn base_set_is_fixed_and_ordered() {
        let set = ParameterSet::base().build();
        assert_eq!(set.len(), BASE_PARAMETER_COUNT);
        assert_eq!(set.count_free(), 0);
        let names: Vec<_> = set.names().collect();
        assert_eq!(names, ["inclination", "position_angle", "rotation", "color"]);
        assert_eq!(set.value_of("color"), Some(1.0));
    }

    #[test]
    fn set_value_rejects_out_of_bounds_and_keeps_state() {
        let mut set = disk_like();
        let err = set.set_value(4, 10.0).unwrap_err();
        assert!(matches!(err, ParameterError::ValueOutOfBounds { .. }));
        assert_eq!(set.value(4).unwrap(), 3.0);

        set.set_value(4, 5.5).unwrap();
        assert_eq!(set.value(4).unwrap(), 5.5);
    }

    #[test]
    fn fixed_parameters_are_also_bounded() {
        let mut set = disk_like();
        assert!(matches!(
            set.set_value(0, 500.0),
            Err(ParameterError::ValueOutOfBounds { .. })
        ));
    }

    #[test]
    fn bad_index_and_non_finite_values_fail() {
        let mut set = disk_like();
        assert_eq!(
            set.set_value(17, 1.0),
            Err(ParameterError::OutOfRange { index: 17, len: 6 })
        );
        assert!(matches!(
            set.set_value(4, f64::NAN),
            Err(ParameterError::NonFinite { .. })
        ));
        assert!(set.set_free(6, true).is_err());
    }

    #[test]
    fn set_bounds_validates_order_and_current_value() {
        let mut set = disk_like();
        assert!(matches!(
            set.set_bounds(4, 2.0, 1.0),
            Err(ParameterError::InvalidBounds { .. })
        ));
        assert!(matches!(
            set.set_bounds(4, 0.1, 2.0),
            Err(ParameterError::ValueOutOfBounds { .. })
        ));
        let p = set.get(4).unwrap();
        assert_eq!((p.min(), p.max()), (0.1, 6.0));

        set.set_bounds(4, 1.0, 4.0).unwrap();
        let p = set.get(4).unwrap();
        assert_eq!((p.min(), p.max()), (1.0, 4.0));
    }

    #[test]
    fn free_values_follow_declaration_order() {
        let mut set = disk_like();
        set.set_free(1, true).unwrap();
        set.set_value(1, 30.0).unwrap();
        assert_eq!(set.count_free(), 3);

        let mut buffer = [0.0; 5];
        assert_eq!(set.write_free_values(&mut buffer, 1).unwrap(), 3);
        assert_eq!(buffer, [0.0, 30.0, 3.0, 0.5, 0.0]);
    }

    #[test]
    fn read_is_atomic() {
        let mut set = disk_like();
        let before = set.clone();
        // second value is out of bounds for `height`
        let err = set.read_free_values(&[2.0, 9.0], 0).unwrap_err();
        assert!(matches!(err, ParameterError::ValueOutOfBounds { .. }));
        assert_eq!(set, before);

        assert_eq!(set.read_free_values(&[7.0, 2.0, 1.5], 1).unwrap(), 2);
        assert_eq!(set.value_of("diameter"), Some(2.0));
        assert_eq!(set.value_of("height"), Some(1.5));
    }

    #[test]
    fn short_buffers_are_reported() {
        let set = disk_like();
        let mut buffer = [0.0; 2];
        assert_eq!(
            set.write_free_values(&mut buffer, 1),
            Err(ParameterError::BufferTooSmall {
                needed: 2,
                offset: 1,
                available: 2
            })
        );
    }

    #[test]
    fn assign_applies_whole_record() {
        let mut set = disk_like();
        set.assign(5, 1.8, 0.5, 1.9, false).unwrap();
        let p = set.get(5).unwrap();
        assert_eq!((p.value(), p.min(), p.max(), p.is_free()), (1.8, 0.5, 1.9, false));
        assert!(set.assign(5, 3.0, 0.5, 1.9, true).is_err());
        assert_eq!(set.get(5).unwrap().value(), 1.8);
    }

    #[test]
    fn builder_reports_first_invalid_declaration() {
        let result = ParameterSet::builder()
            .free("a", 5.0, 0.0, 1.0)
            .free("b", 0.0, 2.0, 1.0)
            .try_build();
        assert!(matches!(result, Err(ParameterError::ValueOutOfBounds { .. })));
        assert!(Parameter::new("c", 0.0, f64::NAN, 1.0, true).is_err());
    }
}
