//! Keyed factories for primitives, positions and data adapters.
//!
//! A [`Registry`] maps identifiers to zero-argument factories. Registering an
//! entry builds one instance to capture its [`Descriptor`], so per-type facts
//! such as the parameter count are computed once and never change. The
//! process-wide registries are filled once on first use and are read-only
//! afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::adapter::{DataAdapter, Photometry, ReferenceImage};
use crate::position::{LinearMotion, Orbit, Position, PositionXy, PositionXyz};
use crate::primitives::{ConcentricRings, Disk, DiskKind, Primitive, Sphere};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("no entry named `{0}`")]
    UnknownName(String),
    #[error("identifier `{0}` is already registered")]
    DuplicateIdentifier(String),
}

/// Something a [`Registry`] can produce and describe.
pub trait Registrable {
    fn display_name(&self) -> String;

    fn parameter_names(&self) -> Vec<String> {
        Vec::new()
    }
}

impl Registrable for Box<dyn Primitive> {
    fn display_name(&self) -> String {
        self.name().to_owned()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters()
            .names()
            .chain(self.position().names())
            .map(str::to_owned)
            .collect()
    }
}

impl Registrable for Box<dyn Position> {
    fn display_name(&self) -> String {
        self.name().to_owned()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters().names().map(str::to_owned).collect()
    }
}

impl Registrable for Box<dyn DataAdapter> {
    fn display_name(&self) -> String {
        self.name().to_owned()
    }
}

/// Immutable facts about a registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub identifier: String,
    pub name: String,
    pub parameter_names: Vec<String>,
}

impl Descriptor {
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameter_names.len()
    }
}

struct Entry<T> {
    descriptor: Descriptor,
    factory: fn() -> T,
}

pub struct Registry<T> {
    entries: BTreeMap<String, Entry<T>>,
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("identifiers", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Registrable> Registry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `factory` under `identifier`; an existing entry is left untouched.
    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        factory: fn() -> T,
    ) -> Result<&Descriptor, RegistryError> {
        let identifier = identifier.into();
        if self.entries.contains_key(&identifier) {
            return Err(RegistryError::DuplicateIdentifier(identifier));
        }

        let sample = factory();
        let descriptor = Descriptor {
            identifier: identifier.clone(),
            name: sample.display_name(),
            parameter_names: sample.parameter_names(),
        };
        log::debug!(
            "registered `{}` ({}, {} parameters)",
            descriptor.identifier,
            descriptor.name,
            descriptor.parameter_count()
        );

        let entry = self
            .entries
            .entry(identifier)
            .or_insert(Entry { descriptor, factory });
        Ok(&entry.descriptor)
    }

    pub fn create(&self, identifier: &str) -> Result<T, RegistryError> {
        self.entries
            .get(identifier)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| RegistryError::UnknownIdentifier(identifier.to_owned()))
    }

    pub fn create_from_name(&self, name: &str) -> Result<T, RegistryError> {
        let identifier = self.identifier_for_name(name)?;
        self.create(identifier)
    }

    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Display names, ordered by identifier.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.descriptors().map(|d| d.name.as_str())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> + '_ {
        self.entries.values().map(|entry| &entry.descriptor)
    }

    pub fn descriptor(&self, identifier: &str) -> Result<&Descriptor, RegistryError> {
        self.entries
            .get(identifier)
            .map(|entry| &entry.descriptor)
            .ok_or_else(|| RegistryError::UnknownIdentifier(identifier.to_owned()))
    }

    pub fn name_for_identifier(&self, identifier: &str) -> Result<&str, RegistryError> {
        self.descriptor(identifier).map(|d| d.name.as_str())
    }

    /// Looks an entry up by display name, ignoring case and surrounding space.
    pub fn identifier_for_name(&self, name: &str) -> Result<&str, RegistryError> {
        let key = normalize_name(name);
        self.descriptors()
            .find(|d| normalize_name(&d.name) == key)
            .map(|d| d.identifier.as_str())
            .ok_or_else(|| RegistryError::UnknownName(name.to_owned()))
    }
}

pub type ModelRegistry = Registry<Box<dyn Primitive>>;
pub type PositionRegistry = Registry<Box<dyn Position>>;
pub type AdapterRegistry = Registry<Box<dyn DataAdapter>>;

impl Registry<Box<dyn Primitive>> {
    /// Registry holding every built-in primitive.
    ///
    /// # Panics
    /// When two built-ins share an identifier.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let factories: [(&str, fn() -> Box<dyn Primitive>); 6] = [
            (DiskKind::Cylinder.identifier(), || Box::new(Disk::cylinder())),
            (DiskKind::Exponential.identifier(), || Box::new(Disk::exponential())),
            (DiskKind::Gaussian.identifier(), || Box::new(Disk::gaussian())),
            (DiskKind::PowerLaw.identifier(), || Box::new(Disk::power_law())),
            (ConcentricRings::IDENTIFIER, || Box::new(ConcentricRings::new())),
            (Sphere::IDENTIFIER, || Box::new(Sphere::new())),
        ];
        for (identifier, factory) in factories {
            registry
                .register(identifier, factory)
                .expect("built-in primitive identifiers are unique");
        }
        registry
    }
}

impl Registry<Box<dyn Position>> {
    /// Registry holding the built-in position models.
    ///
    /// # Panics
    /// When two built-ins share an identifier.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let factories: [(&str, fn() -> Box<dyn Position>); 4] = [
            (PositionXy::IDENTIFIER, || Box::new(PositionXy::new())),
            (PositionXyz::IDENTIFIER, || Box::new(PositionXyz::new())),
            (Orbit::IDENTIFIER, || Box::new(Orbit::new())),
            (LinearMotion::IDENTIFIER, || Box::new(LinearMotion::new())),
        ];
        for (identifier, factory) in factories {
            registry
                .register(identifier, factory)
                .expect("built-in position identifiers are unique");
        }
        registry
    }
}

impl Registry<Box<dyn DataAdapter>> {
    /// Registry holding the built-in data adapters, each created without data.
    ///
    /// # Panics
    /// When two built-ins share an identifier.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let factories: [(&str, fn() -> Box<dyn DataAdapter>); 2] = [
            (Photometry::IDENTIFIER, || Box::new(Photometry::default())),
            (ReferenceImage::IDENTIFIER, || Box::new(ReferenceImage::default())),
        ];
        for (identifier, factory) in factories {
            registry
                .register(identifier, factory)
                .expect("built-in adapter identifiers are unique");
        }
        registry
    }
}

/// Process-wide primitive registry.
pub fn models() -> &'static ModelRegistry {
    static MODELS: OnceLock<ModelRegistry> = OnceLock::new();
    MODELS.get_or_init(ModelRegistry::with_builtins)
}

/// Process-wide position registry.
pub fn positions() -> &'static PositionRegistry {
    static POSITIONS: OnceLock<PositionRegistry> = OnceLock::new();
    POSITIONS.get_or_init(PositionRegistry::with_builtins)
}

/// Process-wide data adapter registry.
pub fn adapters() -> &'static AdapterRegistry {
    static ADAPTERS: OnceLock<AdapterRegistry> = OnceLock::new();
    ADAPTERS.get_or_init(AdapterRegistry::with_builtins)
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{ModelRegistry, RegistryError, adapters, models, positions};
    use crate::primitives::{Disk, Primitive};

    #[test]
    fn builtins_are_listed_in_sorted_order() {
        let ids: Vec<_> = models().identifiers().collect();
        assert_eq!(
            ids,
            ["cylinder", "disk_a", "disk_b", "disk_c", "disk_concentric_rings", "sphere"]
        );
        let adapters: Vec<_> = adapters().identifiers().collect();
        assert_eq!(adapters, ["image", "photometry"]);
        let positions: Vec<_> = positions().identifiers().collect();
        assert_eq!(positions, ["linear", "orbit", "xy", "xyz"]);
    }

    #[test]
    fn position_descriptors_and_lookup() {
        let orbit = positions().descriptor("orbit").unwrap();
        assert_eq!(orbit.parameter_count(), 7);
        assert_eq!(orbit.parameter_names[4], "eccentricity");
        assert_eq!(positions().identifier_for_name("linear motion").unwrap(), "linear");
        assert_eq!(positions().create("xyz").unwrap().parameters().len(), 3);
    }

    #[test]
    fn duplicate_registration_leaves_registry_unchanged() {
        let mut registry = ModelRegistry::new();
        registry
            .register("cylinder", || Box::new(Disk::cylinder()))
            .unwrap();
        let before: Vec<String> = registry.identifiers().map(str::to_owned).collect();

        let err = registry
            .register("cylinder", || Box::new(Disk::exponential()))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateIdentifier("cylinder".into()));

        let after: Vec<String> = registry.identifiers().map(str::to_owned).collect();
        assert_eq!(before, after);
        assert_eq!(registry.name_for_identifier("cylinder").unwrap(), "Cylinder");
    }

    #[test]
    fn descriptors_capture_parameter_layout() {
        let descriptor = models().descriptor("disk_a").unwrap();
        assert_eq!(descriptor.name, "Disk A");
        assert_eq!(descriptor.parameter_count(), 9);
        assert_eq!(descriptor.parameter_names[6], "decay");
        assert_eq!(descriptor.parameter_names[7], "x");
    }

    #[test]
    fn create_by_identifier_and_name() {
        let disk = models().create("disk_c").unwrap();
        assert_eq!(disk.identifier(), "disk_c");

        let rings = models().create_from_name("  concentric RINGS ").unwrap();
        assert_eq!(rings.identifier(), "disk_concentric_rings");
        assert_eq!(models().identifier_for_name("Sphere").unwrap(), "sphere");
    }

    #[test]
    fn misses_are_reported() {
        assert_eq!(
            models().create("torus").unwrap_err(),
            RegistryError::UnknownIdentifier("torus".into())
        );
        assert_eq!(
            models().identifier_for_name("Torus").unwrap_err(),
            RegistryError::UnknownName("Torus".into())
        );
    }
}
