//! Ordered collection of primitives and the flat parameter buffer.
//!
//! Scene order is both the draw order and the order in which each
//! primitive's free values are concatenated into the optimizer buffer.

use std::fmt;

use crate::geom::{GeomMesh, TessellationOptions};
use crate::params::ParameterError;
use crate::primitives::{Primitive, PrimitiveError};
use crate::registry::RegistryError;
use crate::render::RenderContext;

pub mod persist;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("primitive index {index} out of range (scene has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("buffer holds {actual} values but the scene has {expected} free parameters")]
    BufferSizeMismatch { expected: usize, actual: usize },
    #[error("primitive {index}: {source}")]
    Parameter {
        index: usize,
        #[source]
        source: ParameterError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("scene XML error: {0}")]
    Persist(#[from] quick_xml::DeError),
    #[error("stored scene does not match primitive `{identifier}`: {reason}")]
    LayoutMismatch { identifier: String, reason: String },
}

/// Primitive that could not be drawn during [`Scene::render_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPrimitive {
    pub index: usize,
    pub identifier: &'static str,
    pub error: PrimitiveError,
}

/// Outcome of [`Scene::render_all`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderReport {
    pub rendered: usize,
    pub skipped: Vec<SkippedPrimitive>,
}

impl RenderReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    primitives: Vec<Box<dyn Primitive>>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `primitive` and returns its index.
    pub fn add_primitive(&mut self, primitive: Box<dyn Primitive>) -> usize {
        log::debug!("adding `{}` at index {}", primitive.identifier(), self.primitives.len());
        self.primitives.push(primitive);
        self.primitives.len() - 1
    }

    pub fn remove_primitive(&mut self, index: usize) -> Result<Box<dyn Primitive>, SceneError> {
        self.check_index(index)?;
        Ok(self.primitives.remove(index))
    }

    pub fn get(&self, index: usize) -> Result<&dyn Primitive, SceneError> {
        self.check_index(index)?;
        Ok(self.primitives[index].as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut dyn Primitive, SceneError> {
        self.check_index(index)?;
        Ok(self.primitives[index].as_mut())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Primitive> + '_ {
        self.primitives.iter().map(|p| &**p)
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    #[must_use]
    pub fn total_free_parameter_count(&self) -> usize {
        self.iter().map(|p| p.free_parameter_count()).sum()
    }

    /// `"<index>/<name>"` for every free value, in buffer order.
    #[must_use]
    pub fn parameter_labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.total_free_parameter_count());
        for (index, primitive) in self.iter().enumerate() {
            let free = primitive
                .parameters()
                .iter()
                .chain(primitive.position())
                .filter(|p| p.is_free());
            labels.extend(free.map(|p| format!("{index}/{}", p.name())));
        }
        labels
    }

    /// Writes every free value into `buffer`, whose length must equal
    /// [`Self::total_free_parameter_count`].
    pub fn gather_parameters(&self, buffer: &mut [f64]) -> Result<(), SceneError> {
        self.check_buffer(buffer.len())?;
        let mut offset = 0;
        for (index, primitive) in self.iter().enumerate() {
            offset += primitive
                .write_free_values(buffer, offset)
                .map_err(|source| SceneError::Parameter { index, source })?;
        }
        Ok(())
    }

    /// Reads every free value from `buffer`. Nothing changes unless all
    /// values are accepted.
    pub fn scatter_parameters(&mut self, buffer: &[f64]) -> Result<(), SceneError> {
        self.check_buffer(buffer.len())?;

        let mut offset = 0;
        for (index, primitive) in self.iter().enumerate() {
            primitive
                .check_free_values(buffer, offset)
                .map_err(|source| SceneError::Parameter { index, source })?;
            offset += primitive.free_parameter_count();
        }

        let mut offset = 0;
        for (index, primitive) in self.primitives.iter_mut().enumerate() {
            offset += primitive
                .read_free_values(buffer, offset)
                .map_err(|source| SceneError::Parameter { index, source })?;
        }
        Ok(())
    }

    /// Clears `ctx` and draws every primitive in order, placed at the
    /// context's epoch.
    ///
    /// Primitives whose geometry cannot be built are skipped and listed in
    /// the report; the others still render.
    pub fn render_all(&self, ctx: &mut RenderContext) -> RenderReport {
        ctx.clear();
        let tessellation = ctx.options().tessellation;
        let meshes = world_meshes(&self.primitives, &tessellation, ctx.epoch());

        let mut report = RenderReport::default();
        for (index, (primitive, mesh)) in self.iter().zip(meshes).enumerate() {
            match mesh {
                Ok(mesh) => {
                    ctx.draw_mesh(&mesh, primitive.color(), primitive.depth_test());
                    report.rendered += 1;
                }
                Err(error) => {
                    log::warn!(
                        "skipping primitive {index} (`{}`): {error}",
                        primitive.identifier()
                    );
                    report.skipped.push(SkippedPrimitive {
                        index,
                        identifier: primitive.identifier(),
                        error,
                    });
                }
            }
        }
        log::debug!(
            "rendered {} of {} primitives",
            report.rendered,
            self.primitives.len()
        );
        report
    }

    fn check_index(&self, index: usize) -> Result<(), SceneError> {
        if index < self.primitives.len() {
            Ok(())
        } else {
            Err(SceneError::IndexOutOfRange {
                index,
                len: self.primitives.len(),
            })
        }
    }

    fn check_buffer(&self, actual: usize) -> Result<(), SceneError> {
        let expected = self.total_free_parameter_count();
        if actual == expected {
            Ok(())
        } else {
            Err(SceneError::BufferSizeMismatch { expected, actual })
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallel")] {
        use rayon::prelude::*;

        fn world_meshes(
            primitives: &[Box<dyn Primitive>],
            tessellation: &TessellationOptions,
            epoch: f64,
        ) -> Vec<Result<GeomMesh, PrimitiveError>> {
            primitives
                .par_iter()
                .map(|p| p.world_geometry(tessellation, epoch))
                .collect()
        }
    } else {
        fn world_meshes(
            primitives: &[Box<dyn Primitive>],
            tessellation: &TessellationOptions,
            epoch: f64,
        ) -> Vec<Result<GeomMesh, PrimitiveError>> {
            primitives
                .iter()
                .map(|p| p.world_geometry(tessellation, epoch))
                .collect()
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, primitive) in self.iter().enumerate() {
            writeln!(
                f,
                "{index}: {} ({}) at {}",
                primitive.name(),
                primitive.identifier(),
                primitive.placement().name()
            )?;
            for param in primitive.parameters().iter().chain(primitive.position()) {
                writeln!(f, "    {param}")?;
            }
        }
        Ok(())
    }
}
