#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]

//! Parametric primitive scenes rendered headlessly and fitted to data.
//!
//! A [`Scene`] holds primitives from the [`registry`], each placed by a
//! [`Position`] that may move with the observation epoch. Their free
//! parameters travel to and from an optimizer as one flat `f64` buffer. The
//! [`Engine`] ties a shared scene to a [`RenderWorker`] and a set of data
//! adapters so one call turns a parameter vector into residuals.

pub mod adapter;
pub mod geom;
pub mod params;
pub mod position;
pub mod primitives;
pub mod registry;
pub mod render;
pub mod scene;

use std::sync::{Arc, Mutex, MutexGuard};

pub use adapter::{AdapterError, DataAdapter, FitEvaluation};
pub use params::{Parameter, ParameterError, ParameterSet};
pub use position::Position;
pub use primitives::{Primitive, PrimitiveError};
pub use registry::{Descriptor, ModelRegistry, RegistryError};
pub use render::{Image, RenderContext, RenderError, RenderOptions, RenderOutput, RenderWorker};
pub use scene::{RenderReport, Scene, SceneError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Render(RenderError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("no data adapters attached")]
    NoAdapters,
}

impl From<RenderError> for EngineError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Scene(err) => Self::Scene(err),
            err => Self::Render(err),
        }
    }
}

/// Shared scene, render worker and data adapters behind one interface.
#[derive(Debug)]
pub struct Engine {
    scene: Arc<Mutex<Scene>>,
    worker: RenderWorker,
    adapters: Vec<Box<dyn DataAdapter>>,
}

impl Engine {
    pub fn new(options: RenderOptions) -> Result<Self, EngineError> {
        Self::with_scene(Scene::new(), options)
    }

    pub fn with_scene(scene: Scene, options: RenderOptions) -> Result<Self, EngineError> {
        let scene = Arc::new(Mutex::new(scene));
        let worker = RenderWorker::spawn(Arc::clone(&scene), options)?;
        Ok(Self {
            scene,
            worker,
            adapters: Vec::new(),
        })
    }

    /// Handle to the shared scene, for callers that edit it directly.
    #[must_use]
    pub fn scene(&self) -> Arc<Mutex<Scene>> {
        Arc::clone(&self.scene)
    }

    #[must_use]
    pub fn render_options(&self) -> &RenderOptions {
        self.worker.options()
    }

    /// Creates a registered primitive and appends it to the scene.
    pub fn add_primitive(&self, identifier: &str) -> Result<usize, EngineError> {
        let primitive = registry::models().create(identifier)?;
        Ok(self.lock()?.add_primitive(primitive))
    }

    /// Swaps the position model of primitive `index` for a fresh
    /// registered one. The buffer layout changes with it.
    pub fn set_position(&self, index: usize, identifier: &str) -> Result<(), EngineError> {
        let position = registry::positions().create(identifier)?;
        self.lock()?.get_mut(index)?.set_placement(position);
        Ok(())
    }

    pub fn add_adapter(&mut self, adapter: Box<dyn DataAdapter>) {
        log::debug!(
            "attaching adapter `{}` with {} data points",
            adapter.name(),
            adapter.data_count()
        );
        self.adapters.push(adapter);
    }

    #[must_use]
    pub fn adapters(&self) -> &[Box<dyn DataAdapter>] {
        &self.adapters
    }

    pub fn free_parameter_count(&self) -> Result<usize, EngineError> {
        Ok(self.lock()?.total_free_parameter_count())
    }

    pub fn parameter_labels(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.lock()?.parameter_labels())
    }

    /// Current free values in buffer order.
    pub fn gather(&self) -> Result<Vec<f64>, EngineError> {
        let scene = self.lock()?;
        let mut buffer = vec![0.0; scene.total_free_parameter_count()];
        scene.gather_parameters(&mut buffer)?;
        Ok(buffer)
    }

    pub fn scatter(&self, buffer: &[f64]) -> Result<(), EngineError> {
        Ok(self.lock()?.scatter_parameters(buffer)?)
    }

    pub fn render(&self) -> Result<RenderOutput, EngineError> {
        Ok(self.worker.render()?)
    }

    /// Applies `buffer`, renders one frame per data epoch, and collects
    /// residuals from every adapter.
    ///
    /// Scatter and rendering run as one step on the worker, so concurrent
    /// calls never see each other's parameters. Time-independent adapters
    /// use the frame at the configured epoch.
    pub fn evaluate(&self, buffer: &[f64]) -> Result<FitEvaluation, EngineError> {
        if self.adapters.is_empty() {
            return Err(EngineError::NoAdapters);
        }
        let reference = self.render_options().epoch;
        let mut epochs: Vec<f64> = Vec::new();
        for adapter in &self.adapters {
            match adapter.epochs() {
                series if series.is_empty() => epochs.push(reference),
                series => epochs.extend(series),
            }
        }
        epochs.sort_by(f64::total_cmp);
        epochs.dedup_by(|a, b| a.to_bits() == b.to_bits());

        let frames = self.worker.scatter_and_render(buffer, &epochs)?;
        let mut evaluation = FitEvaluation::default();
        for data in &self.adapters {
            let data = data.as_ref();
            let fit = if data.epochs().is_empty() {
                let frame = frames
                    .iter()
                    .find(|frame| frame.epoch.to_bits() == reference.to_bits())
                    .ok_or(AdapterError::MissingEpoch(reference))?;
                adapter::evaluate(data, &frame.image)?
            } else {
                adapter::evaluate_series(data, &frames)?
            };
            evaluation.append(fit);
        }
        log::debug!(
            "evaluated {} data points, chi2 {:.6}",
            evaluation.len(),
            evaluation.chi2()
        );
        Ok(evaluation)
    }

    pub fn to_xml(&self) -> Result<String, EngineError> {
        let locked = self.lock()?;
        Ok(scene::persist::to_xml(&locked)?)
    }

    /// Replaces the scene contents with a stored scene.
    pub fn load_xml(&self, xml: &str) -> Result<(), EngineError> {
        let loaded = scene::persist::from_xml(xml, registry::models())?;
        *self.lock()? = loaded;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Scene>, EngineError> {
        self.scene
            .lock()
            .map_err(|_| EngineError::Render(RenderError::Poisoned))
    }
}
