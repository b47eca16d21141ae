//! Boundary to observational data.
//!
//! An adapter turns a rendered [`Image`] into per-datum residuals and
//! uncertainties. Adapter output is only ever read as numbers: [`evaluate`]
//! and [`evaluate_series`] check its sizes and finiteness before anything
//! else sees it.
//!
//! Time-dependent data reports the epochs it was taken at; it is then
//! compared epoch by epoch against one frame rendered per epoch.

use std::fmt;

use crate::render::{Image, RenderOutput};

mod photometry;
mod reference_image;

pub use photometry::{Observation, Photometry};
pub use reference_image::ReferenceImage;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("`{adapter}` returned {actual} values for {expected} data points")]
    SizeMismatch {
        adapter: String,
        expected: usize,
        actual: usize,
    },
    #[error("`{adapter}` returned a non-finite value at index {index}")]
    NonFinite { adapter: String, index: usize },
    #[error("rendered image has no flux")]
    EmptyImage,
    #[error("`{0}` has no data loaded")]
    NoData(String),
    #[error("invalid observation: {0}")]
    InvalidObservation(String),
    #[error("no frame rendered for epoch {0}")]
    MissingEpoch(f64),
}

pub trait DataAdapter: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Number of data points, and so of residuals and uncertainties.
    fn data_count(&self) -> usize;

    /// Normalized residuals `(model - observed) / sigma`, one per data point.
    fn residuals(&self, image: &Image) -> Result<Vec<f64>, AdapterError>;

    /// One per data point. Time-dependent adapters list them in epoch order.
    fn uncertainties(&self) -> Vec<f64>;

    /// Epochs of the data, ascending and unique. Empty when the data does
    /// not depend on time.
    fn epochs(&self) -> Vec<f64> {
        Vec::new()
    }

    /// Residuals of the data points taken at `epoch`, against the frame
    /// rendered for that epoch.
    fn residuals_at(&self, epoch: f64, image: &Image) -> Result<Vec<f64>, AdapterError> {
        let _ = epoch;
        self.residuals(image)
    }
}

/// Residuals and uncertainties of one or more adapters, concatenated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitEvaluation {
    pub residuals: Vec<f64>,
    pub uncertainties: Vec<f64>,
}

impl FitEvaluation {
    /// Sum of squared residuals.
    #[must_use]
    pub fn chi2(&self) -> f64 {
        self.residuals.iter().map(|r| r * r).sum()
    }

    /// `chi2` divided by the number of data points, 0 when empty.
    #[must_use]
    pub fn reduced_chi2(&self) -> f64 {
        if self.residuals.is_empty() {
            0.0
        } else {
            self.chi2() / self.residuals.len() as f64
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.residuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.residuals.is_empty()
    }

    pub fn append(&mut self, mut other: FitEvaluation) {
        self.residuals.append(&mut other.residuals);
        self.uncertainties.append(&mut other.uncertainties);
    }
}

/// Runs `adapter` on `image` and checks what it returns.
pub fn evaluate(adapter: &dyn DataAdapter, image: &Image) -> Result<FitEvaluation, AdapterError> {
    let expected = adapter.data_count();
    if expected == 0 {
        return Err(AdapterError::NoData(adapter.name().to_owned()));
    }

    let residuals = adapter.residuals(image)?;
    checked(adapter, residuals, expected)
}

/// Runs a time-dependent `adapter` against the frames rendered for its
/// epochs. Residuals come out in epoch order.
pub fn evaluate_series(
    adapter: &dyn DataAdapter,
    frames: &[RenderOutput],
) -> Result<FitEvaluation, AdapterError> {
    let expected = adapter.data_count();
    if expected == 0 {
        return Err(AdapterError::NoData(adapter.name().to_owned()));
    }

    let mut residuals = Vec::with_capacity(expected);
    for epoch in adapter.epochs() {
        let frame = frames
            .iter()
            .find(|frame| frame.epoch.to_bits() == epoch.to_bits())
            .ok_or(AdapterError::MissingEpoch(epoch))?;
        residuals.extend(adapter.residuals_at(epoch, &frame.image)?);
    }
    checked(adapter, residuals, expected)
}

fn checked(
    adapter: &dyn DataAdapter,
    residuals: Vec<f64>,
    expected: usize,
) -> Result<FitEvaluation, AdapterError> {
    let uncertainties = adapter.uncertainties();
    for values in [&residuals, &uncertainties] {
        check_output(adapter.name(), values, expected)?;
    }
    Ok(FitEvaluation {
        residuals,
        uncertainties,
    })
}

fn check_output(adapter: &str, values: &[f64], expected: usize) -> Result<(), AdapterError> {
    if values.len() != expected {
        return Err(AdapterError::SizeMismatch {
            adapter: adapter.to_owned(),
            expected,
            actual: values.len(),
        });
    }
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(AdapterError::NonFinite {
            adapter: adapter.to_owned(),
            index,
        }),
        None => Ok(()),
    }
}
