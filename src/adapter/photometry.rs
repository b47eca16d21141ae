use crate::render::Image;

use super::{AdapterError, DataAdapter};

/// One photometric measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Julian date of the measurement.
    pub epoch: f64,
    pub magnitude: f64,
    pub sigma: f64,
}

/// Compares the integrated model brightness with observed magnitudes.
///
/// The model magnitude is `-2.5 log10(total flux)` of the frame rendered at
/// each observation's epoch. Observations are kept sorted by epoch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Photometry {
    observations: Vec<Observation>,
}

impl Photometry {
    pub const IDENTIFIER: &'static str = "photometry";

    pub fn new(mut observations: Vec<Observation>) -> Result<Self, AdapterError> {
        for (index, obs) in observations.iter().enumerate() {
            if !(obs.epoch.is_finite() && obs.magnitude.is_finite()) {
                return Err(AdapterError::InvalidObservation(format!(
                    "observation {index} is not finite"
                )));
            }
            if !(obs.sigma.is_finite() && obs.sigma > 0.0) {
                return Err(AdapterError::InvalidObservation(format!(
                    "observation {index} has sigma {}",
                    obs.sigma
                )));
            }
        }
        observations.sort_by(|a, b| a.epoch.total_cmp(&b.epoch));
        Ok(Self { observations })
    }

    /// Observations in epoch order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn model_magnitude(image: &Image) -> Result<f64, AdapterError> {
        let flux = image.total_flux();
        if flux > 0.0 && flux.is_finite() {
            Ok(-2.5 * flux.log10())
        } else {
            Err(AdapterError::EmptyImage)
        }
    }
}

impl DataAdapter for Photometry {
    fn name(&self) -> &str {
        "Photometry"
    }

    fn data_count(&self) -> usize {
        self.observations.len()
    }

    /// Every observation against the same frame.
    fn residuals(&self, image: &Image) -> Result<Vec<f64>, AdapterError> {
        self.residuals_where(image, |_| true)
    }

    fn uncertainties(&self) -> Vec<f64> {
        self.observations.iter().map(|obs| obs.sigma).collect()
    }

    fn epochs(&self) -> Vec<f64> {
        let mut epochs: Vec<f64> = self.observations.iter().map(|obs| obs.epoch).collect();
        epochs.dedup_by(|a, b| a.to_bits() == b.to_bits());
        epochs
    }

    fn residuals_at(&self, epoch: f64, image: &Image) -> Result<Vec<f64>, AdapterError> {
        self.residuals_where(image, |obs| obs.epoch.to_bits() == epoch.to_bits())
    }
}

impl Photometry {
    fn residuals_where(
        &self,
        image: &Image,
        keep: impl Fn(&Observation) -> bool,
    ) -> Result<Vec<f64>, AdapterError> {
        if self.observations.is_empty() {
            return Err(AdapterError::NoData(self.name().to_owned()));
        }
        let model = Self::model_magnitude(image)?;
        Ok(self
            .observations
            .iter()
            .filter(|obs| keep(obs))
            .map(|obs| (model - obs.magnitude) / obs.sigma)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Observation, Photometry};
    use crate::adapter::{evaluate, evaluate_series, AdapterError, DataAdapter};
    use crate::render::{Image, RenderOutput};
    use crate::scene::RenderReport;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    fn obs(magnitude: f64, sigma: f64) -> Observation {
        Observation {
            epoch: 2_450_000.5,
            magnitude,
            sigma,
        }
    }

    #[test]
    fn residuals_are_normalized_by_sigma() {
        // total flux 100 -> magnitude -5
        let image = Image::from_pixels(2, 2, vec![25.0; 4]).unwrap();
        let photometry = Photometry::new(vec![obs(-5.0, 0.1), obs(-4.0, 0.5)]).unwrap();

        let fit = evaluate(&photometry, &image).unwrap();
        assert!(approx_eq(fit.residuals[0], 0.0, 1e-9));
        assert!(approx_eq(fit.residuals[1], -2.0, 1e-9));
        assert_eq!(fit.uncertainties, vec![0.1, 0.5]);
    }

    #[test]
    fn dark_image_has_no_magnitude() {
        let image = Image::from_pixels(1, 1, vec![0.0]).unwrap();
        let photometry = Photometry::new(vec![obs(1.0, 0.1)]).unwrap();
        assert_eq!(photometry.residuals(&image), Err(AdapterError::EmptyImage));
    }

    #[test]
    fn invalid_observations_are_rejected() {
        assert!(Photometry::new(vec![obs(1.0, 0.0)]).is_err());
        assert!(Photometry::new(vec![obs(f64::NAN, 0.1)]).is_err());
        assert_eq!(Photometry::default().data_count(), 0);
    }

    fn at(epoch: f64, magnitude: f64) -> Observation {
        Observation {
            epoch,
            magnitude,
            sigma: 1.0,
        }
    }

    #[test]
    fn observations_are_sorted_into_unique_epochs() {
        let photometry =
            Photometry::new(vec![at(30.0, 1.0), at(10.0, 2.0), at(30.0, 3.0), at(20.0, 4.0)])
                .unwrap();
        let magnitudes: Vec<f64> = photometry.observations().iter().map(|o| o.magnitude).collect();
        assert_eq!(magnitudes, vec![2.0, 4.0, 1.0, 3.0]);
        assert_eq!(photometry.epochs(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn each_epoch_uses_its_own_frame() {
        let frame = |epoch, flux| RenderOutput {
            epoch,
            image: Image::from_pixels(1, 1, vec![flux]).unwrap(),
            report: RenderReport::default(),
        };
        // flux 100 -> -5, flux 10 -> -2.5
        let frames = [frame(1.0, 100.0), frame(2.0, 10.0)];
        let photometry =
            Photometry::new(vec![at(2.0, -2.5), at(1.0, -5.0), at(2.0, -3.5)]).unwrap();

        assert_eq!(photometry.residuals_at(2.0, &frames[1].image).unwrap().len(), 2);
        let fit = evaluate_series(&photometry, &frames).unwrap();
        assert!(approx_eq(fit.residuals[0], 0.0, 1e-9));
        assert!(approx_eq(fit.residuals[1], 0.0, 1e-9));
        assert!(approx_eq(fit.residuals[2], 1.0, 1e-9));
    }
}
