use crate::render::Image;

use super::{AdapterError, DataAdapter};

/// Pixel-by-pixel comparison with an observed image of the same size.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceImage {
    width: u32,
    height: u32,
    observed: Vec<f64>,
    sigma: Vec<f64>,
}

impl ReferenceImage {
    pub const IDENTIFIER: &'static str = "image";

    /// Reference with one uncertainty shared by every pixel.
    pub fn new(observed: &Image, sigma: f64) -> Result<Self, AdapterError> {
        let sigma = vec![sigma; observed.pixels().len()];
        Self::with_uncertainties(observed, sigma)
    }

    pub fn with_uncertainties(observed: &Image, sigma: Vec<f64>) -> Result<Self, AdapterError> {
        if sigma.len() != observed.pixels().len() {
            return Err(AdapterError::InvalidObservation(format!(
                "{} uncertainties for {} pixels",
                sigma.len(),
                observed.pixels().len()
            )));
        }
        if let Some(index) = sigma.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(AdapterError::InvalidObservation(format!(
                "pixel {index} has sigma {}",
                sigma[index]
            )));
        }
        let pixels: Vec<f64> = observed.pixels().iter().map(|&v| f64::from(v)).collect();
        if pixels.iter().any(|v| !v.is_finite()) {
            return Err(AdapterError::InvalidObservation(
                "reference image has non-finite pixels".to_owned(),
            ));
        }
        Ok(Self {
            width: observed.width(),
            height: observed.height(),
            observed: pixels,
            sigma,
        })
    }
}

impl DataAdapter for ReferenceImage {
    fn name(&self) -> &str {
        "Reference Image"
    }

    fn data_count(&self) -> usize {
        self.observed.len()
    }

    fn residuals(&self, image: &Image) -> Result<Vec<f64>, AdapterError> {
        if self.observed.is_empty() {
            return Err(AdapterError::NoData(self.name().to_owned()));
        }
        if (image.width(), image.height()) != (self.width, self.height) {
            return Err(AdapterError::SizeMismatch {
                adapter: self.name().to_owned(),
                expected: self.observed.len(),
                actual: image.pixels().len(),
            });
        }
        Ok(image
            .pixels()
            .iter()
            .zip(&self.observed)
            .zip(&self.sigma)
            .map(|((&model, observed), sigma)| (f64::from(model) - observed) / sigma)
            .collect())
    }

    fn uncertainties(&self) -> Vec<f64> {
        self.sigma.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::ReferenceImage;
    use crate::adapter::{evaluate, AdapterError, DataAdapter};
    use crate::render::Image;

    #[test]
    fn identical_images_fit_perfectly() {
        let image = Image::from_pixels(2, 2, vec![0.0, 0.25, 0.5, 1.0]).unwrap();
        let reference = ReferenceImage::new(&image, 0.1).unwrap();
        let fit = evaluate(&reference, &image).unwrap();
        assert_eq!(fit.len(), 4);
        assert_eq!(fit.chi2(), 0.0);
    }

    #[test]
    fn residuals_scale_with_sigma() {
        let observed = Image::from_pixels(2, 1, vec![0.0, 1.0]).unwrap();
        let model = Image::from_pixels(2, 1, vec![0.5, 0.5]).unwrap();
        let reference = ReferenceImage::with_uncertainties(&observed, vec![0.5, 0.25]).unwrap();
        assert_eq!(reference.residuals(&model).unwrap(), vec![1.0, -2.0]);
    }

    #[test]
    fn size_mismatch_and_bad_sigma() {
        let observed = Image::from_pixels(2, 1, vec![0.0, 1.0]).unwrap();
        let reference = ReferenceImage::new(&observed, 1.0).unwrap();
        let other = Image::from_pixels(1, 2, vec![0.0, 1.0]).unwrap();
        assert!(matches!(
            reference.residuals(&other),
            Err(AdapterError::SizeMismatch { .. })
        ));
        assert!(ReferenceImage::new(&observed, -1.0).is_err());
        assert!(ReferenceImage::with_uncertainties(&observed, vec![1.0]).is_err());
    }
}
