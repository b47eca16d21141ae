use std::f64::consts::TAU;

/// Subdivision counts used when building primitive meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TessellationOptions {
    /// Angular divisions around the symmetry axis.
    pub slices: usize,
    /// Height bands of a lateral surface (latitude bands for spheres).
    pub stacks: usize,
}

impl Default for TessellationOptions {
    fn default() -> Self {
        Self {
            slices: 50,
            stacks: 100,
        }
    }
}

impl TessellationOptions {
    /// Coarse settings for previews and tests.
    pub const PREVIEW: Self = Self {
        slices: 16,
        stacks: 8,
    };

    /// Counts clamped to the minimum that still encloses a volume.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            slices: self.slices.max(3),
            stacks: self.stacks.max(1),
        }
    }
}

/// Precomputed `cos`/`sin` of `slices + 1` evenly spaced angles; the last entry
/// repeats the first so strips close without a special case.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleTable {
    cos: Vec<f64>,
    sin: Vec<f64>,
}

impl CircleTable {
    #[must_use]
    pub fn new(slices: usize) -> Self {
        let slices = slices.max(3);
        let step = TAU / slices as f64;
        let (mut cos, mut sin): (Vec<f64>, Vec<f64>) = (0..slices)
            .map(|i| {
                let (s, c) = (step * i as f64).sin_cos();
                (c, s)
            })
            .unzip();
        cos.push(cos[0]);
        sin.push(sin[0]);
        Self { cos, sin }
    }

    /// Number of angular divisions.
    #[must_use]
    pub fn slices(&self) -> usize {
        self.cos.len() - 1
    }

    /// `(cos, sin)` pairs including the closing repeat.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.cos.iter().copied().zip(self.sin.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::{CircleTable, TessellationOptions};

    #[test]
    fn circle_table_closes_on_itself() {
        let table = CircleTable::new(8);
        assert_eq!(table.slices(), 8);
        let points: Vec<_> = table.iter().collect();
        assert_eq!(points.len(), 9);
        assert_eq!(points[0], points[8]);
        assert!((points[2].0).abs() < 1e-12);
        assert!((points[2].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sanitized_options_have_minimum_counts() {
        let options = TessellationOptions { slices: 0, stacks: 0 }.sanitized();
        assert_eq!(options.slices, 3);
        assert_eq!(options.stacks, 1);
    }
}
