use super::{Point3, Transform};

/// Triangle mesh produced by a primitive.
///
/// Every triangle carries its own opacity in `[0, 1]`; the primitive's color
/// is applied at rasterization time. Meshes are rebuilt from parameters for
/// each render and never edited in place afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    pub opacity: Vec<f64>,
}

impl GeomMesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, p: Point3) -> u32 {
        let index = u32::try_from(self.positions.len()).unwrap_or(u32::MAX);
        self.positions.push(p.to_array());
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32, opacity: f64) {
        self.indices.extend_from_slice(&[a, b, c]);
        self.opacity.push(opacity.clamp(0.0, 1.0));
    }

    /// Two triangles `a b c` and `a c d`.
    pub fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32, opacity: f64) {
        self.push_triangle(a, b, c, opacity);
        self.push_triangle(a, c, d, opacity);
    }

    /// Concatenates `other`, re-basing its indices.
    pub fn append(&mut self, other: &GeomMesh) {
        let base = u32::try_from(self.positions.len()).unwrap_or(u32::MAX);
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + base));
        self.opacity.extend_from_slice(&other.opacity);
    }

    /// Returns a copy with every vertex mapped through `transform`.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> GeomMesh {
        GeomMesh {
            positions: self
                .positions
                .iter()
                .map(|p| transform.apply_point(Point3::from(*p)).to_array())
                .collect(),
            indices: self.indices.clone(),
            opacity: self.opacity.clone(),
        }
    }

    /// Iterates triangles as `(corners, opacity)`.
    pub fn triangles(&self) -> impl Iterator<Item = ([Point3; 3], f64)> + '_ {
        self.indices
            .chunks_exact(3)
            .zip(self.opacity.iter().copied())
            .map(|(tri, opacity)| {
                let corner = |i: u32| Point3::from(self.positions[i as usize]);
                ([corner(tri[0]), corner(tri[1]), corner(tri[2])], opacity)
            })
    }

    /// Axis-aligned bounds as `(min, max)`, `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<(Point3, Point3)> {
        let mut iter = self.positions.iter().copied().map(Point3::from);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| {
            (
                Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        }))
    }

    #[must_use]
    pub fn has_invalid_vertices(&self) -> bool {
        self.positions
            .iter()
            .any(|p| !Point3::from(*p).is_finite())
    }

    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.positions.len();
        self.indices.iter().all(|&i| (i as usize) < n)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err("mesh indices are not a triangle list (len % 3 != 0)".to_string());
        }
        if self.opacity.len() != self.triangle_count() {
            return Err("mesh opacity buffer does not match triangle count".to_string());
        }
        if self.has_invalid_vertices() {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        if !self.has_valid_indices() {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        if self.opacity.iter().any(|a| !a.is_finite()) {
            return Err("mesh has non-finite opacity values".to_string());
        }
        Ok(())
    }
}
