//! Surfaces of revolution about the local z axis.
//!
//! Primitives compose these building blocks; the shape-specific part is the
//! radius and opacity callbacks handed to [`lateral_surface`].

use super::mesh::GeomMesh;
use super::tessellation::CircleTable;
use super::Point3;

/// Flat disk of `radius` at height `z`, built as a triangle fan.
///
/// The fan faces +z for `z >= 0` and -z otherwise.
pub fn cap(mesh: &mut GeomMesh, table: &CircleTable, radius: f64, z: f64, opacity: f64) {
    let center = mesh.push_vertex(Point3::new(0.0, 0.0, z));
    let ring: Vec<u32> = table
        .iter()
        .map(|(c, s)| mesh.push_vertex(Point3::on_circle(c, s, radius, z)))
        .collect();

    for pair in ring.windows(2) {
        if z >= 0.0 {
            mesh.push_triangle(center, pair[0], pair[1], opacity);
        } else {
            mesh.push_triangle(center, pair[1], pair[0], opacity);
        }
    }
}

/// Flat ring between `inner` and `outer` at height `z`.
pub fn annulus(
    mesh: &mut GeomMesh,
    table: &CircleTable,
    inner: f64,
    outer: f64,
    z: f64,
    opacity: f64,
) {
    let mut previous: Option<(u32, u32)> = None;
    for (c, s) in table.iter() {
        let a = mesh.push_vertex(Point3::on_circle(c, s, inner, z));
        let b = mesh.push_vertex(Point3::on_circle(c, s, outer, z));
        if let Some((pa, pb)) = previous {
            mesh.push_quad(pa, pb, b, a, opacity);
        }
        previous = Some((a, b));
    }
}

/// Lateral wall spanning `-total_height / 2 ..= total_height / 2` in `stacks`
/// equal bands.
///
/// `radius_at(z, dz)` gives the wall radius at a band boundary and
/// `opacity_at(z0)` the opacity of the band starting at `z0`.
pub fn lateral_surface(
    mesh: &mut GeomMesh,
    table: &CircleTable,
    total_height: f64,
    stacks: usize,
    radius_at: impl Fn(f64, f64) -> f64,
    opacity_at: impl Fn(f64) -> f64,
) {
    let stacks = stacks.max(1);
    let half_height = total_height / 2.0;
    let dz = total_height / stacks as f64;

    for band in 0..stacks {
        let z0 = -half_height + dz * band as f64;
        let z1 = if band + 1 == stacks {
            half_height
        } else {
            -half_height + dz * (band + 1) as f64
        };
        let r0 = radius_at(z0, dz);
        let r1 = radius_at(z1, dz);
        let opacity = opacity_at(z0);

        let mut previous: Option<(u32, u32)> = None;
        for (c, s) in table.iter() {
            let lower = mesh.push_vertex(Point3::on_circle(c, s, r0, z0));
            let upper = mesh.push_vertex(Point3::on_circle(c, s, r1, z1));
            if let Some((pl, pu)) = previous {
                mesh.push_quad(pl, lower, upper, pu, opacity);
            }
            previous = Some((lower, upper));
        }
    }
}

/// Latitude/longitude sphere of `radius` centered at the origin.
pub fn sphere(mesh: &mut GeomMesh, table: &CircleTable, radius: f64, stacks: usize) {
    let stacks = stacks.max(2);
    let dtheta = std::f64::consts::PI / stacks as f64;
    let columns = table.slices() + 1;

    let first = u32::try_from(mesh.vertex_count()).unwrap_or(u32::MAX);
    for lat in 0..=stacks {
        let (sin_theta, cos_theta) = (dtheta * lat as f64).sin_cos();
        for (c, s) in table.iter() {
            mesh.push_vertex(Point3::new(
                radius * sin_theta * c,
                radius * sin_theta * s,
                radius * cos_theta,
            ));
        }
    }

    let at = |lat: usize, lon: usize| first + u32::try_from(lat * columns + lon).unwrap_or(u32::MAX);
    for lat in 0..stacks {
        for lon in 0..table.slices() {
            mesh.push_quad(
                at(lat, lon),
                at(lat + 1, lon),
                at(lat + 1, lon + 1),
                at(lat, lon + 1),
                1.0,
            );
        }
    }
}
