//! Geometric measures over raw coordinates.
//!
//! These are pure functions: meshes gather the coordinates of an element and
//! hand them over, nothing here knows about indices or attributes.
//!
//! Orientation conventions:
//! - 2D polygon areas are signed, positive for counter-clockwise vertices.
//! - 3D polygon normals follow the right-hand rule over the vertex order.
//! - Tetrahedron volumes are signed, positive when `d` lies on the side of
//!   `(a, b, c)` where that triangle appears counter-clockwise.

const EPS: f64 = 1e-12;

#[inline]
fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Euclidean distance between two points.
pub fn distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Mean of `points`; the origin for an empty slice.
pub fn barycenter<const D: usize>(points: &[[f64; D]]) -> [f64; D] {
    let mut out = [0.0; D];
    if points.is_empty() {
        return out;
    }
    for p in points {
        for (o, x) in out.iter_mut().zip(p) {
            *o += x;
        }
    }
    let n = points.len() as f64;
    out.iter_mut().for_each(|o| *o /= n);
    out
}

/// Axis-aligned bounding box `(min, max)`, `None` for an empty slice.
pub fn bounding_box<const D: usize>(points: &[[f64; D]]) -> Option<([f64; D], [f64; D])> {
    let (first, rest) = points.split_first()?;
    let mut min = *first;
    let mut max = *first;
    for p in rest {
        for d in 0..D {
            min[d] = min[d].min(p[d]);
            max[d] = max[d].max(p[d]);
        }
    }
    Some((min, max))
}

/// Signed area of a planar polygon (shoelace formula).
pub fn signed_polygon_area_2d(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a[0] * b[1] - b[0] * a[1]
        })
        .sum();
    0.5 * twice
}

/// Newell normal of a 3D polygon. Its length is twice the polygon area.
pub fn polygon_normal(points: &[[f64; 3]]) -> [f64; 3] {
    let n = points.len();
    let mut normal = [0.0; 3];
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        normal[0] += (a[1] - b[1]) * (a[2] + b[2]);
        normal[1] += (a[2] - b[2]) * (a[0] + b[0]);
        normal[2] += (a[0] - b[0]) * (a[1] + b[1]);
    }
    normal
}

/// Unsigned area of a 3D polygon.
pub fn polygon_area_3d(points: &[[f64; 3]]) -> f64 {
    0.5 * norm(polygon_normal(points))
}

/// Unit normal of a 3D polygon, `None` when it is degenerate.
pub fn polygon_unit_normal(points: &[[f64; 3]]) -> Option<[f64; 3]> {
    let n = polygon_normal(points);
    let len = norm(n);
    if len < EPS {
        return None;
    }
    Some([n[0] / len, n[1] / len, n[2] / len])
}

pub fn tetrahedron_signed_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    dot(cross(sub(b, a), sub(c, a)), sub(d, a)) / 6.0
}

/// Volume of a closed polyhedron with outward facets, each given as local
/// vertex indices into `points`.
///
/// Facets are fanned into triangles and coned to the polyhedron barycenter,
/// so non-planar quadrilateral facets are handled consistently.
pub fn polyhedron_volume<F: AsRef<[u32]>>(points: &[[f64; 3]], facets: &[F]) -> f64 {
    let apex = barycenter(points);
    let mut volume = 0.0;
    for facet in facets {
        let facet = facet.as_ref();
        let Some((&first, rest)) = facet.split_first() else {
            continue;
        };
        for pair in rest.windows(2) {
            volume += tetrahedron_signed_volume(
                points[first as usize],
                points[pair[0] as usize],
                points[pair[1] as usize],
                apex,
            );
        }
    }
    // Outward facets see the interior apex on their negative side.
    -volume
}
