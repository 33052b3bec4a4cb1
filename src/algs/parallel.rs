//! Fork-join helpers for element-parallel, read-only workloads.
//!
//! Each task writes a disjoint output slot, so the only synchronization is
//! the final join. With the `rayon` feature disabled every helper runs the
//! same computation serially and returns identical results.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::topology::index::Index;

/// Compute one independent result per element and collect them in element
/// order. The first failure encountered is returned to the caller.
pub fn try_map_elements<R, E, F>(nb_elements: Index, f: F) -> Result<Vec<R>, E>
where
    R: Send,
    E: Send,
    F: Fn(Index) -> Result<R, E> + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        (0..nb_elements).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..nb_elements).map(f).collect()
    }
}

/// Infallible variant of [`try_map_elements`].
pub fn map_elements<R, F>(nb_elements: Index, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(Index) -> R + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        (0..nb_elements).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..nb_elements).map(f).collect()
    }
}

/// Points of a regular 2D grid with `cells[0] x cells[1]` cells.
///
/// Points are ordered x-fastest; there are `(cells[0] + 1) * (cells[1] + 1)`
/// of them. One task per row.
pub fn grid_points_2d(origin: [f64; 2], cells: [Index; 2], spacing: [f64; 2]) -> Vec<[f64; 2]> {
    let nx = cells[0] as usize + 1;
    let ny = cells[1] as usize + 1;
    let mut points = vec![[0.0; 2]; nx * ny];
    let fill_row = |(j, row): (usize, &mut [[f64; 2]])| {
        let y = origin[1] + j as f64 * spacing[1];
        for (i, p) in row.iter_mut().enumerate() {
            *p = [origin[0] + i as f64 * spacing[0], y];
        }
    };
    #[cfg(feature = "rayon")]
    points.par_chunks_mut(nx).enumerate().for_each(fill_row);
    #[cfg(not(feature = "rayon"))]
    points.chunks_mut(nx).enumerate().for_each(fill_row);
    log::debug!("grid_points_2d: {} points", points.len());
    points
}

/// Points of a regular 3D grid, ordered x-fastest then y. One task per
/// z-plane.
pub fn grid_points_3d(origin: [f64; 3], cells: [Index; 3], spacing: [f64; 3]) -> Vec<[f64; 3]> {
    let nx = cells[0] as usize + 1;
    let ny = cells[1] as usize + 1;
    let nz = cells[2] as usize + 1;
    let mut points = vec![[0.0; 3]; nx * ny * nz];
    let fill_plane = |(k, plane): (usize, &mut [[f64; 3]])| {
        let z = origin[2] + k as f64 * spacing[2];
        for (j, row) in plane.chunks_mut(nx).enumerate() {
            let y = origin[1] + j as f64 * spacing[1];
            for (i, p) in row.iter_mut().enumerate() {
                *p = [origin[0] + i as f64 * spacing[0], y, z];
            }
        }
    };
    #[cfg(feature = "rayon")]
    points.par_chunks_mut(nx * ny).enumerate().for_each(fill_plane);
    #[cfg(not(feature = "rayon"))]
    points.chunks_mut(nx * ny).enumerate().for_each(fill_plane);
    log::debug!("grid_points_3d: {} points", points.len());
    points
}
