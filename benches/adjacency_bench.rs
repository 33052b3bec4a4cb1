use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use mesh_attrib::algs::parallel::grid_points_2d;
use mesh_attrib::topology::index::Index;
use mesh_attrib::topology::surface::SurfaceMesh2D;

/// Triangulated `n x n` grid without adjacency.
fn build_grid(n: Index) -> SurfaceMesh2D {
    let mut mesh = SurfaceMesh2D::new();
    let mut builder = mesh.builder();
    for p in grid_points_2d([0.0, 0.0], [n, n], [1.0, 1.0]) {
        builder.create_point(p).unwrap();
    }
    let id = |i: Index, j: Index| i + (n + 1) * j;
    let mut triangles = Vec::with_capacity(2 * (n * n) as usize);
    for j in 0..n {
        for i in 0..n {
            triangles.push([id(i, j), id(i + 1, j), id(i + 1, j + 1)]);
            triangles.push([id(i, j), id(i + 1, j + 1), id(i, j + 1)]);
        }
    }
    builder.create_polygons(&triangles).unwrap();
    mesh
}

fn bench_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("surface_adjacency");
    group.sample_size(20);

    for &n in &[32u32, 128u32] {
        group.bench_with_input(BenchmarkId::new("compute", n), &n, |b, &n| {
            b.iter_batched(
                || build_grid(n),
                |mut mesh| {
                    mesh.builder().compute_polygon_adjacencies().unwrap();
                    black_box(mesh)
                },
                criterion::BatchSize::LargeInput,
            )
        });

        let mut mesh = build_grid(n);
        mesh.builder().compute_polygon_adjacencies().unwrap();
        let center = (n / 2) * (n + 2);
        group.bench_with_input(BenchmarkId::new("polygons_around_vertex", n), &n, |b, _| {
            b.iter(|| black_box(mesh.polygons_around_vertex(center).unwrap()))
        });

        let mask: Vec<bool> = (0..mesh.nb_polygons()).map(|p| p % 7 == 0).collect();
        group.bench_with_input(BenchmarkId::new("delete_polygons", n), &n, |b, _| {
            b.iter_batched(
                || mesh.clone(),
                |mut copy| black_box(copy.builder().delete_polygons(&mask).unwrap()),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_adjacency);
criterion_main!(benches);
