//! Benchmarks for solver generations and rasterization.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use tri_evolve::{
    compute::{CpuRenderer, Frame, Renderer, evolution::Solver},
    schema::{SolverConfig, Triangle, Vertex},
};

/// Left half red, right half blue.
fn split_target(size: u32) -> Arc<Frame> {
    let mut frame = Frame::filled(size, size, [200, 30, 30, 255]);
    for y in 0..size {
        for x in size / 2..size {
            let i = ((y * size + x) * 4) as usize;
            frame.pixels_mut()[i..i + 4].copy_from_slice(&[30, 30, 200, 255]);
        }
    }
    Arc::new(frame)
}

fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_iteration");

    for size in [32, 64, 128, 256] {
        let config = SolverConfig {
            population_size: 32,
            genome_size: 100,
            random_seed: Some(42),
            ..Default::default()
        };
        let renderer = CpuRenderer::new(config.background);
        let mut solver = Solver::new(config, split_target(size), renderer).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &size,
            |b, _| {
                b.iter(|| {
                    black_box(solver.iteration().unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_render");

    for count in [10, 100, 1000] {
        let triangles: Vec<Triangle> = (0..count)
            .map(|i| {
                let t = i as f32 / count as f32;
                Triangle::new(
                    [
                        Vertex::new(-1.0 + t, -1.0),
                        Vertex::new(1.0, -1.0 + t),
                        Vertex::new(t - 0.5, 1.0),
                    ],
                    [t, 1.0 - t, 0.5, 0.3],
                )
            })
            .collect();
        let mut renderer = CpuRenderer::default();
        let mut frame = Frame::new(128, 128);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_triangles", count)),
            &count,
            |b, _| {
                b.iter(|| {
                    renderer
                        .render_into(black_box(&triangles), &mut frame)
                        .unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_iteration, bench_render);
criterion_main!(benches);
