use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nalgebra::Vector3;
use neighbors_rs::harness::{RunOptions, run_primitive};
use neighbors_rs::{Atoms, Neighborhood, Primitive, build_neighborlists};
use std::hint::black_box;

const LATTICE: [[f64; 3]; 3] = [
    [8.60700000e+00, 0.00000000e+00, 0.00000000e+00],
    [8.64636107e-04, 4.95399992e+00, 0.00000000e+00],
    [-3.14318359e+00, 1.38078488e-02, 6.91625732e+00],
];

fn neighborhood() -> Neighborhood {
    let particles = [
        [0.60421912, 4.2840792, 0.67433509],
        [-0.69258171, 3.9731936, 3.49208748],
        [0.32811792, 4.34729737, 6.48343793],
        [4.88477572, 1.81537674, 6.26972558],
        [6.14499816, 1.48505734, 3.37312786],
        [5.12754047, 1.85762907, 0.43572421],
        [2.09507387, 3.66872721, 0.39353504],
        [0.5848138, 0.91854645, 0.28564143],
        [0.33364169, 4.10698461, 2.26790994],
        [-1.14582521, 2.41879964, 3.57784907],
        [0.06571752, 4.4286596, 4.80486228],
        [3.78132323, 0.96146537, 0.19503846],
        [3.29078661, 1.21859679, 6.60654731],
        [4.93953611, 3.49170736, 6.71444093],
        [5.15070623, 1.63464631, 4.60290757],
        [6.60903043, 4.89706872, 3.2209702],
        [5.36681478, 1.95057166, 2.05143108],
        [1.73241622, 3.38087446, 6.78291188],
    ];
    let mut nh = Neighborhood::new();
    nh.update(particles.iter().enumerate().map(|(i, &v)| (i + 1, v)));
    nh.set_lattice(LATTICE).expect("valid lattice");
    nh
}

/// fcc supercell with `n^3` conventional cells.
fn fcc(n: usize, a: f64) -> Atoms {
    let basis = [[0.0, 0.0, 0.0], [0.0, 0.5, 0.5], [0.5, 0.0, 0.5], [0.5, 0.5, 0.0]];
    let mut positions = Vec::new();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                for b in &basis {
                    positions.push(
                        Vector3::new(i as f64 + b[0], j as f64 + b[1], k as f64 + b[2]) * a,
                    );
                }
            }
        }
    }
    let l = n as f64 * a;
    Atoms::new(vec!["Cu".to_string(); positions.len()], positions)
        .with_cell([[l, 0.0, 0.0], [0.0, l, 0.0], [0.0, 0.0, l]], [true; 3])
}

fn bench_neighborhood(c: &mut Criterion) {
    let nh = neighborhood();
    for cutoff in [2.0, 4.0] {
        c.bench_with_input(BenchmarkId::new("neighborhood_neighbors", cutoff), &cutoff, |b, &r| {
            b.iter(|| black_box(nh.neighbors(1, r)))
        });
    }
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbor_list");
    for n in [3, 6] {
        let atoms = fcc(n, 3.61);
        for primitive in [Primitive::Binned, Primitive::Tree] {
            group.bench_with_input(
                BenchmarkId::new(primitive.to_string(), atoms.len()),
                &atoms,
                |b, atoms| b.iter(|| black_box(run_primitive(atoms, 5.0, primitive, RunOptions::default()))),
            );
        }
    }
    group.finish();
}

fn bench_edge_list(c: &mut Criterion) {
    let atoms = fcc(6, 3.61);
    let positions: Vec<[f64; 3]> = atoms.positions.iter().map(|p| [p.x, p.y, p.z]).collect();
    let rows = atoms.cell.expect("periodic supercell");
    c.bench_function("build_neighborlists_864", |b| {
        b.iter(|| black_box(build_neighborlists(&positions, 5.0, Some((&rows, [true; 3])), true)))
    });
}

criterion_group!(benches, bench_neighborhood, bench_primitives, bench_edge_list);
criterion_main!(benches);
