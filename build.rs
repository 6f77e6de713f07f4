use nalgebra::Vector3;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Instant;
use wide::{CmpLt, f64x4};

/// Default thresholds for one class of build machine.
struct Profile {
    brute_force: usize,
    parallel: usize,
}

const FAST: Profile = Profile {
    brute_force: 1000,
    parallel: 300,
};
const MEDIUM: Profile = Profile {
    brute_force: 800,
    parallel: 256,
};
const SLOW: Profile = Profile {
    brute_force: 400,
    parallel: 128,
};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=NEIGHBORS_BRUTE_FORCE_THRESHOLD");
    println!("cargo:rerun-if-env-changed=NEIGHBORS_PARALLEL_THRESHOLD");

    let (profile, pairs, micros) = calibrate();
    let brute_force = env_override("NEIGHBORS_BRUTE_FORCE_THRESHOLD").unwrap_or(profile.brute_force);
    let parallel = env_override("NEIGHBORS_PARALLEL_THRESHOLD").unwrap_or(profile.parallel);

    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR");
    let dest_path = Path::new(&out_dir).join("tuned_constants.rs");
    let constants = format!(
        "pub const TUNED_BRUTE_FORCE_THRESHOLD: usize = {brute_force};\n\
         pub const TUNED_PARALLEL_THRESHOLD: usize = {parallel};\n"
    );
    fs::write(&dest_path, constants).expect("write tuned constants");

    println!(
        "cargo:warning=Auto-tuning: BRUTE_FORCE_THRESHOLD={brute_force}, PARALLEL_THRESHOLD={parallel} ({pairs} pairs in {micros} us)"
    );
}

fn env_override(name: &str) -> Option<usize> {
    env::var(name).ok()?.trim().parse().ok()
}

/// Times an all-pairs scan over a dense random-like box and picks the
/// profile matching the machine speed.
fn calibrate() -> (Profile, usize, u128) {
    let n_test = 500;
    let pos: Vec<Vector3<f64>> = (0..n_test)
        .map(|i| {
            let x = i as f64 * 0.37;
            Vector3::new(x % 7.0, (x * 1.3) % 7.0, (x * 0.7) % 7.0)
        })
        .collect();

    let rounds = 5;
    let start = Instant::now();
    let mut total = 0;
    for _ in 0..rounds {
        total += count_pairs_simd(&pos, 3.0);
    }
    let micros = (start.elapsed() / rounds).as_micros();

    let profile = if micros < 1000 {
        FAST
    } else if micros > 15000 {
        SLOW
    } else {
        MEDIUM
    };
    (profile, total / rounds as usize, micros)
}

fn count_pairs_simd(positions: &[Vector3<f64>], cutoff: f64) -> usize {
    let n = positions.len();
    let cutoff_sq = cutoff * cutoff;
    let cutoff_sq_v = f64x4::from(cutoff_sq);

    let px: Vec<f64> = positions.iter().map(|p| p.x).collect();
    let py: Vec<f64> = positions.iter().map(|p| p.y).collect();
    let pz: Vec<f64> = positions.iter().map(|p| p.z).collect();

    let mut count = 0;
    for i in 0..n {
        let pix = f64x4::from(px[i]);
        let piy = f64x4::from(py[i]);
        let piz = f64x4::from(pz[i]);
        let mut j = i + 1;
        while j + 4 <= n {
            let dx = f64x4::from(&px[j..j + 4]) - pix;
            let dy = f64x4::from(&py[j..j + 4]) - piy;
            let dz = f64x4::from(&pz[j..j + 4]) - piz;
            let d2 = dx * dx + dy * dy + dz * dz;
            count += d2.cmp_lt(cutoff_sq_v).move_mask().count_ones() as usize;
            j += 4;
        }
        count += (j..n)
            .filter(|&k| {
                let d = Vector3::new(px[k] - px[i], py[k] - py[i], pz[k] - pz[i]);
                d.norm_squared() < cutoff_sq
            })
            .count();
    }
    count
}
