use std::sync::atomic::{AtomicUsize, Ordering};

// Defaults calibrated by build.rs for the build machine.
include!(concat!(env!("OUT_DIR"), "/tuned_constants.rs"));

static BRUTE_FORCE_THRESHOLD: AtomicUsize = AtomicUsize::new(TUNED_BRUTE_FORCE_THRESHOLD);
static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(TUNED_PARALLEL_THRESHOLD);

/// Systems smaller than this use the minimum-image brute force search when
/// the cutoff allows it.
pub fn get_brute_force_threshold() -> usize {
    BRUTE_FORCE_THRESHOLD.load(Ordering::Relaxed)
}

pub fn set_brute_force_threshold(val: usize) {
    BRUTE_FORCE_THRESHOLD.store(val, Ordering::Relaxed);
}

/// Systems at least this large are searched with rayon.
pub fn get_parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

pub fn set_parallel_threshold(val: usize) {
    PARALLEL_THRESHOLD.store(val, Ordering::Relaxed);
}
