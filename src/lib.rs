//! Neighbor search for periodic and isolated atomic structures.
//!
//! Two search primitives share one pair convention: a cell list with
//! Morton-ordered bins ([`search::CellList`]) and a k-d tree over replicated
//! periodic images ([`periodic::ImageTree`]). [`NeighborList`] wraps both
//! with per-atom cutoffs, skin and rebuild-on-motion; [`build_neighborlists`]
//! and [`build_neighborlists_batch`] return flat edge lists.

pub mod api;
pub mod atoms;
pub mod batch;
pub mod cell;
pub mod config;
pub mod error;
pub mod harness;
pub mod io;
pub mod neighborhood;
pub mod neighborlist;
pub mod periodic;
pub mod points;
pub mod search;
pub mod single;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

pub use api::{EdgeList, build_neighborlists, build_neighborlists_batch};
pub use atoms::Atoms;
pub use cell::{Cell, CellError};
pub use error::{NeighborError, Result};
pub use neighborhood::{Neighbor, Neighborhood};
pub use neighborlist::{NeighborList, Primitive};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber. `RUST_LOG` takes precedence over
/// `level`; calling it twice is harmless.
pub fn init_logging(level: Option<String>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_deref().unwrap_or("info")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn get_num_threads() -> usize {
    rayon::current_num_threads()
}

/// Sizes the global rayon pool. Only the first call before any parallel
/// work takes effect; returns whether this one did.
pub fn set_num_threads(n: usize) -> bool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build_global()
        .is_ok()
}
