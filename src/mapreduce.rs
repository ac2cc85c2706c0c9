//! External collaborator: the map/reduce runtime.
//!
//! A real deployment's runtime owns worker threads, cross-node
//! scheduling, and shuffle fault-tolerance; the core only assumes an
//! associative reduction over per-chunk results. This module models
//! that single barrier-delimited phase with `rayon`, the same
//! parallel-iterator idiom the teacher uses throughout
//! `clustering/layer.rs` (`par_iter`, `into_par_iter`, `min_by`).

use crate::frame::Chunk;
use rayon::prelude::*;

/// Run `map` over every chunk in parallel, then tree-combine results
/// with the associative `reduce`. `identity` seeds the fold for chunk
/// sets smaller than the thread count and for the empty case.
///
/// This is the sole entry point every task in [`crate::tasks`] uses to
/// fan out across chunks; no task spawns `rayon` parallelism directly.
pub fn map_reduce<T, M, R, I>(chunks: &[Chunk], identity: I, map: M, reduce: R) -> T
where
    T: Send,
    M: Fn(&Chunk) -> T + Sync,
    R: Fn(T, T) -> T + Sync + Send,
    I: Fn() -> T + Sync + Send,
{
    chunks
        .par_iter()
        .map(map)
        .reduce(&identity, |a, b| reduce(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_chunk_lengths() {
        let chunks = vec![Chunk::new(0, 3), Chunk::new(3, 4), Chunk::new(7, 2)];
        let total = map_reduce(&chunks, || 0u64, |c| c.len(), |a, b| a + b);
        assert_eq!(total, 9);
    }

    #[test]
    fn identity_used_for_empty_chunk_set() {
        let chunks: Vec<Chunk> = Vec::new();
        let total = map_reduce(&chunks, || 42u64, |c| c.len(), |a, b| a + b);
        assert_eq!(total, 42);
    }
}
