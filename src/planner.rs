//! Partitioning of a file into byte-range slices.

use crate::types::{SliceSpec, MAX_CONNECTIONS};
use std::path::Path;

/// Slices of one attempt and the number of connections used to fetch them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    pub connections: usize,
    pub slices: Vec<SliceSpec>,
}

/// Clamps a requested connection count to `1..=MAX_CONNECTIONS`.
pub fn clamp_connections(requested: usize) -> usize {
    requested.clamp(1, MAX_CONNECTIONS)
}

/// Connection count actually used for a file of `total_size` bytes.
///
/// Files below `parallel_threshold` always use a single connection.
pub fn effective_connections(total_size: u64, requested: usize, parallel_threshold: u64) -> usize {
    if total_size < parallel_threshold {
        1
    } else {
        clamp_connections(requested)
    }
}

/// Splits `[0, total_size)` into contiguous slices of `ceil(total_size / connections)`
/// bytes, the last one taking the remainder.
///
/// Temp paths derive from `output`, so planning the same file twice yields the
/// same slices. An empty file yields no slices.
pub fn plan_slices(
    output: &Path,
    total_size: u64,
    requested_connections: usize,
    parallel_threshold: u64,
) -> SlicePlan {
    let connections = effective_connections(total_size, requested_connections, parallel_threshold);
    let chunk_len = total_size.div_ceil(connections as u64);

    let mut slices = Vec::with_capacity(connections);
    let mut start = 0;
    while start < total_size {
        let length = chunk_len.min(total_size - start);
        slices.push(SliceSpec::new(output, start, length));
        start += length;
    }

    SlicePlan {
        connections,
        slices,
    }
}
