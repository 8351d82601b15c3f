//! Template bank range partitioning
//!
//! A run processes one slice of the template bank; independent runs over
//! disjoint slices cover the full bank. The slice is either a contiguous
//! block of template indices or, with randomization enabled, a block of a
//! fixed-seed permutation so that each slice samples the bank uniformly.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::ops::Range;

/// Fixed seed for the template-order permutation; every run must derive the
/// same permutation for a given bank size.
const SHUFFLE_SEED: u64 = 0;

/// Parse a partition spec of the form "part/pieces"
///
/// Validated up front as a configuration error: `pieces` must be at least 1
/// and `part` must lie in `[0, pieces)`.
pub fn parse_partition(spec: &str) -> Result<(u32, u32)> {
    let Some((part_str, pieces_str)) = spec.split_once('/') else {
        bail!(
            "Invalid partition spec: {}. Expected format: PART/PIECES",
            spec
        );
    };
    let part: u32 = part_str
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid partition part: {:?}", part_str))?;
    let pieces: u32 = pieces_str
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid partition pieces: {:?}", pieces_str))?;
    if pieces == 0 {
        bail!("Partition pieces must be at least 1");
    }
    if part >= pieces {
        bail!(
            "Partition part {} out of range for {} pieces",
            part,
            pieces
        );
    }
    Ok((part, pieces))
}

/// Half-open index range `[floor(n*part/pieces), floor(n*(part+1)/pieces))`
///
/// The union of ranges over all parts reconstructs `[0, n)` with no overlap
/// and no gap. Out-of-range inputs clamp to an empty range; downstream treats
/// an empty range as "no candidates".
pub fn partition_range(n: usize, part: u32, pieces: u32) -> Range<usize> {
    if pieces == 0 || part >= pieces {
        return 0..0;
    }
    let n = n as u64;
    let start = n * u64::from(part) / u64::from(pieces);
    let end = n * (u64::from(part) + 1) / u64::from(pieces);
    (start as usize)..(end as usize)
}

/// Template ids assigned to one partition
///
/// With `randomize` set, the index set `[0, n)` is first permuted with a
/// fixed seed so partition membership is pseudo-random but reproducible:
/// same seed, same `n`, same permutation.
pub fn template_ids(n: usize, part: u32, pieces: u32, randomize: bool) -> Vec<usize> {
    let range = partition_range(n, part, pieces);
    if !randomize {
        return range.collect();
    }
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
    order.shuffle(&mut rng);
    order[range].to_vec()
}
