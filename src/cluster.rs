//! Temporal clustering of candidates
//!
//! A real event rarely produces a single trigger above threshold: the same
//! excess power rings up neighboring templates and nearby times. Clustering
//! collapses each chain of temporally-adjacent candidates into the single
//! loudest representative.

/// Cluster candidates over time and return the surviving indices
///
/// `stats` and `times` are parallel sequences over the full candidate set.
/// Candidates are processed in ascending time order; a candidate joins the
/// open cluster while its gap to the cluster's latest member stays within
/// `window` seconds, so clusters chain like merged touching intervals rather
/// than fixed-origin bins. Each cluster keeps its maximum-stat member, ties
/// broken by earliest time, then lowest index.
///
/// Survivors are returned in ascending time order. A non-positive `window`
/// disables clustering: every candidate survives.
///
/// The result is a pure function of the (stat, time) multiset: any input
/// ordering of the same candidates yields the same survivor set.
pub fn cluster_over_time(stats: &[f64], times: &[f64], window: f64) -> Vec<usize> {
    assert_eq!(
        stats.len(),
        times.len(),
        "stat and time sequences must be parallel"
    );

    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| {
        times[a]
            .partial_cmp(&times[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    if window <= 0.0 {
        return order;
    }

    let mut survivors = Vec::new();
    let mut best: Option<usize> = None;
    // Latest time seen in the open cluster; the cluster's right boundary.
    let mut boundary = f64::NEG_INFINITY;

    for &idx in &order {
        match best {
            Some(current) if times[idx] - boundary <= window => {
                // Strict comparison keeps the earliest (and lowest-index)
                // member on exact stat ties.
                if stats[idx] > stats[current] {
                    best = Some(idx);
                }
            }
            Some(current) => {
                survivors.push(current);
                best = Some(idx);
            }
            None => {
                best = Some(idx);
            }
        }
        boundary = times[idx];
    }
    if let Some(current) = best {
        survivors.push(current);
    }
    survivors
}
