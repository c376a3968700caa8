//! Per-edge cut collection: validate, deduplicate, order by arc length

use std::collections::HashSet;

use tracing::debug;

use crate::geo::{coord_distance, prefix_lengths};
use crate::model::{Coord, NodeId};

use super::locate::PendingCut;

/// A cut with its arc-length measure on a specific edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cut {
    pub node_id: NodeId,
    pub segment_index: usize,
    pub t: f64,
    pub coord: Coord,
    /// Meters from the edge's first vertex to the cut point
    pub measure_m: f64,
}

/// Order the cuts that apply to one edge.
///
/// Cuts referencing a segment outside the polyline or carrying a non-finite
/// `t` are dropped. Duplicate node ids collapse to their first occurrence in
/// `pending`, then the survivors are sorted by ascending `measure_m`, with
/// `(segment_index, t)` breaking ties.
pub fn order_cuts(coords: &[Coord], pending: &[PendingCut]) -> Vec<Cut> {
    if coords.len() < 2 {
        return Vec::new();
    }

    let prefix = prefix_lengths(coords);
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut cuts = Vec::with_capacity(pending.len());

    for p in pending {
        if p.segment_index >= coords.len() - 1 || !p.t.is_finite() {
            debug!(
                node = p.node_id,
                segment = p.segment_index,
                "dropping cut outside polyline"
            );
            continue;
        }
        if !seen.insert(p.node_id) {
            continue;
        }

        let t = p.t.clamp(0.0, 1.0);
        let segment_len = coord_distance(coords[p.segment_index], coords[p.segment_index + 1]);
        cuts.push(Cut {
            node_id: p.node_id,
            segment_index: p.segment_index,
            t,
            coord: p.coord,
            measure_m: prefix[p.segment_index] + t * segment_len,
        });
    }

    cuts.sort_by(|a, b| {
        a.measure_m
            .total_cmp(&b.measure_m)
            .then(a.segment_index.cmp(&b.segment_index))
            .then(a.t.total_cmp(&b.t))
    });
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(node_id: NodeId, segment_index: usize, t: f64) -> PendingCut {
        PendingCut {
            node_id,
            segment_index,
            t,
            coord: [0.0, 0.0],
        }
    }

    fn line() -> Vec<Coord> {
        vec![[0.0, 0.0], [0.0, 0.001], [0.0, 0.003]]
    }

    #[test]
    fn test_order_is_independent_of_input_order() {
        let a = pending(1, 1, 0.5);
        let b = pending(2, 0, 0.9);
        let c = pending(3, 0, 0.1);

        let forward = order_cuts(&line(), &[a, b, c]);
        let backward = order_cuts(&line(), &[c, b, a]);

        let ids = |cuts: &[Cut]| cuts.iter().map(|c| c.node_id).collect::<Vec<_>>();
        assert_eq!(ids(&forward), vec![3, 2, 1]);
        assert_eq!(ids(&backward), vec![3, 2, 1]);
        assert!(forward.windows(2).all(|w| w[0].measure_m < w[1].measure_m));
    }

    #[test]
    fn test_duplicate_node_first_occurrence_wins() {
        let cuts = order_cuts(&line(), &[pending(5, 1, 0.8), pending(5, 0, 0.2)]);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].segment_index, 1);
        assert!((cuts[0].t - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_measure_uses_prefix_plus_partial() {
        let coords = line();
        let cuts = order_cuts(&coords, &[pending(1, 1, 0.5)]);
        let seg0 = coord_distance(coords[0], coords[1]);
        let seg1 = coord_distance(coords[1], coords[2]);
        assert!((cuts[0].measure_m - (seg0 + 0.5 * seg1)).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_bounds_cut_is_dropped() {
        let cuts = order_cuts(&line(), &[pending(1, 2, 0.5), pending(2, 9, 0.0)]);
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_malformed_first_occurrence_does_not_shadow_valid_one() {
        let cuts = order_cuts(&line(), &[pending(4, 7, 0.5), pending(4, 0, 0.5)]);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].segment_index, 0);
    }
}
