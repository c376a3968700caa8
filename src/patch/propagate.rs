//! Mirror cuts on two-way edges onto their reverse-direction edges

use std::collections::{BTreeMap, HashMap};

use crate::model::{BaseEdge, NodeId};

use super::locate::{locate_cut, PendingCut};

/// Base edge indices keyed by directed `(u, v)`
pub fn index_by_endpoints(edges: &[BaseEdge]) -> HashMap<(NodeId, NodeId), Vec<usize>> {
    let mut index: HashMap<(NodeId, NodeId), Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        if let (Some(u), Some(v)) = (edge.props.u, edge.props.v) {
            index.entry((u, v)).or_default().push(i);
        }
    }
    index
}

/// Cuts to add to reverse edges, as `(reverse_edge_index, cut)`.
///
/// For every edge in `direct` that is not flagged oneway, each `(v, u)`
/// counterpart gets the same nodes, re-located against its own geometry
/// from the cut coordinate. Forward segment indices are never reused.
/// Only `direct` cuts are mirrored, so the result does not depend on the
/// order edges are visited in.
pub fn propagate_reverse(
    edges: &[BaseEdge],
    by_endpoints: &HashMap<(NodeId, NodeId), Vec<usize>>,
    direct: &BTreeMap<usize, Vec<PendingCut>>,
) -> Vec<(usize, PendingCut)> {
    let mut mirrored = Vec::new();

    for (&fi, cuts) in direct {
        let edge = &edges[fi];
        if edge.props.is_oneway() {
            continue;
        }
        let (Some(u), Some(v)) = (edge.props.u, edge.props.v) else {
            continue;
        };
        let Some(reverse) = by_endpoints.get(&(v, u)) else {
            continue;
        };

        for &rfi in reverse.iter().filter(|&&rfi| rfi != fi) {
            let rcoords = &edges[rfi].geometry;
            if rcoords.len() < 2 {
                continue;
            }
            for cut in cuts {
                if let Some(rcut) = locate_cut(rcoords, cut.node_id, cut.coord, None, None) {
                    mirrored.push((rfi, rcut));
                }
            }
        }
    }

    mirrored
}
