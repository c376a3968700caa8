//! Resolve where an override node falls on an edge polyline

use crate::geo::{locate_on_polyline, PolylinePosition};
use crate::model::{Coord, NodeId};

/// An override node resolved onto one edge, before arc-length ordering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingCut {
    pub node_id: NodeId,
    pub segment_index: usize,
    pub t: f64,
    /// The override node's own position, inserted verbatim into the geometry
    pub coord: Coord,
}

/// Resolve `(segment_index, t)` for `point` on `coords`.
///
/// Stored editor values are trusted only when the segment index lies in
/// `[0, coords.len() - 2]` and `t` is a finite value in `[0, 1]`; otherwise
/// the position is re-derived by projection. Pure, so it can be re-run
/// against another edge's geometry.
pub fn resolve_position(
    coords: &[Coord],
    stored_segment: Option<usize>,
    stored_t: Option<f64>,
    point: Coord,
) -> Option<PolylinePosition> {
    if coords.len() < 2 {
        return None;
    }

    match (stored_segment, stored_t) {
        (Some(segment_index), Some(t))
            if segment_index < coords.len() - 1 && t.is_finite() && (0.0..=1.0).contains(&t) =>
        {
            Some(PolylinePosition { segment_index, t })
        }
        _ => locate_on_polyline(coords, point),
    }
}

/// Resolve a cut for `node_id` at `point`, see [`resolve_position`]
pub fn locate_cut(
    coords: &[Coord],
    node_id: NodeId,
    point: Coord,
    stored_segment: Option<usize>,
    stored_t: Option<f64>,
) -> Option<PendingCut> {
    let pos = resolve_position(coords, stored_segment, stored_t, point)?;
    Some(PendingCut {
        node_id,
        segment_index: pos.segment_index,
        t: pos.t,
        coord: point,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Vec<Coord> {
        vec![[0.0, 0.0], [0.0, 0.001], [0.0, 0.002]]
    }

    #[test]
    fn test_stored_values_are_kept() {
        let pos = resolve_position(&line(), Some(1), Some(0.25), [5.0, 5.0]).unwrap();
        assert_eq!(pos.segment_index, 1);
        assert_eq!(pos.t, 0.25);
    }

    #[test]
    fn test_out_of_range_segment_is_reprojected() {
        let pos = resolve_position(&line(), Some(2), Some(0.5), [0.0, 0.0005]).unwrap();
        assert_eq!(pos.segment_index, 0);
        assert!((pos.t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bad_t_is_reprojected() {
        for t in [Some(1.5), Some(-0.1), Some(f64::NAN), None] {
            let pos = resolve_position(&line(), Some(0), t, [0.0, 0.0015]).unwrap();
            assert_eq!(pos.segment_index, 1);
            assert!((pos.t - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_short_polyline_has_no_position() {
        assert!(resolve_position(&[[0.0, 0.0]], Some(0), Some(0.5), [0.0, 0.0]).is_none());
    }

    #[test]
    fn test_locate_cut_keeps_node_coordinate() {
        let cut = locate_cut(&line(), 77, [0.0, 0.0015], None, None).unwrap();
        assert_eq!(cut.node_id, 77);
        assert_eq!(cut.coord, [0.0, 0.0015]);
        assert_eq!(cut.segment_index, 1);
    }
}
