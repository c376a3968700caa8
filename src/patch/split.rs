//! Cut a polyline into sub-polylines at ordered cut points

use crate::geo::{dedup_coords, same_coord};
use crate::model::Coord;

use super::aggregate::Cut;

/// Split `coords` at `cuts`, producing one sub-polyline per gap.
///
/// Cuts are walked in geometry order `(segment_index, t)`. Each cut closes
/// the current piece at the cut coordinate and starts the next piece there.
/// Consecutive coincident points are collapsed and pieces that end up with
/// fewer than two vertices are dropped, so a degenerate input shows up as
/// `result.len() != cuts.len() + 1`. Callers must then discard the whole
/// split.
pub fn split_polyline(coords: &[Coord], cuts: &[Cut]) -> Vec<Vec<Coord>> {
    if coords.len() < 2 {
        return Vec::new();
    }
    if cuts.is_empty() {
        return vec![coords.to_vec()];
    }

    let mut ordered: Vec<&Cut> = cuts.iter().collect();
    ordered.sort_by(|a, b| {
        a.segment_index
            .cmp(&b.segment_index)
            .then(a.t.total_cmp(&b.t))
    });

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut current = vec![coords[0]];
    let mut next = 0;

    for i in 0..coords.len() - 1 {
        while let Some(cut) = ordered.get(next).filter(|c| c.segment_index == i) {
            push_distinct(&mut current, cut.coord);
            close_piece(&mut pieces, std::mem::replace(&mut current, vec![cut.coord]));
            next += 1;
        }
        push_distinct(&mut current, coords[i + 1]);
    }
    close_piece(&mut pieces, current);

    pieces
}

fn push_distinct(piece: &mut Vec<Coord>, c: Coord) {
    if piece.last().map_or(true, |last| !same_coord(*last, c)) {
        piece.push(c);
    }
}

fn close_piece(pieces: &mut Vec<Vec<Coord>>, mut piece: Vec<Coord>) {
    dedup_coords(&mut piece);
    if piece.len() >= 2 {
        pieces.push(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::polyline_length;

    fn cut(node_id: i64, segment_index: usize, t: f64, coord: Coord) -> Cut {
        Cut {
            node_id,
            segment_index,
            t,
            coord,
            measure_m: 0.0,
        }
    }

    fn line() -> Vec<Coord> {
        vec![[0.0, 0.0], [0.0, 0.001], [0.0, 0.003]]
    }

    #[test]
    fn test_zero_cuts_is_identity() {
        let coords = vec![[1.0, 1.0], [1.0, 1.0], [2.0, 2.0]];
        assert_eq!(split_polyline(&coords, &[]), vec![coords.clone()]);
    }

    #[test]
    fn test_single_cut_mid_segment() {
        let pieces = split_polyline(&line(), &[cut(9, 0, 0.5, [0.0, 0.0005])]);
        assert_eq!(
            pieces,
            vec![
                vec![[0.0, 0.0], [0.0, 0.0005]],
                vec![[0.0, 0.0005], [0.0, 0.001], [0.0, 0.003]],
            ]
        );
    }

    #[test]
    fn test_cuts_given_out_of_order() {
        let cuts = [
            cut(2, 1, 0.5, [0.0, 0.002]),
            cut(1, 0, 0.5, [0.0, 0.0005]),
            cut(3, 1, 0.75, [0.0, 0.0025]),
        ];
        let pieces = split_polyline(&line(), &cuts);
        assert_eq!(pieces.len(), cuts.len() + 1);
        assert!(pieces.iter().all(|p| p.len() >= 2));
        assert_eq!(pieces[1], vec![[0.0, 0.0005], [0.0, 0.001], [0.0, 0.002]]);
    }

    #[test]
    fn test_lengths_are_conserved() {
        let coords = line();
        let cuts = [cut(1, 0, 0.3, [0.0, 0.0003]), cut(2, 1, 0.5, [0.0, 0.002])];
        let pieces = split_polyline(&coords, &cuts);
        let total: f64 = pieces.iter().map(|p| polyline_length(p)).sum();
        let expected = polyline_length(&coords);
        assert!(((total - expected) / expected).abs() < 1e-6);
    }

    #[test]
    fn test_cut_at_vertex_is_shared() {
        let pieces = split_polyline(&line(), &[cut(1, 0, 1.0, [0.0, 0.001])]);
        assert_eq!(
            pieces,
            vec![
                vec![[0.0, 0.0], [0.0, 0.001]],
                vec![[0.0, 0.001], [0.0, 0.003]],
            ]
        );
    }

    #[test]
    fn test_cut_at_start_collapses() {
        let cuts = [cut(1, 0, 0.0, [0.0, 0.0])];
        assert_ne!(split_polyline(&line(), &cuts).len(), cuts.len() + 1);
    }

    #[test]
    fn test_coincident_cuts_collapse() {
        let cuts = [cut(1, 0, 0.5, [0.0, 0.0005]), cut(2, 0, 0.5, [0.0, 0.0005])];
        assert_ne!(split_polyline(&line(), &cuts).len(), cuts.len() + 1);
    }

    #[test]
    fn test_cut_beyond_last_segment_is_never_applied() {
        let cuts = [cut(1, 5, 0.5, [0.0, 0.0005])];
        assert_eq!(split_polyline(&line(), &cuts).len(), 1);
    }
}
