//! Geometry primitives on WGS84 coordinates
//!
//! Metric lengths always come from `haversine_distance`. The Web Mercator
//! projection is only used for nearest-point math, never for distances.

use crate::model::Coord;

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;
const MAX_MERCATOR_LAT: f64 = 89.9;

/// Compute haversine distance between two points in meters
pub fn haversine_distance(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let delta_lat = (lat2_deg - lat1_deg).to_radians();
    let delta_lon = (lon2_deg - lon1_deg).to_radians();

    let a =
        (delta_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Distance in meters between two `[lon, lat]` coordinates
#[inline]
pub fn coord_distance(a: Coord, b: Coord) -> f64 {
    haversine_distance(a[1], a[0], b[1], b[0])
}

/// Sum of consecutive-vertex distances; 0 for fewer than 2 vertices
pub fn polyline_length(coords: &[Coord]) -> f64 {
    coords.windows(2).map(|w| coord_distance(w[0], w[1])).sum()
}

/// Cumulative distance from the first vertex to each vertex.
///
/// `prefix[i]` is the metric length of `coords[..=i]`, so
/// `prefix.len() == coords.len()`.
pub fn prefix_lengths(coords: &[Coord]) -> Vec<f64> {
    let mut prefix = Vec::with_capacity(coords.len());
    let mut total = 0.0;
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            total += coord_distance(coords[i - 1], *c);
        }
        prefix.push(total);
    }
    prefix
}

/// Spherical Web Mercator, latitude clamped to ±89.9°
pub fn mercator_xy(lon: f64, lat: f64) -> (f64, f64) {
    let x = MERCATOR_RADIUS_M * lon.to_radians();
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let y = MERCATOR_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Planar projection of P onto segment AB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Interpolation parameter along AB, clamped to [0, 1]
    pub t: f64,
    pub x: f64,
    pub y: f64,
    /// Squared planar distance from P to the projected point
    pub dist_sq: f64,
}

pub fn closest_point_on_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> SegmentProjection {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let (apx, apy) = (p.0 - a.0, p.1 - a.1);
    let len_sq = abx * abx + aby * aby;

    if len_sq == 0.0 {
        return SegmentProjection {
            t: 0.0,
            x: a.0,
            y: a.1,
            dist_sq: apx * apx + apy * apy,
        };
    }

    // t = dot(P-A, B-A) / |B-A|²  clamped to [0, 1]
    let t = ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0);
    let x = a.0 + t * abx;
    let y = a.1 + t * aby;

    SegmentProjection {
        t,
        x,
        y,
        dist_sq: (p.0 - x).powi(2) + (p.1 - y).powi(2),
    }
}

/// Position on a polyline: segment index plus parameter within that segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylinePosition {
    pub segment_index: usize,
    pub t: f64,
}

/// Globally closest projection of `point` onto any segment of `coords`.
///
/// Every segment is checked: after projection a far vertex can still be
/// close to a non-adjacent segment. Returns `None` for fewer than two
/// vertices or non-finite input.
pub fn locate_on_polyline(coords: &[Coord], point: Coord) -> Option<PolylinePosition> {
    if coords.len() < 2 || !point.iter().all(|v| v.is_finite()) {
        return None;
    }

    let p = mercator_xy(point[0], point[1]);
    let mut best: Option<(PolylinePosition, f64)> = None;

    for (i, seg) in coords.windows(2).enumerate() {
        let a = mercator_xy(seg[0][0], seg[0][1]);
        let b = mercator_xy(seg[1][0], seg[1][1]);
        let proj = closest_point_on_segment(p, a, b);
        if !proj.dist_sq.is_finite() {
            continue;
        }
        if best.as_ref().map_or(true, |(_, d)| proj.dist_sq < *d) {
            best = Some((
                PolylinePosition {
                    segment_index: i,
                    t: proj.t,
                },
                proj.dist_sq,
            ));
        }
    }

    best.map(|(pos, _)| pos)
}

/// Drop consecutive coordinates that coincide within 1e-12 degrees
pub fn dedup_coords(coords: &mut Vec<Coord>) {
    coords.dedup_by(|b, a| same_coord(*a, *b));
}

#[inline]
pub(crate) fn same_coord(a: Coord, b: Coord) -> bool {
    const EPS: f64 = 1e-12;
    (a[0] - b[0]).abs() <= EPS && (a[1] - b[1]).abs() <= EPS
}
