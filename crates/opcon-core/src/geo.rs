//! Coordinate and metric helpers for coverage planning.
//!
//! All positions are `[lat, lon]` pairs in decimal degrees. Meter/degree
//! conversion uses a fixed equirectangular approximation; this introduces
//! east-west distortion away from the equator, which is acceptable for the
//! console's tactical-planning precision target (not geodetic-grade).

/// Meters per degree of latitude under the fixed equirectangular model.
pub const METERS_PER_DEG_LAT: f64 = 111_132.0;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Convert a north/south distance in meters to degrees of latitude.
pub fn meters_to_deg_lat(meters: f64) -> f64 {
    meters / METERS_PER_DEG_LAT
}

/// Great-circle distance between two points in meters (Haversine).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Total length of a path in meters, summed segment by segment.
pub fn path_length_m(points: &[[f64; 2]]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(w[0][0], w[0][1], w[1][0], w[1][1]))
        .sum()
}

/// Axis-aligned bounding box in geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Bounding box of a vertex ring. `None` for an empty ring.
    pub fn of_ring(ring: &[[f64; 2]]) -> Option<Self> {
        let first = ring.first()?;
        let mut bbox = BoundingBox {
            min_lat: first[0],
            min_lon: first[1],
            max_lat: first[0],
            max_lon: first[1],
        };
        for p in &ring[1..] {
            bbox.min_lat = bbox.min_lat.min(p[0]);
            bbox.min_lon = bbox.min_lon.min(p[1]);
            bbox.max_lat = bbox.max_lat.max(p[0]);
            bbox.max_lon = bbox.max_lon.max(p[1]);
        }
        Some(bbox)
    }

    pub fn height_deg(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// Ray-casting point-in-polygon test.
///
/// The ring may be open or explicitly closed; the last vertex is always
/// connected back to the first. Boundary behavior follows the half-open
/// edge rule and is consistent for shared vertices.
pub fn point_in_polygon(ring: &[[f64; 2]], lat: f64, lon: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (yi, xi) = (ring[i][0], ring[i][1]);
        let (yj, xj) = (ring[j][0], ring[j][1]);
        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Longitudes where a horizontal scan line at `lat` crosses the ring's
/// edges, sorted ascending.
///
/// Uses the same half-open rule as [`point_in_polygon`], so a scan line
/// through a shared vertex yields each crossing exactly once and the
/// result always pairs up into entry/exit intervals for simple polygons.
pub fn scan_line_crossings(ring: &[[f64; 2]], lat: f64) -> Vec<f64> {
    let n = ring.len();
    let mut crossings = Vec::new();
    if n < 3 {
        return crossings;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (yi, xi) = (ring[i][0], ring[i][1]);
        let (yj, xj) = (ring[j][0], ring[j][1]);
        if (yi > lat) != (yj > lat) {
            crossings.push(xi + (lat - yi) * (xj - xi) / (yj - yi));
        }
        j = i;
    }
    crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    crossings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
    }

    #[test]
    fn haversine_known_distance() {
        // ~111km for 1 degree of latitude
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn path_length_sums_segments() {
        let path = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
        let len = path_length_m(&path);
        assert!((len - 2.0 * 111_194.0).abs() < 200.0);
    }

    #[test]
    fn bbox_of_ring() {
        let bbox = BoundingBox::of_ring(&unit_square()).unwrap();
        assert_eq!(bbox.min_lat, 0.0);
        assert_eq!(bbox.max_lat, 1.0);
        assert_eq!(bbox.min_lon, 0.0);
        assert_eq!(bbox.max_lon, 1.0);
    }

    #[test]
    fn point_in_polygon_inside_and_outside() {
        let ring = unit_square();
        assert!(point_in_polygon(&ring, 0.5, 0.5));
        assert!(!point_in_polygon(&ring, 1.5, 0.5));
        assert!(!point_in_polygon(&ring, -0.1, 0.5));
    }

    #[test]
    fn scan_line_crossings_pair_up() {
        let ring = unit_square();
        let crossings = scan_line_crossings(&ring, 0.5);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0] - 0.0).abs() < 1e-12);
        assert!((crossings[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scan_line_misses_polygon() {
        let ring = unit_square();
        assert!(scan_line_crossings(&ring, 2.0).is_empty());
    }

    #[test]
    fn scan_line_through_concave_notch() {
        // U-shape: a line through the notch crosses four edges.
        let ring = vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 0.3],
            [0.5, 0.3],
            [0.5, 0.7],
            [1.0, 0.7],
            [1.0, 1.0],
            [0.0, 1.0],
        ];
        let crossings = scan_line_crossings(&ring, 0.8);
        assert_eq!(crossings.len(), 4);
    }
}
