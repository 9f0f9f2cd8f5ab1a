//! Boustrophedon ("lawnmower") coverage path planner.
//!
//! Sweeps horizontal scan lines across the polygon's bounding box, keeps the
//! extreme entry/exit crossing per line, and alternates traversal direction
//! so the result is one continuous back-and-forth path. Interior crossings
//! of non-convex polygons are intentionally discarded, trading exact
//! coverage of concave regions for a simple two-point-per-line segment.
//!
//! For fixed inputs the output is exactly reproducible: no randomness and
//! no iteration-order dependency.

use crate::error::PlanError;
use crate::geo::{meters_to_deg_lat, scan_line_crossings, BoundingBox};

/// Scan spacing below this is clamped; it would degenerate into thousands
/// of near-coincident lines.
pub const MIN_SPACING_M: f64 = 5.0;

/// Ordered sweep path over a survey polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPath {
    /// `[lat, lon]` points in flight order; consecutive points are actual
    /// flight segments.
    pub points: Vec<[f64; 2]>,
    /// True when no scan line crossed the polygon (area too small for the
    /// spacing) and the raw vertex ring was returned instead. Callers must
    /// treat a degenerate path as a degraded result and may reject it.
    pub degenerate: bool,
}

impl SweepPath {
    /// Number of two-point sweep segments in the path.
    pub fn segment_count(&self) -> usize {
        if self.degenerate {
            0
        } else {
            self.points.len() / 2
        }
    }
}

/// Plan a coverage sweep over `polygon` with `spacing_m` between lines.
///
/// The polygon is closed implicitly (last vertex connects to first) at
/// plan time; callers pass the open vertex list as drawn.
pub fn plan_coverage(polygon: &[[f64; 2]], spacing_m: f64) -> Result<SweepPath, PlanError> {
    if polygon.len() < 3 {
        return Err(PlanError::InsufficientVertices(polygon.len()));
    }
    if !spacing_m.is_finite() || spacing_m <= 0.0 {
        return Err(PlanError::InvalidSpacing(spacing_m));
    }
    let spacing_m = spacing_m.max(MIN_SPACING_M);

    let mut ring = polygon.to_vec();
    if ring.first() != ring.last() {
        ring.push(ring[0]);
    }

    let bbox = BoundingBox::of_ring(&ring).expect("ring has vertices");
    let step_deg = meters_to_deg_lat(spacing_m);

    let mut points: Vec<[f64; 2]> = Vec::new();
    let mut reverse = false;
    let mut lat = bbox.min_lat;
    while lat <= bbox.max_lat {
        let crossings = scan_line_crossings(&ring, lat);
        match crossings.len() {
            0 => {}
            1 => points.push([lat, crossings[0]]),
            _ => {
                // Extreme entry and exit only; the vehicle flies edge to
                // edge with no interior waypoints.
                let entry = crossings[0];
                let exit = crossings[crossings.len() - 1];
                if reverse {
                    points.push([lat, exit]);
                    points.push([lat, entry]);
                } else {
                    points.push([lat, entry]);
                    points.push([lat, exit]);
                }
                reverse = !reverse;
            }
        }
        lat += step_deg;
    }

    if points.is_empty() {
        return Ok(SweepPath {
            points: polygon.to_vec(),
            degenerate: true,
        });
    }

    Ok(SweepPath {
        points,
        degenerate: false,
    })
}
