use geo::{Area, BooleanOps, Buffer, Coord, LineString, MultiPolygon, Polygon as GeoPolygon};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite; any magnitude is accepted
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Point> for Coord<f64> {
    fn from(point: Point) -> Self {
        Coord { x: point.x, y: point.y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Arithmetic mean of the vertex coordinates.
///
/// Not the area centroid. Marker placement uses the plain vertex average,
/// even for concave rooms.
pub fn vertex_mean(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Validated polygon outline of a room or door
#[derive(Debug, Clone)]
pub struct Footprint {
    polygon: GeoPolygon<f64>,
}

impl Footprint {
    /// Build a footprint, rejecting outlines that cannot take part in overlap tests.
    ///
    /// `entity` names the owner in the error message.
    pub fn new(entity: &str, points: &[Point]) -> Result<Self> {
        let invalid = |reason: String| PlanError::InvalidGeometry {
            entity: entity.to_string(),
            reason,
        };

        if points.len() < 3 {
            return Err(invalid(format!(
                "polygon needs at least 3 vertices, got {}",
                points.len()
            )));
        }

        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            return Err(invalid(format!("vertex {} has a non-finite coordinate", idx)));
        }

        let coords: Vec<Coord<f64>> = points.iter().map(|&p| p.into()).collect();
        let polygon = GeoPolygon::new(LineString::from(coords), vec![]);

        let area = polygon.unsigned_area();
        if area <= f64::EPSILON {
            return Err(invalid("polygon has zero area".to_string()));
        }

        Ok(Self { polygon })
    }

    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    /// Expand the outline outward by `margin`
    pub fn buffered(&self, margin: f64) -> MultiPolygon<f64> {
        self.polygon.buffer(margin)
    }

    /// Area shared by this (unexpanded) outline and another region
    pub fn overlap_area(&self, other: &MultiPolygon<f64>) -> f64 {
        MultiPolygon::new(vec![self.polygon.clone()])
            .intersection(other)
            .unsigned_area()
    }
}

/// Area shared by two already-expanded regions
pub fn shared_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    a.intersection(b).unsigned_area()
}

#[cfg(test)]
pub(crate) fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<Point> {
    vec![
        Point::new(min_x, min_y),
        Point::new(max_x, min_y),
        Point::new(max_x, max_y),
        Point::new(min_x, max_y),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_area() {
        let footprint = Footprint::new("square", &rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert!((footprint.area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_too_few_vertices() {
        let err = Footprint::new("Door_1", &[Point::new(0.0, 0.0), Point::new(1.0, 0.0)])
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidGeometry { ref entity, .. } if entity == "Door_1"));
    }

    #[test]
    fn test_rejects_collinear_outline() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
        ];
        assert!(Footprint::new("line", &points).is_err());
    }

    #[test]
    fn test_rejects_non_finite_vertex() {
        let mut points = rect(0.0, 0.0, 10.0, 10.0);
        points[2].x = f64::NAN;
        assert!(Footprint::new("nan", &points).is_err());
    }

    #[test]
    fn test_accepts_large_offset_coordinates() {
        // Millimetre or georeferenced drawings sit far from the origin
        let left = Footprint::new("left", &rect(2_000_000.0, 0.0, 2_000_010.0, 10.0)).unwrap();
        let right = Footprint::new("right", &rect(2_000_010.0, -5e7, 2_000_020.0, -5e7 + 10.0));
        assert!((left.area() - 100.0).abs() < 1e-3);
        assert!(right.is_ok());
        assert!(Point::new(-3e9, 4e12).is_finite());
    }

    #[test]
    fn test_buffer_grows_area() {
        let footprint = Footprint::new("square", &rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let grown = footprint.buffered(1.0).unsigned_area();
        // 10x10 square plus four 10x1 strips plus rounded corners (~pi)
        assert!(grown > 140.0 && grown < 144.0, "buffered area was {}", grown);
    }

    #[test]
    fn test_wall_sharing_rooms_overlap_after_buffer() {
        let left = Footprint::new("left", &rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let right = Footprint::new("right", &rect(10.0, 0.0, 20.0, 10.0)).unwrap();

        let overlap = shared_area(&left.buffered(1.0), &right.buffered(1.0));
        assert!(overlap > 20.0, "overlap was {}", overlap);
    }

    #[test]
    fn test_distant_rooms_do_not_overlap() {
        let left = Footprint::new("left", &rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let far = Footprint::new("far", &rect(30.0, 0.0, 40.0, 10.0)).unwrap();

        let overlap = shared_area(&left.buffered(1.0), &far.buffered(1.0));
        assert!(overlap.abs() < 1e-9);
    }

    #[test]
    fn test_vertex_mean_is_unweighted() {
        // Extra vertex on one edge pulls the mean off the area centroid
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let mean = vertex_mean(&points);
        assert!((mean.x - 5.0).abs() < 1e-9);
        assert!((mean.y - 4.0).abs() < 1e-9);
    }
}
