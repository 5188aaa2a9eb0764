use serde::{Deserialize, Serialize};

pub type ConnectionId = u32;
pub type SessionId = String;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Points of a completed drawing stroke, in the order they were received.
///
/// A polygon owns its points. Once built it is unaffected by whatever happens
/// to the buffer it was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_should_encode_point_as_flat_object() {
        let encoded = serde_json::to_value(Point::new(3, -7)).expect("");
        assert_eq!(encoded, json!({ "x": 3, "y": -7 }));
    }

    #[test]
    fn it_should_encode_polygon_points_in_order() {
        let polygon = Polygon::new(vec![Point::new(0, 0), Point::new(5, 1), Point::new(2, 9)]);
        let encoded = serde_json::to_value(&polygon).expect("");
        assert_eq!(
            encoded,
            json!({ "points": [{ "x": 0, "y": 0 }, { "x": 5, "y": 1 }, { "x": 2, "y": 9 }] })
        );

        let decoded: Polygon = serde_json::from_value(encoded).expect("");
        assert_eq!(decoded, polygon);
    }

    #[test]
    fn it_should_reject_point_with_fractional_coordinate() {
        let result = serde_json::from_str::<Point>(r#"{"x": 1.5, "y": 2}"#);
        assert!(result.is_err());
    }
}
