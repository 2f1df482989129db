#![allow(dead_code)]
use geo::{coord, MultiPolygon, Rect};

pub const TOL: f64 = 1e-6;

/// Axis-aligned rectangle as a single-polygon MultiPolygon.
pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()])
}

/// Unit-height strip from `x0` to `x1`.
pub fn strip(x0: f64, x1: f64) -> MultiPolygon<f64> {
    rect(x0, 0.0, x1, 1.0)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < TOL, "expected {expected}, got {actual}");
}
