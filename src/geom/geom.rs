use geo::{Area, Contains, InteriorPoint, MultiPolygon};
use rstar::{RTree, AABB};

use super::footprint::Footprint;

/// A collection of MultiPolygons with an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<Footprint>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes are kept but never returned by spatial queries.
    pub fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| Footprint::of(i, shape))
                    .collect()
            ),
            shapes,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no MultiPolygons.
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Planar area of every shape, in the units of the input coordinates.
    pub fn areas(&self) -> Vec<f64> {
        self.shapes.iter().map(|shape| shape.unsigned_area()).collect()
    }

    /// Indices of shapes whose bounding box intersects the given envelope.
    #[inline]
    pub(crate) fn query(&self, envelope: &AABB<[f64; 2]>) -> impl Iterator<Item = usize> + '_ {
        self.rtree.locate_in_envelope_intersecting(envelope).map(Footprint::unit)
    }

    /// For each shape in `self`, pick its interior point and find the shape in `other`
    /// that contains it. `None` for degenerate shapes and for points outside `other`.
    pub fn crosswalk(&self, other: &Geometries) -> Vec<Option<usize>> {
        self.shapes.iter()
            .map(|shape| {
                let pt = shape.interior_point()?;
                let env = AABB::from_corners([pt.x(), pt.y()], [pt.x(), pt.y()]);
                other.query(&env).find(|&j| other.shapes[j].contains(&pt))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use geo::{coord, Rect};

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![
            Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size }).to_polygon()
        ])
    }

    #[test]
    fn areas_match_rectangles() {
        let geoms = Geometries::new(vec![square(0.0, 0.0, 2.0), square(5.0, 5.0, 3.0)]);
        assert_eq!(geoms.len(), 2);
        assert_eq!(geoms.areas(), vec![4.0, 9.0]);
    }

    #[test]
    fn empty_shapes_are_not_indexed() {
        let geoms = Geometries::new(vec![MultiPolygon::new(vec![]), square(0.0, 0.0, 1.0)]);
        let env = AABB::from_corners([-10.0, -10.0], [10.0, 10.0]);
        assert_eq!(geoms.query(&env).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn crosswalk_finds_containing_shape() {
        let zones = Geometries::new(vec![square(0.0, 0.0, 2.0), square(2.0, 0.0, 2.0)]);
        let parcels = Geometries::new(vec![
            square(0.5, 0.5, 1.0),
            square(2.5, 0.5, 1.0),
            square(10.0, 10.0, 1.0),
        ]);
        assert_eq!(parcels.crosswalk(&zones), vec![Some(0), Some(1), None]);
    }
}
