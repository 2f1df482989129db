use geo::{BoundingRect, MultiPolygon};
use rstar::{RTreeObject, AABB};

/// Envelope of one unit's shape, indexed in the layer's R-tree.
#[derive(Debug, Clone)]
pub(super) struct Footprint {
    unit: usize,
    envelope: AABB<[f64; 2]>,
}

impl Footprint {
    /// `None` for an empty shape, which has no extent to index.
    pub(super) fn of(unit: usize, shape: &MultiPolygon<f64>) -> Option<Self> {
        let rect = shape.bounding_rect()?;
        Some(Self { unit, envelope: AABB::from_corners(rect.min().into(), rect.max().into()) })
    }

    #[inline] pub(super) fn unit(&self) -> usize { self.unit }
}

impl RTreeObject for Footprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { self.envelope }
}
