use geo::{Area, BooleanOps, BoundingRect, MultiPolygon};
use rayon::prelude::*;
use rstar::AABB;

use super::Geometries;

/// One piece of the intersection of a left shape with a right shape.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub left: usize,
    pub right: usize,
    pub geometry: MultiPolygon<f64>,
    pub area: f64,
}

/// Row-wise polygon intersection of two layers.
///
/// Implementations must return pieces ordered by `left`, then `right`, and only
/// pieces with positive area.
pub trait Overlay: Sync {
    fn overlay(&self, left: &Geometries, right: &Geometries) -> Vec<Intersection>;
}

/// Planar overlay using R-tree candidate pruning and `geo` boolean operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarOverlay {
    /// Pieces with area at or below this value are dropped (slivers, shared edges).
    pub min_area: f64,
}

impl PlanarOverlay {
    pub fn new(min_area: f64) -> Self { Self { min_area } }
}

impl Overlay for PlanarOverlay {
    fn overlay(&self, left: &Geometries, right: &Geometries) -> Vec<Intersection> {
        let pieces: Vec<Intersection> = left.shapes()
            .par_iter()
            .enumerate()
            .flat_map_iter(|(i, a)| {
                let mut candidates: Vec<usize> = match a.bounding_rect() {
                    Some(rect) => right.query(&AABB::from_corners(rect.min().into(), rect.max().into())).collect(),
                    None => Vec::new(),
                };
                candidates.sort_unstable();

                candidates.into_iter().filter_map(move |j| {
                    let geometry = a.intersection(&right.shapes()[j]);
                    let area = geometry.unsigned_area();
                    (area > self.min_area).then_some(Intersection { left: i, right: j, geometry, area })
                })
            })
            .collect();

        tracing::debug!(left = left.len(), right = right.len(), pieces = pieces.len(), "overlay complete");
        pieces
    }
}

/// Group overlay pieces by their left index.
pub(crate) fn group_by_left(pieces: &[Intersection], left_len: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); left_len];
    for (k, piece) in pieces.iter().enumerate() {
        groups[piece.left].push(k);
    }
    groups
}
