use thiserror::Error;

/// A ratio was requested against a reference area that is zero, negative or not finite.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("reference area {0} is not positive")]
pub struct ZeroReference(pub f64);

/// Fraction of `reference_area` covered by `intersect_area`.
///
/// In `[0, 1]` whenever the intersection is a piece of the reference shape.
#[inline]
pub fn areal_weight(intersect_area: f64, reference_area: f64) -> Result<f64, ZeroReference> {
    if !reference_area.is_finite() || reference_area <= 0.0 || !intersect_area.is_finite() {
        return Err(ZeroReference(reference_area));
    }
    Ok(intersect_area / reference_area)
}
