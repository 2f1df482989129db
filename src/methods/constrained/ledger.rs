use crate::weight::{areal_weight, ZeroReference};

/// Remainders below this fraction of the starting amount snap to zero.
const SNAP: f64 = 1e-12;

/// Value and area of one source unit not yet claimed by a processed class.
/// Both only ever decrease.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Ledger {
    total_value: f64,
    total_area: f64,
    remaining_value: f64,
    remaining_area: f64,
}

impl Ledger {
    pub(crate) fn new(value: f64, area: f64) -> Self {
        Self { total_value: value, total_area: area, remaining_value: value, remaining_area: area }
    }

    #[inline] pub(crate) fn remaining_value(&self) -> f64 { self.remaining_value }

    #[inline] pub(crate) fn remaining_area(&self) -> f64 { self.remaining_area }

    /// Share of the remaining area covered by a piece of `area`.
    #[inline]
    pub(crate) fn weight(&self, area: f64) -> Result<f64, ZeroReference> {
        areal_weight(area, self.remaining_area)
    }

    /// Remove a processed class's allocation and area.
    pub(crate) fn settle(&mut self, value: f64, area: f64) {
        debug_assert!(value >= 0.0 || self.total_value < 0.0, "allocation must not add value back");
        debug_assert!(area >= 0.0);
        self.remaining_value = snap(self.remaining_value - value, self.total_value);
        self.remaining_area = snap(self.remaining_area - area, self.total_area).max(0.0);
    }
}

#[inline]
fn snap(x: f64, scale: f64) -> f64 {
    if x.abs() <= SNAP * scale.abs().max(1.0) { 0.0 } else { x }
}
