use thiserror::Error;

use super::{ledger::Ledger, schedule::ClassSchedule};
use crate::weight::ZeroReference;

/// How one intersection piece takes part in the allocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PieceClass {
    /// Capped class, by schedule slot.
    Capped(usize),
    /// Receives a share of whatever is left after all capped classes.
    Open,
    /// Area removed from the unit before the first pass; receives nothing.
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Piece {
    pub(crate) area: f64,
    pub(crate) class: PieceClass,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UnitAllocation {
    /// Allocated value per piece, in input order.
    pub(crate) values: Vec<f64>,
    /// Value that no piece could take.
    pub(crate) residual: f64,
}

/// The ledger ran out of area while value was still waiting to be placed.
#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum Stall {
    #[error("no area left to weight class {class:?} ({cause})")]
    Capped { class: String, cause: ZeroReference },
    #[error("value {remaining} remains but no area is left for unconstrained regions")]
    Open { remaining: f64 },
}

/// Split one source unit's value over its intersection pieces.
///
/// Capped classes are visited in schedule order. Each piece of the current class gets its
/// areal share of the remaining value against the remaining area, clipped to
/// `threshold × area`; the class's total value and area then leave the ledger. Open pieces
/// split what is left in a final uncapped pass.
pub(crate) fn allocate_unit(value: f64, area: f64, pieces: &[Piece], schedule: &ClassSchedule) -> Result<UnitAllocation, Stall> {
    let mut ledger = Ledger::new(value, area);
    let mut values = vec![0.0; pieces.len()];

    let mut buckets = vec![Vec::new(); schedule.len()];
    let mut open = Vec::new();
    let mut excluded = 0.0;
    for (k, piece) in pieces.iter().enumerate() {
        match piece.class {
            PieceClass::Capped(slot) => buckets[slot].push(k),
            PieceClass::Open => open.push(k),
            PieceClass::Excluded => excluded += piece.area,
        }
    }
    ledger.settle(0.0, excluded);

    for (slot, members) in buckets.iter().enumerate() {
        if members.is_empty() { continue }
        let threshold = schedule.threshold(slot);

        let (mut claimed_value, mut claimed_area) = (0.0, 0.0);
        for &k in members {
            let piece = pieces[k];
            let share = if ledger.remaining_value() == 0.0 {
                0.0
            } else {
                let weight = ledger.weight(piece.area).map_err(|cause| Stall::Capped {
                    class: schedule.label(slot).to_string(),
                    cause,
                })?;
                weight * ledger.remaining_value()
            };
            values[k] = share.min(threshold * piece.area);
            claimed_value += values[k];
            claimed_area += piece.area;
        }
        ledger.settle(claimed_value, claimed_area);

        tracing::trace!(
            class = schedule.label(slot),
            claimed_value,
            remaining_value = ledger.remaining_value(),
            remaining_area = ledger.remaining_area(),
            "class settled"
        );
    }

    if ledger.remaining_value() != 0.0 {
        for &k in &open {
            let weight = ledger.weight(pieces[k].area)
                .map_err(|_| Stall::Open { remaining: ledger.remaining_value() })?;
            values[k] = weight * ledger.remaining_value();
        }
    }

    let residual = value - values.iter().sum::<f64>();
    Ok(UnitAllocation { values, residual })
}
