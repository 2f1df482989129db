mod allocate;
mod ledger;
mod schedule;

use rayon::prelude::*;

pub use schedule::ClassSchedule;

use allocate::{allocate_unit, Piece, PieceClass};
use super::{collect_units, residual, unit_values, UnitResult, UnitRows};
use crate::{
    config::{Options, ThresholdMap, UnlistedClass},
    error::{Error, Outcome, Result},
    geom::{group_by_left, Intersection, Overlay},
    layer::Layer,
    table::{AllocationRow, AllocationTable},
};

/// Limiting-variable disaggregation of `source` values into the class regions of `regions`.
///
/// Each source unit is split over its intersections with `regions`, capped per class at
/// `threshold × intersect_area`, lowest threshold first. Classes mapped to
/// [`ClassRule::Unconstrained`](crate::ClassRule::Unconstrained) share what remains.
/// Labels missing from `thresholds` follow [`Options::unlisted`].
///
/// Returns one row per intersection. Value left over because capacity ran out is
/// reported as a residual in the diagnostics.
pub fn constrained_allocate(
    source: &Layer,
    regions: &Layer,
    class_column: &str,
    thresholds: &ThresholdMap,
    columns: &[&str],
    options: &Options,
    overlay: &impl Overlay,
) -> Result<Outcome<AllocationTable>> {
    let schedule = ClassSchedule::new(thresholds)?;
    let values = source.numeric_columns(columns)?;
    let labels = regions.labels(class_column)?;
    let areas = source.geoms().areas();

    let pieces = overlay.overlay(source.geoms(), regions.geoms());
    let groups = group_by_left(&pieces, source.len());

    let run = Run {
        source,
        regions,
        labels: &labels,
        thresholds,
        schedule: &schedule,
        unlisted: options.unlisted,
        columns,
        values: &values,
        areas: &areas,
        pieces: &pieces,
    };
    let results: Vec<_> = groups.par_iter()
        .enumerate()
        .map(|(i, members)| run.allocate_source(i, members))
        .collect();

    let (rows, diagnostics) = collect_units(results, options.strict)?;
    tracing::info!(
        sources = source.len(),
        regions = regions.len(),
        classes = schedule.len(),
        rows = rows.len(),
        failed = diagnostics.failures.len(),
        residuals = diagnostics.residuals.len(),
        "constrained allocation complete"
    );

    Ok(Outcome { table: AllocationTable::new(columns, rows).with_naming(options.naming.clone()), diagnostics })
}

/// Read-only inputs shared by every source unit of one call.
struct Run<'a> {
    source: &'a Layer,
    regions: &'a Layer,
    labels: &'a [Option<String>],
    thresholds: &'a ThresholdMap,
    schedule: &'a ClassSchedule,
    unlisted: UnlistedClass,
    columns: &'a [&'a str],
    values: &'a [Vec<Option<f64>>],
    areas: &'a [f64],
    pieces: &'a [Intersection],
}

impl Run<'_> {
    fn classify(&self, i: usize, piece: &Intersection) -> std::result::Result<PieceClass, Error> {
        let label = self.labels[piece.right].as_deref();
        if let Some(slot) = label.and_then(|l| self.schedule.slot(l)) {
            return Ok(PieceClass::Capped(slot));
        }
        if label.is_some_and(|l| self.thresholds.contains(l)) {
            return Ok(PieceClass::Open);
        }

        match self.unlisted {
            UnlistedClass::Error => Err(Error::UnclassifiedRegion {
                source_id: self.source.id(i).to_string(),
                region: self.regions.id(piece.right).to_string(),
                class: label.unwrap_or("<null>").to_string(),
            }),
            UnlistedClass::Unconstrained => Ok(PieceClass::Open),
            UnlistedClass::Exclude => Ok(PieceClass::Excluded),
        }
    }

    fn allocate_source(&self, i: usize, members: &[usize]) -> UnitResult<AllocationRow> {
        let source_id = self.source.id(i);

        let mut errors = Vec::new();
        let mut pieces = Vec::with_capacity(members.len());
        for &k in members {
            match self.classify(i, &self.pieces[k]) {
                Ok(class) => pieces.push(Piece { area: self.pieces[k].area, class }),
                Err(error) => errors.push(error),
            }
        }
        let values = unit_values(self.source, i, self.columns, self.values);
        let values = match values {
            Ok(values) if errors.is_empty() => values,
            Ok(_) => return Err(errors),
            Err(invalid) => return Err(errors.into_iter().chain(invalid).collect()),
        };

        let mut allocated = vec![Vec::with_capacity(self.columns.len()); members.len()];
        let mut residuals = Vec::new();
        for (column, &value) in self.columns.iter().zip(&values) {
            match allocate_unit(value, self.areas[i], &pieces, self.schedule) {
                Ok(unit) => {
                    residuals.extend(residual(source_id, column, value, value - unit.residual));
                    for (row, v) in allocated.iter_mut().zip(unit.values) { row.push(v) }
                }
                Err(stall) => errors.push(self.source.undefined_weight(i, format!("{column}: {stall}"))),
            }
        }
        if !errors.is_empty() { return Err(errors) }

        let rows = members.iter().zip(allocated)
            .map(|(&k, values)| {
                let piece = &self.pieces[k];
                AllocationRow {
                    source_id: source_id.to_string(),
                    region_id: self.regions.id(piece.right).to_string(),
                    class: self.labels[piece.right].clone(),
                    area: piece.area,
                    geometry: piece.geometry.clone(),
                    values,
                }
            })
            .collect();
        Ok(UnitRows { rows, residuals })
    }
}
