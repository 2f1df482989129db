use rayon::prelude::*;

use super::{collect_units, residual, unit_values, UnitResult, UnitRows};
use crate::{
    config::Options,
    error::{Outcome, Result},
    geom::{group_by_left, Overlay},
    layer::Layer,
    table::{AllocationRow, AllocationTable},
    weight::areal_weight,
};

/// Binary dasymetric masking: ancillary regions whose class is in `excluded` are removed,
/// and each source value is split over the remaining intersections by their share of the
/// kept area.
///
/// A source unit with no kept area places nothing; its value is reported as a residual.
pub fn binary(
    source: &Layer,
    ancillary: &Layer,
    class_column: &str,
    excluded: &[&str],
    columns: &[&str],
    options: &Options,
    overlay: &impl Overlay,
) -> Result<Outcome<AllocationTable>> {
    let values = source.numeric_columns(columns)?;
    let labels = ancillary.labels(class_column)?;
    let masked: Vec<bool> = labels.iter()
        .map(|label| label.as_deref().is_some_and(|l| excluded.contains(&l)))
        .collect();

    let pieces = overlay.overlay(source.geoms(), ancillary.geoms());

    let results: Vec<_> = group_by_left(&pieces, source.len())
        .par_iter()
        .enumerate()
        .map(|(i, members)| -> UnitResult<AllocationRow> {
            let source_id = source.id(i);
            let unit = unit_values(source, i, columns, &values)?;

            let kept: Vec<usize> = members.iter().copied().filter(|&k| !masked[pieces[k].right]).collect();
            let kept_area: f64 = kept.iter().map(|&k| pieces[k].area).sum();

            let mut rows = Vec::with_capacity(kept.len());
            for &k in &kept {
                let piece = &pieces[k];
                let weight = areal_weight(piece.area, kept_area)
                    .map_err(|cause| vec![source.undefined_weight(i, format!("unmasked area: {cause}"))])?;
                rows.push(AllocationRow {
                    source_id: source_id.to_string(),
                    region_id: ancillary.id(piece.right).to_string(),
                    class: labels[piece.right].clone(),
                    area: piece.area,
                    geometry: piece.geometry.clone(),
                    values: unit.iter().map(|v| v * weight).collect(),
                });
            }

            let residuals = columns.iter().enumerate()
                .filter_map(|(c, column)| {
                    let placed: f64 = rows.iter().map(|row| row.values[c]).sum();
                    residual(source_id, column, unit[c], placed)
                })
                .collect();
            Ok(UnitRows { rows, residuals })
        })
        .collect();

    let (rows, diagnostics) = collect_units(results, options.strict)?;
    tracing::info!(sources = source.len(), masked = masked.iter().filter(|&&m| m).count(), rows = rows.len(), "binary masking complete");
    Ok(Outcome { table: AllocationTable::new(columns, rows).with_naming(options.naming.clone()), diagnostics })
}
