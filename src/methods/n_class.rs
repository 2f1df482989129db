use rayon::prelude::*;

use super::{collect_units, residual, unit_values, UnitResult, UnitRows};
use crate::{
    config::{Options, PercentMap, UnlistedClass},
    error::{Error, Outcome, Result},
    geom::{group_by_left, Overlay},
    layer::Layer,
    table::{AllocationRow, AllocationTable},
    weight::areal_weight,
};

/// N-class dasymetric weighting: every intersection gets
/// `percent(class) × areal_weight`, normalized to sum to one within its source unit.
///
/// A class missing from `percents` is an `UnclassifiedRegion` under
/// [`UnlistedClass::Error`] and weighs zero under [`UnlistedClass::Exclude`].
/// [`UnlistedClass::Unconstrained`] has no meaning without caps and is rejected.
pub fn n_class(
    source: &Layer,
    ancillary: &Layer,
    class_column: &str,
    percents: &PercentMap,
    columns: &[&str],
    options: &Options,
    overlay: &impl Overlay,
) -> Result<Outcome<AllocationTable>> {
    if options.unlisted == UnlistedClass::Unconstrained {
        return Err(Error::InvalidConfig("n-class weighting has no density caps; use the error or exclude policy for unlisted classes".into()));
    }
    if let Some((label, percent)) = percents.iter().find(|(_, p)| !p.is_finite() || **p < 0.0) {
        return Err(Error::InvalidConfig(format!("class {label:?} has percentage {percent}")));
    }

    let values = source.numeric_columns(columns)?;
    let labels = ancillary.labels(class_column)?;
    let areas = source.geoms().areas();
    let pieces = overlay.overlay(source.geoms(), ancillary.geoms());

    let results: Vec<_> = group_by_left(&pieces, source.len())
        .par_iter()
        .enumerate()
        .map(|(i, members)| -> UnitResult<AllocationRow> {
            let source_id = source.id(i);

            let mut errors = Vec::new();
            let mut class_weights = Vec::with_capacity(members.len());
            for &k in members {
                let piece = &pieces[k];
                let label = labels[piece.right].as_deref();
                let percent = match label.and_then(|l| percents.get(l)) {
                    Some(&percent) => percent,
                    None if options.unlisted == UnlistedClass::Error => {
                        errors.push(Error::UnclassifiedRegion {
                            source_id: source_id.to_string(),
                            region: ancillary.id(piece.right).to_string(),
                            class: label.unwrap_or("<null>").to_string(),
                        });
                        continue;
                    }
                    None => 0.0,
                };
                match areal_weight(piece.area, areas[i]) {
                    Ok(weight) => class_weights.push(percent * weight),
                    Err(cause) => errors.push(source.undefined_weight(i, format!("source area: {cause}"))),
                }
            }
            let unit = match unit_values(source, i, columns, &values) {
                Ok(unit) if errors.is_empty() => unit,
                Ok(_) => return Err(errors),
                Err(invalid) => return Err(errors.into_iter().chain(invalid).collect()),
            };
            if members.is_empty() {
                let residuals = columns.iter().zip(&unit)
                    .filter_map(|(column, &value)| residual(source_id, column, value, 0.0))
                    .collect();
                return Ok(UnitRows { rows: Vec::new(), residuals });
            }

            let total: f64 = class_weights.iter().sum();
            let mut rows = Vec::with_capacity(members.len());
            for (&k, &class_weight) in members.iter().zip(&class_weights) {
                let piece = &pieces[k];
                let fraction = areal_weight(class_weight, total)
                    .map_err(|cause| vec![source.undefined_weight(i, format!("class weight total: {cause}"))])?;
                rows.push(AllocationRow {
                    source_id: source_id.to_string(),
                    region_id: ancillary.id(piece.right).to_string(),
                    class: labels[piece.right].clone(),
                    area: piece.area,
                    geometry: piece.geometry.clone(),
                    values: unit.iter().map(|v| v * fraction).collect(),
                });
            }
            Ok(UnitRows { rows, residuals: Vec::new() })
        })
        .collect();

    let (rows, diagnostics) = collect_units(results, options.strict)?;
    tracing::info!(sources = source.len(), classes = percents.len(), rows = rows.len(), "n-class weighting complete");
    Ok(Outcome { table: AllocationTable::new(columns, rows).with_naming(options.naming.clone()), diagnostics })
}
