use rayon::prelude::*;

use super::{collect_units, residual, unit_values, UnitResult, UnitRows};
use crate::{
    config::Options,
    error::{Outcome, Result},
    geom::{group_by_left, Overlay},
    layer::Layer,
    table::{TargetRow, TargetTable},
    weight::areal_weight,
};

/// Plain areal weighting: each target receives `value × intersect_area / source_area`
/// from every source unit it overlaps.
///
/// Targets that overlap nothing get zeros. Source value falling outside every target is
/// reported as a residual.
pub fn areal(
    source: &Layer,
    target: &Layer,
    columns: &[&str],
    options: &Options,
    overlay: &impl Overlay,
) -> Result<Outcome<TargetTable>> {
    let values = source.numeric_columns(columns)?;
    let areas = source.geoms().areas();
    let pieces = overlay.overlay(source.geoms(), target.geoms());

    let results: Vec<_> = group_by_left(&pieces, source.len())
        .par_iter()
        .enumerate()
        .map(|(i, members)| -> UnitResult<(usize, Vec<f64>)> {
            let source_id = source.id(i);
            let unit = unit_values(source, i, columns, &values)?;

            let mut contributions = Vec::with_capacity(members.len());
            for &k in members {
                let weight = areal_weight(pieces[k].area, areas[i])
                    .map_err(|cause| vec![source.undefined_weight(i, format!("source area: {cause}"))])?;
                contributions.push((pieces[k].right, unit.iter().map(|v| v * weight).collect::<Vec<_>>()));
            }

            let residuals = columns.iter().enumerate()
                .filter_map(|(c, column)| {
                    let placed: f64 = contributions.iter().map(|(_, v)| v[c]).sum();
                    residual(source_id, column, unit[c], placed)
                })
                .collect();
            Ok(UnitRows { rows: contributions, residuals })
        })
        .collect();

    let (contributions, diagnostics) = collect_units(results, options.strict)?;

    let mut totals = vec![vec![0.0; columns.len()]; target.len()];
    for (j, values) in contributions {
        for (total, v) in totals[j].iter_mut().zip(values) { *total += v }
    }
    let rows = target.ids().iter().zip(totals)
        .map(|(target_id, values)| TargetRow { target_id: target_id.clone(), values })
        .collect::<Vec<_>>();

    tracing::info!(sources = source.len(), targets = target.len(), pieces = pieces.len(), "areal weighting complete");
    Ok(Outcome { table: TargetTable::new(columns, rows).with_naming(options.naming.clone()), diagnostics })
}
