use super::parcel;
use crate::{
    config::{Options, ParcelColumns},
    error::{Diagnostics, Outcome, Result},
    layer::Layer,
    table::{ExpertRow, ExpertTable, Proxy, ProxyEstimate, Selection},
};

/// Running sum of coarse-derived estimates over the parcels of one fine zone.
/// Turns `None` as soon as one parcel has no estimate.
#[derive(Debug, Clone, Copy)]
struct Aggregate {
    ru: Option<f64>,
    ara: Option<f64>,
}

impl Default for Aggregate {
    fn default() -> Self { Self { ru: Some(0.0), ara: Some(0.0) } }
}

impl Aggregate {
    fn add(&mut self, estimate: &ProxyEstimate) {
        self.ru = self.ru.zip(estimate.ru).map(|(a, b)| a + b);
        self.ara = self.ara.zip(estimate.ara).map(|(a, b)| a + b);
    }
}

/// Pick the proxy with the smaller aggregate error; ties go to residential units.
/// A proxy without an error cannot win.
fn verdict(ru_diff: Option<f64>, ara_diff: Option<f64>) -> Option<Proxy> {
    match (ru_diff, ara_diff) {
        (Some(ru), Some(ara)) if ru <= ara => Some(Proxy::ResidentialUnits),
        (Some(_), Some(_)) => Some(Proxy::AdjustedArea),
        (Some(_), None) => Some(Proxy::ResidentialUnits),
        (None, Some(_)) => Some(Proxy::AdjustedArea),
        (None, None) => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct ZoneVerdict {
    proxy: Option<Proxy>,
    ru_diff: Option<f64>,
    ara_diff: Option<f64>,
}

/// Expert-system choice between the two parcel proxies, using nested zones for validation.
///
/// The parcel allocator runs once from `coarse` and once from `fine`. Coarse-derived parcel
/// estimates are summed per fine zone and compared with the fine zone's own value. Within each
/// fine zone, every parcel takes its fine-derived estimate from the proxy whose aggregate error
/// is smaller (ties to residential units). The decision is per fine zone, not per parcel.
///
/// A fine zone and attribute where neither proxy can be evaluated reports one `UndefinedWeight`;
/// its parcels carry `None` for that attribute and keep their other selections.
pub fn expert_select(
    coarse: &Layer,
    fine: &Layer,
    parcels: &Layer,
    parcel_columns: &ParcelColumns,
    columns: &[&str],
    options: &Options,
) -> Result<Outcome<ExpertTable>> {
    let strict = options.strict;
    let mut diagnostics = Diagnostics::default();
    let fine_table = parcel::allocate(fine, parcels, parcel_columns, columns, strict, &mut diagnostics)?;

    let mut coarse_diagnostics = Diagnostics::default();
    let coarse_table = parcel::allocate(coarse, parcels, parcel_columns, columns, strict, &mut coarse_diagnostics)?;
    diagnostics.absorb(coarse_diagnostics);

    let fine_values = fine.numeric_columns(columns)?;

    let mut fine_zone_of = vec![None; parcels.len()];
    for row in fine_table.rows() { fine_zone_of[row.parcel] = Some(row.zone) }

    // coarse-derived estimates summed per fine zone, and the coarse zone each fine zone sits in
    let mut aggregates = vec![vec![Aggregate::default(); columns.len()]; fine.len()];
    let mut parents: Vec<Option<usize>> = vec![None; fine.len()];
    for row in coarse_table.rows() {
        let Some(z) = fine_zone_of[row.parcel] else { continue };
        for (aggregate, estimate) in aggregates[z].iter_mut().zip(&row.estimates) { aggregate.add(estimate) }

        match parents[z] {
            None => parents[z] = Some(row.zone),
            Some(parent) if parent != row.zone => tracing::warn!(
                fine_zone = fine.id(z),
                "fine zone spans more than one coarse zone"
            ),
            Some(_) => {}
        }
    }

    // whether every parcel of a fine zone has a direct estimate under each proxy
    let mut direct = vec![vec![(true, true); columns.len()]; fine.len()];
    for row in fine_table.rows() {
        for (ok, estimate) in direct[row.zone].iter_mut().zip(&row.estimates) {
            ok.0 &= estimate.ru.is_some();
            ok.1 &= estimate.ara.is_some();
        }
    }

    let verdicts: Vec<Vec<ZoneVerdict>> = (0..fine.len())
        .map(|z| {
            (0..columns.len())
                .map(|c| {
                    let target = fine_values[c][z];
                    let diff = |aggregate: Option<f64>, ok: bool| {
                        target.zip(aggregate).filter(|_| ok).map(|(t, a)| (t - a).abs())
                    };
                    let ru_diff = diff(aggregates[z][c].ru, direct[z][c].0);
                    let ara_diff = diff(aggregates[z][c].ara, direct[z][c].1);
                    ZoneVerdict { proxy: verdict(ru_diff, ara_diff), ru_diff, ara_diff }
                })
                .collect()
        })
        .collect();

    // one failure per fine zone and attribute without a verdict; its parcels keep their other selections
    let mut populated = vec![false; fine.len()];
    for row in fine_table.rows() { populated[row.zone] = true }
    for (z, zone) in verdicts.iter().enumerate() {
        if !populated[z] { continue }
        for (column, verdict) in columns.iter().zip(zone) {
            if verdict.proxy.is_none() {
                diagnostics.fail(strict, fine.undefined_weight(z, format!("{column}: neither proxy can be evaluated")))?;
            }
        }
    }

    let rows = fine_table.rows().iter()
        .map(|row| {
            let selections = verdicts[row.zone].iter().zip(&row.estimates)
                .map(|(zone, estimate)| {
                    let proxy = zone.proxy?;
                    Some(Selection {
                        proxy,
                        value: estimate.get(proxy)?,
                        alternative: estimate.get(proxy.other()),
                        ru_diff: zone.ru_diff,
                        ara_diff: zone.ara_diff,
                    })
                })
                .collect();
            ExpertRow { parcel_id: row.parcel_id.clone(), zone_id: row.zone_id.clone(), selections }
        })
        .collect::<Vec<_>>();

    tracing::info!(
        coarse_zones = coarse.len(),
        fine_zones = fine.len(),
        parcels = rows.len(),
        "expert selection complete"
    );
    Ok(Outcome { table: ExpertTable::new(columns, rows).with_naming(options.naming.clone()), diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smaller_error_wins_and_ties_go_to_residential_units() {
        assert_eq!(verdict(Some(1.0), Some(2.0)), Some(Proxy::ResidentialUnits));
        assert_eq!(verdict(Some(3.0), Some(2.0)), Some(Proxy::AdjustedArea));
        assert_eq!(verdict(Some(2.0), Some(2.0)), Some(Proxy::ResidentialUnits));
    }

    #[test]
    fn a_proxy_without_error_cannot_win() {
        assert_eq!(verdict(None, Some(50.0)), Some(Proxy::AdjustedArea));
        assert_eq!(verdict(Some(50.0), None), Some(Proxy::ResidentialUnits));
        assert_eq!(verdict(None, None), None);
    }

    #[test]
    fn aggregate_sums_until_an_estimate_is_missing() {
        let mut aggregate = Aggregate::default();
        aggregate.add(&ProxyEstimate { ru: Some(2.0), ara: Some(1.0) });
        aggregate.add(&ProxyEstimate { ru: Some(3.0), ara: None });
        assert_eq!(aggregate.ru, Some(5.0));
        assert_eq!(aggregate.ara, None);
    }
}
