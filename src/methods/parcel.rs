use super::residual;
use crate::{
    config::{Options, ParcelColumns},
    error::{Diagnostics, Error, Outcome, Result},
    layer::Layer,
    table::{ParcelRow, ParcelTable, ProxyEstimate},
    weight::areal_weight,
};

/// A parcel with residential units but no positive unit count to apportion its building area by.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("total units {0} must be positive to apportion building area to residential units")]
pub struct ZeroTotalUnits(pub f64);

/// Residential area of a parcel, estimated as `building_area × residential_units / total_units`
/// when the recorded residential area is zero but the parcel has residential units.
pub fn adjusted_residential_area(
    total_units: f64,
    residential_units: f64,
    building_area: f64,
    residential_area: f64,
) -> std::result::Result<f64, ZeroTotalUnits> {
    if residential_area != 0.0 || residential_units == 0.0 {
        return Ok(residential_area);
    }
    if !total_units.is_finite() || total_units <= 0.0 {
        return Err(ZeroTotalUnits(total_units));
    }
    Ok(building_area * residential_units / total_units)
}

/// Disaggregate zone values to parcels with two proxies: residential units and adjusted
/// residential area.
///
/// Each parcel belongs to the zone containing its interior point. For every column the parcel
/// gets `zone_value × parcel_ru / zone_ru_total` and `zone_value × parcel_ara / zone_ara_total`.
/// A zone whose total for a proxy is zero reports `UndefinedWeight` and its parcels carry no
/// estimate for that proxy.
pub fn parcel_proxy_allocate(
    zones: &Layer,
    parcels: &Layer,
    parcel_columns: &ParcelColumns,
    columns: &[&str],
    options: &Options,
) -> Result<Outcome<ParcelTable>> {
    let mut diagnostics = Diagnostics::default();
    let table = allocate(zones, parcels, parcel_columns, columns, options.strict, &mut diagnostics)?;
    Ok(Outcome { table: table.with_naming(options.naming.clone()), diagnostics })
}

/// Proxy attributes of one parcel that could be placed in a zone.
struct Placed {
    parcel: usize,
    zone: usize,
    residential_units: f64,
    adjusted_area: f64,
}

pub(super) fn allocate(
    zones: &Layer,
    parcels: &Layer,
    parcel_columns: &ParcelColumns,
    columns: &[&str],
    strict: bool,
    diagnostics: &mut Diagnostics,
) -> Result<ParcelTable> {
    let total_units = parcels.numeric(&parcel_columns.total_units)?;
    let residential_units = parcels.numeric(&parcel_columns.residential_units)?;
    let building_area = parcels.numeric(&parcel_columns.building_area)?;
    let residential_area = parcels.numeric(&parcel_columns.residential_area)?;
    let values = zones.numeric_columns(columns)?;

    let crosswalk = parcels.geoms().crosswalk(zones.geoms());

    let mut placed = Vec::with_capacity(parcels.len());
    for (p, zone) in crosswalk.into_iter().enumerate() {
        let Some(zone) = zone else {
            diagnostics.fail(strict, Error::UncontainedUnit {
                layer: parcels.name().to_string(),
                unit: parcels.id(p).to_string(),
            })?;
            continue;
        };
        let Some(ru) = residential_units[p] else {
            diagnostics.fail(strict, parcels.invalid_value(p, &parcel_columns.residential_units))?;
            continue;
        };
        let Some(ra) = residential_area[p] else {
            diagnostics.fail(strict, parcels.invalid_value(p, &parcel_columns.residential_area))?;
            continue;
        };

        // total units and building area only matter when the area has to be estimated
        let ara = match (total_units[p], building_area[p]) {
            (Some(tu), Some(ba)) => adjusted_residential_area(tu, ru, ba, ra),
            (None, _) if ra == 0.0 && ru != 0.0 => {
                diagnostics.fail(strict, parcels.invalid_value(p, &parcel_columns.total_units))?;
                continue;
            }
            (_, None) if ra == 0.0 && ru != 0.0 => {
                diagnostics.fail(strict, parcels.invalid_value(p, &parcel_columns.building_area))?;
                continue;
            }
            _ => Ok(ra),
        };
        let ara = match ara {
            Ok(ara) => ara,
            Err(cause) => {
                diagnostics.fail(strict, parcels.undefined_weight(p, cause.to_string()))?;
                continue;
            }
        };

        placed.push(Placed { parcel: p, zone, residential_units: ru, adjusted_area: ara });
    }

    let mut ru_totals = vec![0.0; zones.len()];
    let mut ara_totals = vec![0.0; zones.len()];
    let mut counts = vec![0usize; zones.len()];
    for parcel in &placed {
        ru_totals[parcel.zone] += parcel.residential_units;
        ara_totals[parcel.zone] += parcel.adjusted_area;
        counts[parcel.zone] += 1;
    }

    for z in 0..zones.len() {
        let zone_id = zones.id(z);
        if counts[z] == 0 {
            for (column, values) in columns.iter().zip(&values) {
                if let Some(value) = values[z] {
                    if let Some(lost) = residual(zone_id, column, value, 0.0) { diagnostics.residual(lost) }
                }
            }
            continue;
        }
        if ru_totals[z] <= 0.0 {
            diagnostics.fail(strict, zones.undefined_weight(z, "zone residential unit total is zero"))?;
        }
        if ara_totals[z] <= 0.0 {
            diagnostics.fail(strict, zones.undefined_weight(z, "zone adjusted residential area total is zero"))?;
        }
        for (column, values) in columns.iter().zip(&values) {
            if values[z].is_none() { diagnostics.fail(strict, zones.invalid_value(z, column))? }
        }
    }

    let rows = placed.into_iter()
        .map(|parcel| {
            let z = parcel.zone;
            let estimates = values.iter()
                .map(|values| ProxyEstimate {
                    ru: values[z].zip(areal_weight(parcel.residential_units, ru_totals[z]).ok()).map(|(v, w)| v * w),
                    ara: values[z].zip(areal_weight(parcel.adjusted_area, ara_totals[z]).ok()).map(|(v, w)| v * w),
                })
                .collect();
            ParcelRow {
                parcel_id: parcels.id(parcel.parcel).to_string(),
                zone_id: zones.id(z).to_string(),
                residential_units: parcel.residential_units,
                adjusted_area: parcel.adjusted_area,
                estimates,
                parcel: parcel.parcel,
                zone: z,
            }
        })
        .collect::<Vec<_>>();

    tracing::info!(zones = zones.len(), parcels = parcels.len(), placed = rows.len(), "parcel proxy allocation complete");
    Ok(ParcelTable::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_residential_area_is_estimated_from_building_area() {
        assert_eq!(adjusted_residential_area(4.0, 4.0, 1000.0, 0.0), Ok(1000.0));
        assert_eq!(adjusted_residential_area(4.0, 1.0, 1000.0, 0.0), Ok(250.0));
    }

    #[test]
    fn recorded_residential_area_is_kept() {
        assert_eq!(adjusted_residential_area(4.0, 4.0, 1000.0, 320.0), Ok(320.0));
        assert_eq!(adjusted_residential_area(0.0, 0.0, 1000.0, 0.0), Ok(0.0));
    }

    #[test]
    fn zero_total_units_cannot_be_estimated() {
        assert_eq!(adjusted_residential_area(0.0, 2.0, 1000.0, 0.0), Err(ZeroTotalUnits(0.0)));
        let message = ZeroTotalUnits(0.0).to_string();
        assert!(message.contains("total units") && !message.contains("area 0"));
    }
}
