mod areal;
mod binary;
mod constrained;
mod expert;
mod n_class;
mod parcel;

pub use areal::areal;
pub use binary::binary;
pub use constrained::{constrained_allocate, ClassSchedule};
pub use expert::expert_select;
pub use n_class::n_class;
pub use parcel::{adjusted_residential_area, parcel_proxy_allocate, ZeroTotalUnits};

use crate::{
    error::{Diagnostics, Error, Residual, Result},
    layer::Layer,
};

/// Unallocated value below this fraction of the source value is rounding, not lost capacity.
const RESIDUAL_TOLERANCE: f64 = 1e-9;

/// Rows and capacity warnings produced for one unit.
pub(crate) struct UnitRows<R> {
    pub(crate) rows: Vec<R>,
    pub(crate) residuals: Vec<Residual>,
}

pub(crate) type UnitResult<R> = std::result::Result<UnitRows<R>, Vec<Error>>;

/// Merge per-unit results in unit order. In strict mode the first failure aborts.
pub(crate) fn collect_units<R>(results: Vec<UnitResult<R>>, strict: bool) -> Result<(Vec<R>, Diagnostics)> {
    let mut diagnostics = Diagnostics::default();
    let mut rows = Vec::new();
    for result in results {
        match result {
            Ok(unit) => {
                rows.extend(unit.rows);
                for residual in unit.residuals { diagnostics.residual(residual) }
            }
            Err(errors) => for error in errors { diagnostics.fail(strict, error)? },
        }
    }
    Ok((rows, diagnostics))
}

/// Values of every requested column at row `i`, or one `InvalidValue` per unusable column.
pub(crate) fn unit_values(layer: &Layer, i: usize, columns: &[&str], values: &[Vec<Option<f64>>]) -> std::result::Result<Vec<f64>, Vec<Error>> {
    let mut out = Vec::with_capacity(columns.len());
    let mut errors = Vec::new();
    for (column, values) in columns.iter().zip(values) {
        match values[i] {
            Some(value) => out.push(value),
            None => errors.push(layer.invalid_value(i, column)),
        }
    }
    if errors.is_empty() { Ok(out) } else { Err(errors) }
}

/// A residual worth reporting when `allocated` falls short of `value`.
pub(crate) fn residual(source_id: &str, attribute: &str, value: f64, allocated: f64) -> Option<Residual> {
    let unallocated = value - allocated;
    (unallocated.abs() > RESIDUAL_TOLERANCE * value.abs().max(1.0)).then(|| Residual {
        source_id: source_id.to_string(),
        attribute: attribute.to_string(),
        unallocated,
    })
}
