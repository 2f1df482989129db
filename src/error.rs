use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while preparing inputs or allocating values.
///
/// Call-level problems (a missing column, a malformed class map) abort the whole call.
/// Unit-level problems are collected in [`Diagnostics`] unless strict mode is on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("column {column:?} not found in {layer} layer")]
    MissingColumn { layer: String, column: String },

    #[error("{layer} layer has {geometries} geometries but {rows} attribute rows")]
    LengthMismatch { layer: String, geometries: usize, rows: usize },

    #[error("weight for {layer} unit {unit:?} is undefined: {reason}")]
    UndefinedWeight { layer: String, unit: String, reason: String },

    #[error("region {region:?} intersecting source {source_id:?} has class {class:?}, which is not in the class map")]
    UnclassifiedRegion { source_id: String, region: String, class: String },

    #[error("{layer} unit {unit:?} is not contained in any zone")]
    UncontainedUnit { layer: String, unit: String },

    #[error("{layer} unit {unit:?} has a null or non-finite value in column {column:?}")]
    InvalidValue { layer: String, unit: String, column: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Value a source unit could not place anywhere because its regions ran out of capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    pub source_id: String,
    pub attribute: String,
    pub unallocated: f64,
}

/// Per-unit failures and capacity warnings gathered during a batch call.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub failures: Vec<Error>,
    pub residuals: Vec<Residual>,
}

impl Diagnostics {
    /// True if no unit failed and no value was left unallocated.
    #[inline] pub fn is_clean(&self) -> bool { self.failures.is_empty() && self.residuals.is_empty() }

    /// Record a unit failure, or return it immediately in strict mode.
    pub(crate) fn fail(&mut self, strict: bool, error: Error) -> Result<()> {
        if strict { return Err(error) }
        tracing::warn!(%error, "unit skipped");
        self.failures.push(error);
        Ok(())
    }

    pub(crate) fn residual(&mut self, residual: Residual) {
        tracing::warn!(
            source = %residual.source_id,
            attribute = %residual.attribute,
            unallocated = residual.unallocated,
            "capacity exhausted"
        );
        self.residuals.push(residual);
    }

    /// Take over another run's diagnostics, dropping failures already reported here.
    /// Failures name their layer and unit, so only the same failure on the same unit is dropped.
    pub(crate) fn absorb(&mut self, other: Diagnostics) {
        for failure in other.failures {
            let message = failure.to_string();
            if !self.failures.iter().any(|f| f.to_string() == message) {
                self.failures.push(failure);
            }
        }
        self.residuals.extend(other.residuals);
    }

    /// Total unallocated value for one attribute across all residuals.
    pub fn unallocated(&self, attribute: &str) -> f64 {
        self.residuals.iter()
            .filter(|r| r.attribute == attribute)
            .map(|r| r.unallocated)
            .sum()
    }
}

/// Successfully computed rows together with the diagnostics of the units that were skipped.
#[derive(Debug)]
pub struct Outcome<T> {
    pub table: T,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_mode_returns_first_failure() {
        let mut diagnostics = Diagnostics::default();
        let err = diagnostics
            .fail(true, Error::InvalidConfig("bad".into()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(diagnostics.failures.is_empty());
    }

    #[test]
    fn lenient_mode_collects_failures() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.fail(false, Error::InvalidConfig("bad".into())).unwrap();
        assert_eq!(diagnostics.failures.len(), 1);
        assert!(!diagnostics.is_clean());
    }

    #[test]
    fn absorb_keeps_same_unit_id_from_another_layer() {
        let undefined = |layer: &str| Error::UndefinedWeight { layer: layer.into(), unit: "1".into(), reason: "zero total".into() };
        let uncontained = || Error::UncontainedUnit { layer: "parcels".into(), unit: "p9".into() };

        let mut fine = Diagnostics::default();
        fine.fail(false, undefined("fine")).unwrap();
        fine.fail(false, uncontained()).unwrap();

        let mut coarse = Diagnostics::default();
        coarse.fail(false, undefined("coarse")).unwrap();
        coarse.fail(false, uncontained()).unwrap();

        fine.absorb(coarse);
        let messages: Vec<String> = fine.failures.iter().map(|f| f.to_string()).collect();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().any(|m| m.starts_with("weight for coarse unit")));
    }

    #[test]
    fn unallocated_sums_per_attribute() {
        let mut diagnostics = Diagnostics::default();
        for (source_id, attribute, unallocated) in [("a", "pop", 2.0), ("b", "pop", 3.0), ("a", "hh", 7.0)] {
            diagnostics.residual(Residual { source_id: source_id.into(), attribute: attribute.into(), unallocated });
        }
        assert_eq!(diagnostics.unallocated("pop"), 5.0);
        assert_eq!(diagnostics.unallocated("hh"), 7.0);
        assert_eq!(diagnostics.unallocated("jobs"), 0.0);
    }
}
