use serde::Deserialize;

use crate::error::Result;

/// How output attribute columns are named when a table is rendered as a DataFrame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputNaming {
    Suffix(String),
    Prefix(String),
}

impl Default for OutputNaming {
    fn default() -> Self { Self::Suffix(String::new()) }
}

impl OutputNaming {
    pub fn apply(&self, column: &str) -> String {
        match self {
            Self::Suffix(suffix) => format!("{column}{suffix}"),
            Self::Prefix(prefix) => format!("{prefix}{column}"),
        }
    }
}

/// What to do with an intersecting region whose class label is not in the class map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlistedClass {
    /// Report `UnclassifiedRegion` for the record and skip its source unit.
    #[default]
    Error,
    /// Treat the region as having no density cap. Only the constrained allocator has caps;
    /// `n_class` rejects this policy as `InvalidConfig`.
    Unconstrained,
    /// Remove the region's area from the source unit up front; it receives nothing.
    /// In `n_class` the region weighs zero.
    Exclude,
}

/// Settings shared by every allocation method.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub naming: OutputNaming,
    /// Abort on the first unit-level failure instead of collecting diagnostics.
    pub strict: bool,
    pub unlisted: UnlistedClass,
}

impl Options {
    /// Parse options from JSON, e.g. `{"strict": true, "naming": {"suffix": "_lu"}}`.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_unlisted(mut self, unlisted: UnlistedClass) -> Self {
        self.unlisted = unlisted;
        self
    }
}

/// Names of the parcel attribute columns read by the parcel and expert methods.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParcelColumns {
    pub total_units: String,
    pub residential_units: String,
    pub building_area: String,
    pub residential_area: String,
}

impl Default for ParcelColumns {
    fn default() -> Self {
        Self {
            total_units: "total_units".into(),
            residential_units: "residential_units".into(),
            building_area: "building_area".into(),
            residential_area: "residential_area".into(),
        }
    }
}
