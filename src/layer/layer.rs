use geo::MultiPolygon;
use polars::prelude::{Column, DataFrame, DataType};

use crate::{error::{Error, Result}, geom::Geometries};

/// A polygon layer: one attribute row per geometry, identified by an id column.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    ids: Vec<String>,
    geoms: Geometries,
    data: DataFrame,
}

impl Layer {
    /// Build a layer from shapes and an attribute table with one row per shape.
    /// `name` only labels the layer in error messages. Null ids fall back to `#<row>`.
    pub fn new(name: &str, shapes: Vec<MultiPolygon<f64>>, data: DataFrame, id_column: &str) -> Result<Self> {
        if shapes.len() != data.height() {
            return Err(Error::LengthMismatch {
                layer: name.to_string(),
                geometries: shapes.len(),
                rows: data.height(),
            });
        }

        let mut layer = Self { name: name.to_string(), ids: Vec::new(), geoms: Geometries::new(shapes), data };
        layer.ids = layer.labels(id_column)?.into_iter()
            .enumerate()
            .map(|(i, id)| id.unwrap_or_else(|| format!("#{i}")))
            .collect();
        Ok(layer)
    }

    #[inline] pub fn name(&self) -> &str { &self.name }

    #[inline] pub fn len(&self) -> usize { self.ids.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    #[inline] pub fn ids(&self) -> &[String] { &self.ids }

    #[inline] pub fn id(&self, i: usize) -> &str { &self.ids[i] }

    #[inline] pub fn geoms(&self) -> &Geometries { &self.geoms }

    #[inline] pub fn data(&self) -> &DataFrame { &self.data }

    fn column(&self, name: &str) -> Result<&Column> {
        self.data.column(name).map_err(|_| Error::MissingColumn {
            layer: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Read a column as floats. Nulls, unparseable and non-finite entries become `None`.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.column(name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().map(|v| v.filter(|v| v.is_finite())).collect())
    }

    /// Read several numeric columns, failing on the first one that is absent.
    pub fn numeric_columns(&self, names: &[&str]) -> Result<Vec<Vec<Option<f64>>>> {
        names.iter().map(|name| self.numeric(name)).collect()
    }

    /// Read a column as text labels (numbers are rendered with their default formatting).
    pub fn labels(&self, name: &str) -> Result<Vec<Option<String>>> {
        let column = self.column(name)?.cast(&DataType::String)?;
        Ok(column.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    /// Error for a missing or non-finite value of `column` at row `i`.
    pub(crate) fn invalid_value(&self, i: usize, column: &str) -> Error {
        Error::InvalidValue { layer: self.name.clone(), unit: self.ids[i].clone(), column: column.to_string() }
    }

    /// Error for a weight of row `i` that has no valid reference.
    pub(crate) fn undefined_weight(&self, i: usize, reason: impl Into<String>) -> Error {
        Error::UndefinedWeight { layer: self.name.clone(), unit: self.ids[i].clone(), reason: reason.into() }
    }
}
