use geo::MultiPolygon;
use polars::prelude::{Column, DataFrame};

use crate::{config::OutputNaming, error::Result};

/// Values placed into one intersection of a source unit with a region.
#[derive(Debug, Clone)]
pub struct AllocationRow {
    pub source_id: String,
    pub region_id: String,
    pub class: Option<String>,
    pub area: f64,
    pub geometry: MultiPolygon<f64>,
    /// One value per attribute, in the table's attribute order.
    pub values: Vec<f64>,
}

/// Intersection-level output: one row per (source unit × contributing region).
#[derive(Debug, Clone, Default)]
pub struct AllocationTable {
    attributes: Vec<String>,
    rows: Vec<AllocationRow>,
    naming: OutputNaming,
}

impl AllocationTable {
    pub(crate) fn new(attributes: &[&str], rows: Vec<AllocationRow>) -> Self {
        Self { attributes: attributes.iter().map(|a| a.to_string()).collect(), rows, naming: OutputNaming::default() }
    }

    /// Column naming used by `to_dataframe` and `to_csv_string`.
    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    #[inline] pub fn naming(&self) -> &OutputNaming { &self.naming }

    #[inline] pub fn attributes(&self) -> &[String] { &self.attributes }

    #[inline] pub fn rows(&self) -> &[AllocationRow] { &self.rows }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    fn attribute_index(&self, attribute: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }

    /// Value allocated to the intersection of `source_id` and `region_id`.
    pub fn value(&self, source_id: &str, region_id: &str, attribute: &str) -> Option<f64> {
        let k = self.attribute_index(attribute)?;
        self.rows.iter()
            .find(|row| row.source_id == source_id && row.region_id == region_id)
            .map(|row| row.values[k])
    }

    /// Sum of the values allocated out of one source unit.
    pub fn source_total(&self, source_id: &str, attribute: &str) -> Option<f64> {
        let k = self.attribute_index(attribute)?;
        Some(self.rows.iter()
            .filter(|row| row.source_id == source_id)
            .map(|row| row.values[k])
            .sum())
    }

    /// Tabular view without geometry: `source_id`, `region_id`, `class`, `area`, then one column per attribute.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let naming = &self.naming;
        let mut columns = vec![
            Column::new("source_id".into(), self.rows.iter().map(|r| r.source_id.as_str()).collect::<Vec<_>>()),
            Column::new("region_id".into(), self.rows.iter().map(|r| r.region_id.as_str()).collect::<Vec<_>>()),
            Column::new("class".into(), self.rows.iter().map(|r| r.class.as_deref()).collect::<Vec<_>>()),
            Column::new("area".into(), self.rows.iter().map(|r| r.area).collect::<Vec<_>>()),
        ];
        for (k, attribute) in self.attributes.iter().enumerate() {
            columns.push(Column::new(
                naming.apply(attribute).into(),
                self.rows.iter().map(|r| r.values[k]).collect::<Vec<_>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        super::write_csv_string(self.to_dataframe()?)
    }
}

/// Values summed onto one target polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRow {
    pub target_id: String,
    pub values: Vec<f64>,
}

/// Target-level output of plain areal weighting: one row per target polygon.
#[derive(Debug, Clone, Default)]
pub struct TargetTable {
    attributes: Vec<String>,
    rows: Vec<TargetRow>,
    naming: OutputNaming,
}

impl TargetTable {
    pub(crate) fn new(attributes: &[&str], rows: Vec<TargetRow>) -> Self {
        Self { attributes: attributes.iter().map(|a| a.to_string()).collect(), rows, naming: OutputNaming::default() }
    }

    /// Column naming used by `to_dataframe` and `to_csv_string`.
    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    #[inline] pub fn naming(&self) -> &OutputNaming { &self.naming }

    #[inline] pub fn attributes(&self) -> &[String] { &self.attributes }

    #[inline] pub fn rows(&self) -> &[TargetRow] { &self.rows }

    pub fn value(&self, target_id: &str, attribute: &str) -> Option<f64> {
        let k = self.attributes.iter().position(|a| a == attribute)?;
        self.rows.iter().find(|row| row.target_id == target_id).map(|row| row.values[k])
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let naming = &self.naming;
        let mut columns = vec![
            Column::new("target_id".into(), self.rows.iter().map(|r| r.target_id.as_str()).collect::<Vec<_>>()),
        ];
        for (k, attribute) in self.attributes.iter().enumerate() {
            columns.push(Column::new(
                naming.apply(attribute).into(),
                self.rows.iter().map(|r| r.values[k]).collect::<Vec<_>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        super::write_csv_string(self.to_dataframe()?)
    }
}
