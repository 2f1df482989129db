use std::fmt;

use polars::prelude::{Column, DataFrame};

use crate::{config::OutputNaming, error::Result};

/// The two parcel-level proxies used to split a zone value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Proxy {
    /// Residential unit count.
    ResidentialUnits,
    /// Adjusted residential area.
    AdjustedArea,
}

impl Proxy {
    /// Column prefix used when rendering estimates of this proxy.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::ResidentialUnits => "ru_derived_",
            Self::AdjustedArea => "ara_derived_",
        }
    }

    #[inline]
    pub fn other(&self) -> Self {
        match self {
            Self::ResidentialUnits => Self::AdjustedArea,
            Self::AdjustedArea => Self::ResidentialUnits,
        }
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResidentialUnits => write!(f, "ru"),
            Self::AdjustedArea => write!(f, "ara"),
        }
    }
}

/// Both proxy estimates for one parcel and attribute. `None` where the zone total was zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProxyEstimate {
    pub ru: Option<f64>,
    pub ara: Option<f64>,
}

impl ProxyEstimate {
    #[inline]
    pub fn get(&self, proxy: Proxy) -> Option<f64> {
        match proxy {
            Proxy::ResidentialUnits => self.ru,
            Proxy::AdjustedArea => self.ara,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParcelRow {
    pub parcel_id: String,
    pub zone_id: String,
    pub residential_units: f64,
    pub adjusted_area: f64,
    /// One estimate pair per attribute, in the table's attribute order.
    pub estimates: Vec<ProxyEstimate>,
    pub(crate) parcel: usize,
    pub(crate) zone: usize,
}

/// Parcel-level output of the two-proxy disaggregation.
#[derive(Debug, Clone, Default)]
pub struct ParcelTable {
    attributes: Vec<String>,
    rows: Vec<ParcelRow>,
    naming: OutputNaming,
}

impl ParcelTable {
    pub(crate) fn new(attributes: &[&str], rows: Vec<ParcelRow>) -> Self {
        Self { attributes: attributes.iter().map(|a| a.to_string()).collect(), rows, naming: OutputNaming::default() }
    }

    /// Column naming used by `to_dataframe` and `to_csv_string`.
    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    #[inline] pub fn naming(&self) -> &OutputNaming { &self.naming }

    #[inline] pub fn attributes(&self) -> &[String] { &self.attributes }

    #[inline] pub fn rows(&self) -> &[ParcelRow] { &self.rows }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Estimate of `attribute` for one parcel under one proxy.
    pub fn estimate(&self, parcel_id: &str, attribute: &str, proxy: Proxy) -> Option<f64> {
        let k = self.attributes.iter().position(|a| a == attribute)?;
        self.rows.iter()
            .find(|row| row.parcel_id == parcel_id)
            .and_then(|row| row.estimates[k].get(proxy))
    }

    /// Tabular view with `ru_derived_<col>` and `ara_derived_<col>` per attribute; undefined estimates are null.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let naming = &self.naming;
        let mut columns = vec![
            Column::new("parcel_id".into(), self.rows.iter().map(|r| r.parcel_id.as_str()).collect::<Vec<_>>()),
            Column::new("zone_id".into(), self.rows.iter().map(|r| r.zone_id.as_str()).collect::<Vec<_>>()),
            Column::new("residential_units".into(), self.rows.iter().map(|r| r.residential_units).collect::<Vec<_>>()),
            Column::new("adjusted_residential_area".into(), self.rows.iter().map(|r| r.adjusted_area).collect::<Vec<_>>()),
        ];
        for proxy in [Proxy::ResidentialUnits, Proxy::AdjustedArea] {
            for (k, attribute) in self.attributes.iter().enumerate() {
                columns.push(Column::new(
                    naming.apply(&format!("{}{attribute}", proxy.prefix())).into(),
                    self.rows.iter().map(|r| r.estimates[k].get(proxy)).collect::<Vec<_>>(),
                ));
            }
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        super::write_csv_string(self.to_dataframe()?)
    }
}

/// The proxy chosen for one attribute of one parcel, with the evidence behind the choice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub proxy: Proxy,
    pub value: f64,
    /// The estimate of the proxy that lost, if it was defined.
    pub alternative: Option<f64>,
    /// Zone-level aggregate errors; `None` where the proxy could not be evaluated.
    pub ru_diff: Option<f64>,
    pub ara_diff: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ExpertRow {
    pub parcel_id: String,
    pub zone_id: String,
    /// One entry per attribute; `None` where the parcel's zone has no verdict for that attribute.
    pub selections: Vec<Option<Selection>>,
}

/// Parcel-level output of the expert selector.
#[derive(Debug, Clone, Default)]
pub struct ExpertTable {
    attributes: Vec<String>,
    rows: Vec<ExpertRow>,
    naming: OutputNaming,
}

impl ExpertTable {
    pub(crate) fn new(attributes: &[&str], rows: Vec<ExpertRow>) -> Self {
        Self { attributes: attributes.iter().map(|a| a.to_string()).collect(), rows, naming: OutputNaming::default() }
    }

    /// Column naming used by `to_dataframe` and `to_csv_string`.
    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    #[inline] pub fn naming(&self) -> &OutputNaming { &self.naming }

    #[inline] pub fn attributes(&self) -> &[String] { &self.attributes }

    #[inline] pub fn rows(&self) -> &[ExpertRow] { &self.rows }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn selection(&self, parcel_id: &str, attribute: &str) -> Option<&Selection> {
        let k = self.attributes.iter().position(|a| a == attribute)?;
        self.rows.iter()
            .find(|row| row.parcel_id == parcel_id)
            .and_then(|row| row.selections[k].as_ref())
    }

    /// Tabular view: per attribute the selected value plus `_proxy`, `_alternative`, `_ru_diff`, `_ara_diff` diagnostics.
    /// Attributes without a verdict are null across all five columns.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let naming = &self.naming;
        let mut columns = vec![
            Column::new("parcel_id".into(), self.rows.iter().map(|r| r.parcel_id.as_str()).collect::<Vec<_>>()),
            Column::new("zone_id".into(), self.rows.iter().map(|r| r.zone_id.as_str()).collect::<Vec<_>>()),
        ];
        for (k, attribute) in self.attributes.iter().enumerate() {
            let name = naming.apply(attribute);
            let pick = |f: fn(&Selection) -> Option<f64>| {
                self.rows.iter().map(|r| r.selections[k].as_ref().and_then(f)).collect::<Vec<_>>()
            };

            columns.push(Column::new(name.clone().into(), pick(|s| Some(s.value))));
            columns.push(Column::new(
                format!("{name}_proxy").into(),
                self.rows.iter().map(|r| r.selections[k].map(|s| s.proxy.to_string())).collect::<Vec<_>>(),
            ));
            columns.push(Column::new(format!("{name}_alternative").into(), pick(|s| s.alternative)));
            columns.push(Column::new(format!("{name}_ru_diff").into(), pick(|s| s.ru_diff)));
            columns.push(Column::new(format!("{name}_ara_diff").into(), pick(|s| s.ara_diff)));
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        super::write_csv_string(self.to_dataframe()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_estimates_render_as_nulls() {
        let table = ParcelTable::new(&["pop"], vec![ParcelRow {
            parcel_id: "p1".into(),
            zone_id: "z1".into(),
            residential_units: 0.0,
            adjusted_area: 10.0,
            estimates: vec![ProxyEstimate { ru: None, ara: Some(5.0) }],
            parcel: 0,
            zone: 0,
        }]);

        let df = table.to_dataframe().unwrap();
        assert_eq!(df.column("ru_derived_pop").unwrap().null_count(), 1);
        assert_eq!(df.column("ara_derived_pop").unwrap().null_count(), 0);
        assert_eq!(table.estimate("p1", "pop", Proxy::AdjustedArea), Some(5.0));
        assert_eq!(table.estimate("p1", "pop", Proxy::ResidentialUnits), None);
    }

    #[test]
    fn expert_columns_carry_diagnostics() {
        let table = ExpertTable::new(&["pop"], vec![ExpertRow {
            parcel_id: "p1".into(),
            zone_id: "f1".into(),
            selections: vec![Some(Selection {
                proxy: Proxy::AdjustedArea,
                value: 4.0,
                alternative: Some(6.0),
                ru_diff: Some(3.0),
                ara_diff: Some(1.0),
            })],
        }])
        .with_naming(OutputNaming::Suffix("_expert".into()));

        let df = table.to_dataframe().unwrap();
        let names: Vec<_> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec![
            "parcel_id", "zone_id", "pop_expert", "pop_expert_proxy",
            "pop_expert_alternative", "pop_expert_ru_diff", "pop_expert_ara_diff",
        ]);
        assert_eq!(table.selection("p1", "pop").map(|s| s.proxy), Some(Proxy::AdjustedArea));
    }

    #[test]
    fn missing_verdicts_render_as_nulls() {
        let selection = Selection { proxy: Proxy::ResidentialUnits, value: 2.0, alternative: None, ru_diff: Some(0.5), ara_diff: None };
        let table = ExpertTable::new(&["pop", "hh"], vec![
            ExpertRow { parcel_id: "p1".into(), zone_id: "f1".into(), selections: vec![Some(selection), None] },
            ExpertRow { parcel_id: "p2".into(), zone_id: "f1".into(), selections: vec![Some(selection), None] },
        ]);

        let df = table.to_dataframe().unwrap();
        assert_eq!(df.column("pop").unwrap().null_count(), 0);
        assert_eq!(df.column("pop_ara_diff").unwrap().null_count(), 2);
        for column in ["hh", "hh_proxy", "hh_alternative", "hh_ru_diff", "hh_ara_diff"] {
            assert_eq!(df.column(column).unwrap().null_count(), 2, "{column}");
        }
        assert_eq!(table.selection("p1", "hh"), None);
        assert_eq!(table.selection("p2", "pop"), Some(&selection));
    }

    #[test]
    fn proxies_pair_up() {
        assert_eq!(Proxy::ResidentialUnits.other(), Proxy::AdjustedArea);
        assert_eq!(Proxy::AdjustedArea.to_string(), "ara");
    }
}
