mod allocation;
mod parcel;

use polars::prelude::{CsvWriter, DataFrame, SerWriter};

use crate::error::Result;

pub use allocation::{AllocationRow, AllocationTable, TargetRow, TargetTable};
pub use parcel::{ExpertRow, ExpertTable, ParcelRow, ParcelTable, Proxy, ProxyEstimate, Selection};

/// Render a DataFrame as CSV text with a header row.
pub(crate) fn write_csv_string(mut df: DataFrame) -> Result<String> {
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer).finish(&mut df)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
