mod class_map;
mod options;

pub use class_map::{ClassMap, ClassRule, PercentMap, ThresholdMap};
pub use options::{Options, OutputNaming, ParcelColumns, UnlistedClass};
