#![doc = "Dasymetric interpolation between mismatched polygon layers"]
mod config;
mod error;
mod geom;
mod layer;
mod methods;
mod table;
mod weight;

#[doc(inline)]
pub use config::{ClassMap, ClassRule, Options, OutputNaming, ParcelColumns, PercentMap, ThresholdMap, UnlistedClass};

#[doc(inline)]
pub use error::{Diagnostics, Error, Outcome, Residual, Result};

#[doc(inline)]
pub use geom::{Geometries, Intersection, Overlay, PlanarOverlay};

#[doc(inline)]
pub use layer::Layer;

#[doc(inline)]
pub use methods::{
    adjusted_residential_area, areal, binary, constrained_allocate, expert_select, n_class,
    parcel_proxy_allocate, ClassSchedule, ZeroTotalUnits,
};

#[doc(inline)]
pub use table::{
    AllocationRow, AllocationTable, ExpertRow, ExpertTable, ParcelRow, ParcelTable, Proxy,
    ProxyEstimate, Selection, TargetRow, TargetTable,
};

#[doc(inline)]
pub use weight::{areal_weight, ZeroReference};
