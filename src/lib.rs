#![crate_name = "geodata"]
#![crate_type = "lib"]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Driver registry and dataset abstraction for geospatial data.
//!
//! Formats are implemented as drivers ([`FormatDriver`]) registered with the process-wide
//! [`DriverManager`]. Opening a resource probes every registered driver and hands back a
//! [`Dataset`] backed by the first one that claims it.
//!
//! ## Use
//!
//! ```
//! use geodata::raster::Buffer;
//! use geodata::{DriverManager, GeoTransformEx};
//!
//! # fn main() -> geodata::errors::Result<()> {
//! let driver = DriverManager::get_driver_by_name("MEM")?;
//! let mut dataset = driver.create_with_band_type::<u8, _>("", 4, 2, 1)?;
//! dataset.set_geo_transform(&[100.0, 10.0, 0.0, 50.0, 0.0, -10.0])?;
//!
//! let mut band = dataset.rasterband(1)?;
//! band.write((0, 0), &Buffer::new((4, 2), vec![1u8, 2, 3, 4, 5, 6, 7, 8]))?;
//! let pixels = band.read_as::<u8>((2, 1), (2, 1))?;
//! assert_eq!(pixels.data, vec![7, 8]);
//!
//! let (x, y) = dataset.geo_transform()?.apply(1.0, 1.0);
//! assert_eq!((x, y), (110.0, 40.0));
//! # Ok(())
//! # }
//! ```
//!
//! ### Data Model
//!
//! * [`Dataset`]: an open raster and/or vector resource
//! * [`raster::RasterBand`]: one band of a raster dataset
//! * [`vector::Defn`]: the schema of a vector layer
//! * [`Driver`]: a registered format, able to identify, open, create and copy datasets
//!
//! ### Built-in drivers
//!
//! * `MEM`: in-memory rasters and layer schemas
//! * `AAIGrid`: Arc/Info ASCII grids, read and create-copy

pub mod config;
mod dataset;
mod driver;
mod driver_manager;
pub mod drivers;
pub mod errors;
mod geo_transform;
mod metadata;
mod options;
mod progress;
pub mod raster;
pub mod spatial_ref;
mod string_list;
pub mod vector;
pub mod vsi;

pub use dataset::{Dataset, FormatDataset};
pub use driver::{
    creation_option_list_xml, validate_creation_options, CreationOptionDefn, Driver,
    DriverCapabilities, FormatDriver, OpenInfo, OptionKind, ValidationWarning, HEADER_BYTES,
};
pub use driver_manager::{DriverManager, DriverRegistry};
pub use geo_transform::{GeoTransform, GeoTransformEx, DEFAULT_GEO_TRANSFORM};
pub use metadata::{Metadata, MetadataStore};
pub use options::{Access, DatasetOptions, OpenFlags};
pub use progress::{Progress, ProgressCallback};
pub use spatial_ref::SpatialRef;
pub use string_list::NameValueList;

#[cfg(test)]
pub(crate) mod test_utils;
