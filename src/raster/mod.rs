//! Raster bands, pixel types and whole-raster copies

mod buffer;
mod copy;
mod gcp;
mod rasterband;
mod types;

pub use buffer::{Buffer, ByteBuffer};
pub use copy::copy_whole_raster;
pub(crate) use copy::copy_whole_raster_with;
pub use gcp::Gcp;
pub use rasterband::RasterBand;
pub use types::{DataType, PixelType};

/// Key/value pairs passed to [`Driver::create_with_band_type_with_options`](crate::Driver::create_with_band_type_with_options)
/// and friends, e.g. `[("COMPRESS", "NONE")]`.
pub type RasterCreationOptions = crate::string_list::NameValueList;

#[cfg(test)]
mod tests;
