//! In-memory raster and vector datasets

use crate::dataset::FormatDataset;
use crate::driver::{CreationOptionDefn, DriverCapabilities, FormatDriver, OpenInfo, OptionKind};
use crate::errors::{GeoDataError, Result};
use crate::geo_transform::GeoTransform;
use crate::metadata::MetadataStore;
use crate::raster::{DataType, Gcp};
use crate::string_list::NameValueList;
use crate::vector::Defn;

const CREATION_OPTIONS: &[CreationOptionDefn] = &[CreationOptionDefn::new(
    "INTERLEAVE",
    OptionKind::StringSelect(&["BAND", "PIXEL"]),
    "Layout reported in the IMAGE_STRUCTURE metadata domain",
)
.with_default("BAND")];

/// The `MEM` driver. Datasets live in memory only and have no files.
#[derive(Debug, Default)]
pub struct MemDriver;

impl FormatDriver for MemDriver {
    fn short_name(&self) -> &str {
        "MEM"
    }

    fn long_name(&self) -> &str {
        "In Memory Raster"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities::RASTER | DriverCapabilities::VECTOR | DriverCapabilities::CREATE
    }

    fn creation_option_list(&self) -> &[CreationOptionDefn] {
        CREATION_OPTIONS
    }

    /// Nothing on disk belongs to this driver.
    fn identify(&self, _info: &OpenInfo) -> bool {
        false
    }

    fn create(
        &self,
        _filename: &str,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
        options: &NameValueList,
    ) -> Result<Box<dyn FormatDataset>> {
        if bands > 0 && data_type == DataType::Unknown {
            return Err(GeoDataError::BadArgument(
                "MEM bands need a known data type".to_string(),
            ));
        }
        let mut dataset = MemDataset::new(size);
        for _ in 0..bands {
            dataset.push_band(data_type)?;
        }
        if bands > 1 {
            let interleave = options
                .fetch_name_value("INTERLEAVE")
                .unwrap_or("BAND")
                .to_ascii_uppercase();
            dataset
                .metadata
                .set_item("INTERLEAVE", &interleave, "IMAGE_STRUCTURE")?;
        }
        Ok(Box::new(dataset))
    }
}

#[derive(Debug)]
struct MemBand {
    data_type: DataType,
    data: Vec<f64>,
    no_data: Option<f64>,
}

/// An in-memory dataset, also usable as a building block by other drivers.
#[derive(Debug, Default)]
pub struct MemDataset {
    size: (usize, usize),
    bands: Vec<MemBand>,
    geo_transform: Option<GeoTransform>,
    projection: String,
    gcps: Vec<Gcp>,
    gcp_projection: String,
    metadata: MetadataStore,
    layers: Vec<Defn>,
}

impl MemDataset {
    pub fn new(size: (usize, usize)) -> Self {
        MemDataset {
            size,
            ..Default::default()
        }
    }

    /// Appends a band of `data_type` filled with zeros.
    ///
    /// Fails with [`GeoDataError::BadArgument`] when the pixel count overflows.
    pub fn push_band(&mut self, data_type: DataType) -> Result<()> {
        let (width, height) = self.size;
        let pixels = width.checked_mul(height).ok_or_else(|| {
            GeoDataError::BadArgument(format!("{width}x{height} pixels do not fit in memory"))
        })?;
        self.bands.push(MemBand {
            data_type,
            data: vec![0.0; pixels],
            no_data: None,
        });
        Ok(())
    }

    fn band(&self, band: usize) -> Result<&MemBand> {
        let count = self.bands.len();
        self.bands
            .get(band.wrapping_sub(1))
            .ok_or(GeoDataError::IndexOutOfRange {
                what: "Band",
                index: band,
                count,
            })
    }

    fn band_mut(&mut self, band: usize) -> Result<&mut MemBand> {
        let count = self.bands.len();
        self.bands
            .get_mut(band.wrapping_sub(1))
            .ok_or(GeoDataError::IndexOutOfRange {
                what: "Band",
                index: band,
                count,
            })
    }
}

impl FormatDataset for MemDataset {
    fn raster_size(&self) -> (usize, usize) {
        self.size
    }

    fn raster_count(&self) -> usize {
        self.bands.len()
    }

    fn band_type(&self, band: usize) -> DataType {
        self.band(band)
            .map(|b| b.data_type)
            .unwrap_or(DataType::Unknown)
    }

    fn read_window(
        &mut self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &mut [f64],
    ) -> Result<()> {
        let width = self.size.0;
        let band = self.band(band)?;
        for (row, line) in buffer.chunks_exact_mut(size.0.max(1)).take(size.1).enumerate() {
            let start = (offset.1 + row) * width + offset.0;
            line.copy_from_slice(&band.data[start..start + size.0]);
        }
        Ok(())
    }

    fn write_window(
        &mut self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &[f64],
    ) -> Result<()> {
        let width = self.size.0;
        let band = self.band_mut(band)?;
        for (row, line) in buffer.chunks_exact(size.0.max(1)).take(size.1).enumerate() {
            let start = (offset.1 + row) * width + offset.0;
            for (dst, value) in band.data[start..start + size.0].iter_mut().zip(line) {
                *dst = band.data_type.adjust_value(*value);
            }
        }
        Ok(())
    }

    fn no_data_value(&self, band: usize) -> Option<f64> {
        self.band(band).ok()?.no_data
    }

    fn set_no_data_value(&mut self, band: usize, value: Option<f64>) -> Result<()> {
        self.band_mut(band)?.no_data = value;
        Ok(())
    }

    fn add_band(&mut self, data_type: DataType, _options: &NameValueList) -> Result<()> {
        if data_type == DataType::Unknown {
            return Err(GeoDataError::BadArgument(
                "MEM bands need a known data type".to_string(),
            ));
        }
        self.push_band(data_type)
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.geo_transform
    }

    fn set_geo_transform(&mut self, transform: &GeoTransform) -> Result<()> {
        self.geo_transform = Some(*transform);
        Ok(())
    }

    fn projection(&self) -> String {
        self.projection.clone()
    }

    fn set_projection(&mut self, wkt: &str) -> Result<()> {
        self.projection = wkt.to_string();
        Ok(())
    }

    fn gcps(&self) -> Vec<Gcp> {
        self.gcps.clone()
    }

    fn gcp_projection(&self) -> String {
        self.gcp_projection.clone()
    }

    fn set_gcps(&mut self, gcps: &[Gcp], projection: &str) -> Result<()> {
        self.gcps = gcps.to_vec();
        self.gcp_projection = projection.to_string();
        Ok(())
    }

    fn metadata(&self) -> Option<&MetadataStore> {
        Some(&self.metadata)
    }

    fn metadata_mut(&mut self) -> Option<&mut MetadataStore> {
        Some(&mut self.metadata)
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn layer_defn(&self, index: usize) -> Option<Defn> {
        self.layers.get(index).cloned()
    }

    fn create_layer(&mut self, defn: Defn) -> Result<()> {
        if self
            .layers
            .iter()
            .any(|layer| layer.name().eq_ignore_ascii_case(defn.name()))
        {
            return Err(GeoDataError::BadArgument(format!(
                "layer '{}' already exists",
                defn.name()
            )));
        }
        self.layers.push(defn);
        Ok(())
    }
}
