//! Raster ground control point support

use crate::errors::Result;
use crate::spatial_ref::SpatialRef;
use crate::Dataset;

/// A ground control point tying a pixel/line position to georeferenced coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gcp {
    pub id: String,
    pub info: String,
    /// Column of the control point in the raster.
    pub pixel: f64,
    /// Row of the control point in the raster.
    pub line: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Gcp {
    pub fn new(id: &str, pixel: f64, line: f64, x: f64, y: f64) -> Self {
        Gcp {
            id: id.to_string(),
            pixel,
            line,
            x,
            y,
            ..Default::default()
        }
    }
}

impl Dataset {
    pub fn gcp_count(&self) -> Result<usize> {
        Ok(self.backend_gcps()?.len())
    }

    pub fn gcps(&self) -> Result<Vec<Gcp>> {
        self.backend_gcps()
    }

    /// Get output spatial reference system for GCPs.
    ///
    /// # Notes
    /// * This is separate and distinct from [`Dataset::spatial_ref`], and only applies to
    /// embedded GCPs.
    pub fn gcp_spatial_ref(&self) -> Result<Option<SpatialRef>> {
        match self.gcp_projection()? {
            Some(wkt) => SpatialRef::from_wkt(&wkt).map(Some),
            None => Ok(None),
        }
    }

    /// Get the projection definition string for the GCPs in this dataset.
    ///
    /// # Notes
    /// * This is separate and distinct from [`Dataset::projection`], and only applies to
    /// embedded GCPs.
    pub fn gcp_projection(&self) -> Result<Option<String>> {
        let wkt = self.backend_gcp_projection()?;
        Ok((!wkt.is_empty()).then_some(wkt))
    }

    /// Replaces the GCPs and their projection (WKT, may be empty).
    pub fn set_gcps(&mut self, gcps: &[Gcp], projection: &str) -> Result<()> {
        self.backend_set_gcps(gcps, projection)
    }
}
