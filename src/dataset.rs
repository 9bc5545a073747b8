use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::ThreadId;

use geo_types::{coord, Rect};

use crate::config::{self, error_num};
use crate::driver::Driver;
use crate::errors::{ErrorClass, GeoDataError, Result};
use crate::geo_transform::{GeoTransform, GeoTransformEx, DEFAULT_GEO_TRANSFORM};
use crate::metadata::{Metadata, MetadataStore};
use crate::options::{Access, DatasetOptions};
use crate::raster::{DataType, Gcp, RasterBand, RasterCreationOptions};
use crate::spatial_ref::SpatialRef;
use crate::string_list::NameValueList;
use crate::vector::Defn;
use crate::DriverManager;

/// Format-specific state of an open dataset.
///
/// Band indices are 1-based and already range-checked by [`Dataset`]; pixel
/// windows lie inside the raster. Values cross this seam as `f64` in
/// row-major order. Operations a format cannot perform keep their default
/// implementation, which fails with [`GeoDataError::UnsupportedOperation`].
pub trait FormatDataset: Send {
    /// Raster width and height in pixels.
    fn raster_size(&self) -> (usize, usize);

    fn raster_count(&self) -> usize;

    fn band_type(&self, band: usize) -> DataType;

    /// Natural block size of `band` as `(cols, rows)`. Defaults to one scanline.
    fn block_size(&self, band: usize) -> (usize, usize) {
        let _ = band;
        (self.raster_size().0.max(1), 1)
    }

    fn read_window(
        &mut self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &mut [f64],
    ) -> Result<()>;

    fn write_window(
        &mut self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &[f64],
    ) -> Result<()> {
        let _ = (band, offset, size, buffer);
        Err(unsupported("raster writes"))
    }

    fn no_data_value(&self, band: usize) -> Option<f64> {
        let _ = band;
        None
    }

    fn set_no_data_value(&mut self, band: usize, value: Option<f64>) -> Result<()> {
        let _ = (band, value);
        Err(unsupported("nodata values"))
    }

    fn add_band(&mut self, data_type: DataType, options: &NameValueList) -> Result<()> {
        let _ = (data_type, options);
        Err(unsupported("adding bands"))
    }

    /// `None` when the format carries no geotransform.
    fn geo_transform(&self) -> Option<GeoTransform> {
        None
    }

    fn set_geo_transform(&mut self, transform: &GeoTransform) -> Result<()> {
        let _ = transform;
        Err(unsupported("setting the geotransform"))
    }

    /// WKT, empty when undefined.
    fn projection(&self) -> String {
        String::new()
    }

    fn set_projection(&mut self, wkt: &str) -> Result<()> {
        let _ = wkt;
        Err(unsupported("setting the projection"))
    }

    fn gcps(&self) -> Vec<Gcp> {
        Vec::new()
    }

    fn gcp_projection(&self) -> String {
        String::new()
    }

    fn set_gcps(&mut self, gcps: &[Gcp], projection: &str) -> Result<()> {
        let _ = (gcps, projection);
        Err(unsupported("ground control points"))
    }

    /// Files making up the dataset, primary file first. Empty when not file-backed.
    fn file_list(&self) -> Vec<String> {
        Vec::new()
    }

    fn metadata(&self) -> Option<&MetadataStore> {
        None
    }

    fn metadata_mut(&mut self) -> Option<&mut MetadataStore> {
        None
    }

    fn layer_count(&self) -> usize {
        0
    }

    fn layer_defn(&self, index: usize) -> Option<Defn> {
        let _ = index;
        None
    }

    fn create_layer(&mut self, defn: Defn) -> Result<()> {
        let _ = defn;
        Err(unsupported("creating layers"))
    }

    /// Writes pending changes to the backing store.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases the resource. Called once; the value is dropped afterwards.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

/// The driver name is filled in by [`Dataset`].
fn unsupported(operation: &str) -> GeoDataError {
    GeoDataError::unsupported("", operation)
}

type Backend = Arc<Mutex<Box<dyn FormatDataset>>>;

fn lock_backend(backend: &Backend) -> MutexGuard<'_, Box<dyn FormatDataset>> {
    match backend.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SharedKey {
    name: String,
    access: Access,
    thread: ThreadId,
}

impl SharedKey {
    pub(crate) fn new(name: &str, access: Access) -> Self {
        SharedKey {
            name: name.to_string(),
            access,
            thread: std::thread::current().id(),
        }
    }
}

struct SharedEntry {
    backend: Backend,
    driver: Driver,
    refs: usize,
}

/// Handles opened with [`OpenFlags::SHARED`](crate::OpenFlags::SHARED), keyed
/// by resource name, access mode and thread.
#[derive(Default)]
pub(crate) struct SharedPool {
    entries: Mutex<HashMap<SharedKey, SharedEntry>>,
}

impl SharedPool {
    fn lock(&self) -> MutexGuard<'_, HashMap<SharedKey, SharedEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poison_error) => poison_error.into_inner(),
        }
    }

    /// Another reference to an already shared dataset, if any.
    pub(crate) fn acquire(self: &Arc<Self>, key: &SharedKey) -> Option<Dataset> {
        let mut entries = self.lock();
        let entry = entries.get_mut(key)?;
        entry.refs += 1;
        log::debug!("reusing shared dataset '{}' ({} refs)", key.name, entry.refs);
        Some(Dataset {
            backend: Some(entry.backend.clone()),
            shared: Some((self.clone(), key.clone())),
            driver: entry.driver.clone(),
            description: key.name.clone(),
            access: key.access,
        })
    }

    /// Puts a freshly opened dataset into the pool.
    pub(crate) fn adopt(self: &Arc<Self>, key: SharedKey, dataset: &mut Dataset) {
        let Some(backend) = dataset.backend.clone() else {
            return;
        };
        self.lock().insert(
            key.clone(),
            SharedEntry {
                backend,
                driver: dataset.driver.clone(),
                refs: 1,
            },
        );
        dataset.shared = Some((self.clone(), key));
    }

    /// Drops one reference; `true` when it was the last one.
    fn release(&self, key: &SharedKey) -> bool {
        let mut entries = self.lock();
        let refs = match entries.get_mut(key) {
            Some(entry) => {
                entry.refs -= 1;
                entry.refs
            }
            None => return true,
        };
        if refs == 0 {
            entries.remove(key);
        }
        refs == 0
    }

    fn refs(&self, key: &SharedKey) -> usize {
        self.lock().get(key).map(|entry| entry.refs).unwrap_or(0)
    }
}

/// Wrapper around a format-specific dataset.
///
/// The handle is bound to the driver that opened or created it. Closing is
/// explicit through [`Dataset::close`] (idempotent) or implicit on drop;
/// every accessor of a closed handle fails with [`GeoDataError::ClosedDataset`].
pub struct Dataset {
    backend: Option<Backend>,
    shared: Option<(Arc<SharedPool>, SharedKey)>,
    driver: Driver,
    description: String,
    access: Access,
}

impl Dataset {
    pub(crate) fn from_backend(
        backend: Box<dyn FormatDataset>,
        driver: Driver,
        description: &str,
        access: Access,
    ) -> Dataset {
        Dataset {
            backend: Some(Arc::new(Mutex::new(backend))),
            shared: None,
            driver,
            description: description.to_string(),
            access,
        }
    }

    /// Open a dataset at the given `path` with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        Self::open_ex(path, DatasetOptions::default())
    }

    /// Open a dataset with extended options through the global registry.
    /// See [`DatasetOptions`].
    ///
    /// Drivers are probed in registration order and the first one claiming
    /// the resource opens it. When no driver claims it the result is
    /// [`GeoDataError::UnsupportedFormat`].
    pub fn open_ex<P: AsRef<Path>>(path: P, options: DatasetOptions) -> Result<Dataset> {
        DriverManager::open_ex(path.as_ref(), options)
    }

    /// Opens a dataset, hands it to `f` and closes it on every exit path.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn with_open<P, R, F>(path: P, options: DatasetOptions, f: F) -> Result<R>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Dataset) -> Result<R>,
    {
        let mut dataset = Dataset::open_ex(path, options)?;
        let result = f(&mut dataset);
        let closed = dataset.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    fn backend(&self) -> Result<MutexGuard<'_, Box<dyn FormatDataset>>> {
        self.backend
            .as_ref()
            .map(lock_backend)
            .ok_or(GeoDataError::ClosedDataset)
    }

    /// Runs `f` on the backend, naming this dataset's driver in unsupported operations.
    fn with_backend<R>(
        &self,
        f: impl FnOnce(&mut Box<dyn FormatDataset>) -> Result<R>,
    ) -> Result<R> {
        let mut backend = self.backend()?;
        let result = f(&mut backend);
        result.map_err(|e| self.tag(e))
    }

    fn tag(&self, e: GeoDataError) -> GeoDataError {
        match e {
            GeoDataError::UnsupportedOperation { driver, operation } if driver.is_empty() => {
                GeoDataError::UnsupportedOperation {
                    driver: self.driver.short_name(),
                    operation,
                }
            }
            e => e,
        }
    }

    pub(crate) fn check_writable(&self, what: &str) -> Result<()> {
        if self.backend.is_none() {
            return Err(GeoDataError::ClosedDataset);
        }
        if self.access == Access::ReadOnly {
            return Err(GeoDataError::UnsupportedOperation {
                driver: self.driver.short_name(),
                operation: format!("{what} on a dataset opened read-only"),
            });
        }
        Ok(())
    }

    /// The driver that opened or created this dataset.
    pub fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Resource name the dataset was opened or created with.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    /// `true` if the handle came from a shared open.
    pub fn is_shared(&self) -> bool {
        self.shared.is_some()
    }

    /// Number of handles referring to the underlying dataset; 0 once closed.
    pub fn reference_count(&self) -> usize {
        match (&self.backend, &self.shared) {
            (None, _) => 0,
            (Some(_), Some((pool, key))) => pool.refs(key),
            (Some(_), None) => 1,
        }
    }

    /// Writes pending changes to the backing store.
    pub fn flush(&mut self) -> Result<()> {
        self.with_backend(|backend| backend.flush())
    }

    /// Closes the dataset.
    ///
    /// A shared handle only drops its reference until the last one is closed.
    /// Closing an already closed dataset does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(backend) = self.backend.take() else {
            return Ok(());
        };
        if let Some((pool, key)) = self.shared.take() {
            if !pool.release(&key) {
                return Ok(());
            }
        }

        let result = lock_backend(&backend).close();
        log::debug!("closed '{}'", self.description);
        result.map_err(|e| self.tag(e))
    }

    /// Raster width and height.
    pub fn raster_size(&self) -> Result<(usize, usize)> {
        Ok(self.backend()?.raster_size())
    }

    pub fn raster_count(&self) -> Result<usize> {
        Ok(self.backend()?.raster_count())
    }

    /// Fetch a band object for a dataset.
    ///
    /// Applies to raster datasets, and fetches the
    /// rasterband at the given _1-based_ index.
    pub fn rasterband(&self, band_index: usize) -> Result<RasterBand<'_>> {
        let count = self.raster_count()?;
        if band_index == 0 || band_index > count {
            return Err(GeoDataError::IndexOutOfRange {
                what: "Band",
                index: band_index,
                count,
            });
        }
        RasterBand::new(self, band_index)
    }

    /// Iterates over every band, in order.
    pub fn rasterbands(&self) -> impl Iterator<Item = Result<RasterBand<'_>>> {
        let count = self.raster_count().unwrap_or(0);
        (1..=count).map(move |index| self.rasterband(index))
    }

    /// Appends a band of `data_type`.
    pub fn add_band(&mut self, data_type: DataType, options: &RasterCreationOptions) -> Result<()> {
        self.check_writable("adding bands")?;
        self.with_backend(|backend| backend.add_band(data_type, options))
    }

    pub(crate) fn band_type(&self, band: usize) -> Result<DataType> {
        Ok(self.backend()?.band_type(band))
    }

    pub(crate) fn block_size(&self, band: usize) -> Result<(usize, usize)> {
        Ok(self.backend()?.block_size(band))
    }

    pub(crate) fn read_window(
        &self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &mut [f64],
    ) -> Result<()> {
        self.with_backend(|backend| backend.read_window(band, offset, size, buffer))
    }

    pub(crate) fn write_window(
        &self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &[f64],
    ) -> Result<()> {
        self.check_writable("raster writes")?;
        self.with_backend(|backend| backend.write_window(band, offset, size, buffer))
    }

    pub(crate) fn no_data_value(&self, band: usize) -> Result<Option<f64>> {
        Ok(self.backend()?.no_data_value(band))
    }

    pub(crate) fn set_no_data_value(&self, band: usize, value: Option<f64>) -> Result<()> {
        self.check_writable("nodata values")?;
        self.with_backend(|backend| backend.set_no_data_value(band, value))
    }

    /// The affine transform from pixel/line to georeferenced coordinates.
    ///
    /// Datasets without georeferencing report `[0, 1, 0, 0, 0, 1]`.
    pub fn geo_transform(&self) -> Result<GeoTransform> {
        Ok(self.native_geo_transform()?.unwrap_or(DEFAULT_GEO_TRANSFORM))
    }

    /// The geotransform as stored by the format, `None` when it has none.
    pub(crate) fn native_geo_transform(&self) -> Result<Option<GeoTransform>> {
        Ok(self.backend()?.geo_transform())
    }

    /// Set the [`GeoTransform`] of the dataset.
    pub fn set_geo_transform(&mut self, transformation: &GeoTransform) -> Result<()> {
        self.check_writable("setting the geotransform")?;
        self.with_backend(|backend| backend.set_geo_transform(transformation))
    }

    /// Georeferenced extent of the raster.
    pub fn bounds(&self) -> Result<Rect<f64>> {
        let (width, height) = self.raster_size()?;
        let gt = self.geo_transform()?;
        let (x0, y0) = gt.apply(0.0, 0.0);
        let (x1, y1) = gt.apply(width as f64, height as f64);
        Ok(Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }))
    }

    /// Fetch the projection definition string for this dataset, empty when undefined.
    pub fn projection(&self) -> Result<String> {
        Ok(self.backend()?.projection())
    }

    /// Set the projection reference string for this dataset.
    pub fn set_projection(&mut self, projection: &str) -> Result<()> {
        self.check_writable("setting the projection")?;
        self.with_backend(|backend| backend.set_projection(projection))
    }

    /// The projection as a [`SpatialRef`].
    pub fn spatial_ref(&self) -> Result<SpatialRef> {
        let wkt = self.projection()?;
        if wkt.is_empty() {
            return Err(GeoDataError::NotFound {
                what: "Spatial reference".to_string(),
            });
        }
        SpatialRef::from_wkt(&wkt)
    }

    pub fn set_spatial_ref(&mut self, spatial_ref: &SpatialRef) -> Result<()> {
        self.set_projection(spatial_ref.as_wkt())
    }

    /// Files making up the dataset; empty for datasets without file backing.
    pub fn file_list(&self) -> Result<Vec<String>> {
        Ok(self.backend()?.file_list())
    }

    pub(crate) fn backend_gcps(&self) -> Result<Vec<Gcp>> {
        Ok(self.backend()?.gcps())
    }

    pub(crate) fn backend_gcp_projection(&self) -> Result<String> {
        Ok(self.backend()?.gcp_projection())
    }

    pub(crate) fn backend_set_gcps(&mut self, gcps: &[Gcp], projection: &str) -> Result<()> {
        self.check_writable("setting ground control points")?;
        self.with_backend(|backend| backend.set_gcps(gcps, projection))
    }

    /// Number of vector layers.
    pub fn layer_count(&self) -> Result<usize> {
        Ok(self.backend()?.layer_count())
    }

    /// Schema of the layer at the _0-based_ `index`.
    pub fn layer_defn(&self, index: usize) -> Result<Defn> {
        let backend = self.backend()?;
        let count = backend.layer_count();
        let defn = backend.layer_defn(index);
        defn.ok_or(GeoDataError::IndexOutOfRange {
            what: "Layer",
            index,
            count,
        })
    }

    /// Schema of the layer named `name` (case-insensitive).
    pub fn layer_defn_by_name(&self, name: &str) -> Result<Defn> {
        let backend = self.backend()?;
        let found = (0..backend.layer_count())
            .filter_map(|index| backend.layer_defn(index))
            .find(|defn| defn.name().eq_ignore_ascii_case(name));
        found.ok_or_else(|| GeoDataError::NotFound {
            what: format!("Layer '{name}'"),
        })
    }

    /// Adds a layer with the schema `defn`, returning its index.
    pub fn create_layer(&mut self, defn: Defn) -> Result<usize> {
        self.check_writable("creating layers")?;
        self.with_backend(|backend| {
            backend.create_layer(defn)?;
            Ok(backend.layer_count() - 1)
        })
    }

    /// Copies this dataset with `driver`, dropping what the target format cannot hold.
    ///
    /// See [`Driver::create_copy`] for strict copies and progress reporting.
    pub fn create_copy<P: AsRef<Path>>(
        &self,
        driver: &Driver,
        filename: P,
        options: &RasterCreationOptions,
    ) -> Result<Dataset> {
        driver.create_copy(filename, self, false, options, None)
    }
}

impl Metadata for Dataset {
    fn metadata_domains(&self) -> Vec<String> {
        let Ok(backend) = self.backend() else {
            return Vec::new();
        };
        let domains = backend.metadata().map(MetadataStore::domains);
        domains.unwrap_or_default()
    }

    fn metadata_domain(&self, domain: &str) -> Option<NameValueList> {
        let backend = self.backend().ok()?;
        let items = backend.metadata()?.domain(domain).cloned();
        items
    }

    fn set_metadata_item(&mut self, key: &str, value: &str, domain: &str) -> Result<()> {
        self.check_writable("setting metadata")?;
        self.with_backend(|backend| match backend.metadata_mut() {
            Some(store) => store.set_item(key, value, domain),
            None => Err(unsupported("metadata")),
        })
    }
}

impl Debug for Dataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("description", &self.description)
            .field("driver", &self.driver.short_name())
            .field("access", &self.access)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            config::report(
                ErrorClass::Failure,
                error_num::FILE_IO,
                &format!("closing '{}' failed: {e}", self.description),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockDriver;
    use crate::{DriverRegistry, OpenFlags};

    fn mem_dataset() -> Dataset {
        DriverManager::get_driver_by_name("MEM")
            .unwrap()
            .create_with_band_type::<u8, _>("", 10, 5, 2)
            .unwrap()
    }

    #[test]
    fn test_closed_sentinel() {
        let mut ds = mem_dataset();
        assert!(!ds.is_closed());
        assert_eq!(ds.reference_count(), 1);
        ds.close().unwrap();
        ds.close().unwrap();
        assert!(ds.is_closed());
        assert_eq!(ds.reference_count(), 0);
        assert!(matches!(ds.raster_size(), Err(GeoDataError::ClosedDataset)));
        assert!(matches!(ds.rasterband(1), Err(GeoDataError::ClosedDataset)));
        assert!(matches!(ds.projection(), Err(GeoDataError::ClosedDataset)));
        assert!(matches!(
            ds.set_projection("LOCAL_CS[\"x\"]"),
            Err(GeoDataError::ClosedDataset)
        ));
        assert!(ds.metadata_domains().is_empty());
    }

    #[test]
    fn test_read_only_rejects_metadata() {
        let driver = DriverManager::get_driver_by_name("MEM").unwrap();
        let mut ds = Dataset::from_backend(
            Box::new(crate::drivers::MemDataset::new((2, 2))),
            driver,
            "",
            Access::ReadOnly,
        );
        match ds.set_metadata_item("AREA_OR_POINT", "Area", "") {
            Err(GeoDataError::UnsupportedOperation { operation, .. }) => {
                assert!(operation.contains("read-only"), "{operation}")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(ds.metadata_item("AREA_OR_POINT", ""), None);
    }

    #[test]
    fn test_band_index_range() {
        let ds = mem_dataset();
        assert!(matches!(
            ds.rasterband(0),
            Err(GeoDataError::IndexOutOfRange { index: 0, count: 2, .. })
        ));
        assert!(matches!(
            ds.rasterband(3),
            Err(GeoDataError::IndexOutOfRange { index: 3, count: 2, .. })
        ));
        assert_eq!(ds.rasterbands().count(), 2);
    }

    #[test]
    fn test_default_geo_transform_and_bounds() {
        let mut ds = mem_dataset();
        assert_eq!(ds.geo_transform().unwrap(), DEFAULT_GEO_TRANSFORM);

        ds.set_geo_transform(&[100.0, 2.0, 0.0, 50.0, 0.0, -2.0])
            .unwrap();
        let bounds = ds.bounds().unwrap();
        assert_eq!(bounds.min(), coord! { x: 100.0, y: 40.0 });
        assert_eq!(bounds.max(), coord! { x: 120.0, y: 50.0 });
    }

    #[test]
    fn test_unsupported_names_driver() {
        let live = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let driver = Driver::new(MockDriver::new("MockUp", b"MOCKUP").with_counter(live));
        let ds = driver.create("", 2, 2, 1).unwrap();
        let err = ds.layer_defn(0).unwrap_err();
        assert!(matches!(err, GeoDataError::IndexOutOfRange { .. }));

        let mut ds = ds;
        match ds.create_layer(Defn::new("points")) {
            Err(GeoDataError::UnsupportedOperation { driver, .. }) => assert_eq!(driver, "MockUp"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_shared_pool_refcount() {
        let live = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = DriverRegistry::new();
        registry.register_driver(&Driver::new(
            MockDriver::new("MockShared", b"MOCKSHARED").with_counter(live.clone()),
        ));
        crate::vsi::create_mem_file("/vsimem/dataset-tests/shared.mock", b"MOCKSHARED".to_vec())
            .unwrap();

        let options = || DatasetOptions {
            open_flags: OpenFlags::SHARED,
            ..Default::default()
        };
        let mut a = registry
            .open_ex("/vsimem/dataset-tests/shared.mock", options())
            .unwrap();
        let mut b = registry
            .open_ex("/vsimem/dataset-tests/shared.mock", options())
            .unwrap();
        assert!(a.is_shared());
        assert_eq!(live.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(b.reference_count(), 2);

        a.close().unwrap();
        assert_eq!(live.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(b.raster_size().unwrap(), (1, 1));
        b.close().unwrap();
        assert_eq!(live.load(std::sync::atomic::Ordering::SeqCst), 0);

        crate::vsi::unlink_mem_file("/vsimem/dataset-tests/shared.mock").unwrap();
    }
}
