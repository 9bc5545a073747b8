use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::dataset::FormatDataset;
use crate::driver::{DriverCapabilities, FormatDriver, OpenInfo};
use crate::drivers::MemDataset;
use crate::errors::Result;
use crate::geo_transform::GeoTransform;
use crate::raster::DataType;
use crate::string_list::NameValueList;
use crate::vsi::unlink_mem_file;

pub(crate) const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

/// A struct that contains a temporary directory and a path to a file in that directory.
pub struct TempFixture {
    _temp_dir: tempfile::TempDir,
    temp_path: PathBuf,
}

impl TempFixture {
    /// Creates a copy of the test file in a temporary directory.
    /// Returns the struct `TempFixture` that contains the temp dir (for clean-up on `drop`) as well as the path to the file.
    pub fn fixture(name: &str) -> Self {
        let staging = Self::empty(name);
        std::fs::copy(fixture(name), &staging.temp_path).unwrap();
        staging
    }

    /// Creates a temporary directory and path to a non-existent file with given `name`.
    /// Useful for writing results to during testing
    ///
    /// Returns the struct `TempFixture` that contains the temp dir (for clean-up on `drop`)
    /// as well as the empty file path.
    pub fn empty(name: &str) -> Self {
        let _temp_dir = tempfile::tempdir().unwrap();
        let temp_path = _temp_dir.path().join(name);
        Self {
            _temp_dir,
            temp_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.temp_path
    }
}

impl AsRef<Path> for TempFixture {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Returns the fully qualified path to `filename` in `${CARGO_MANIFEST_DIR}/fixtures`.
pub fn fixture(filename: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(filename)
}

/// A struct that represents a `/vsimem/` (in-memory) path.
///
/// The file will be deleted when the value is dropped.
pub struct InMemoryFixture {
    path: PathBuf,
}

impl InMemoryFixture {
    pub fn new(filename: &str) -> Self {
        let mut path = PathBuf::from("/vsimem");
        path.push(filename);

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InMemoryFixture {
    fn drop(&mut self) {
        // some tests move or delete the file themselves
        let _ = unlink_mem_file(&self.path);
    }
}

/// A driver claiming resources whose header starts with a signature.
///
/// Every dataset it hands out is counted in `live` until dropped.
pub(crate) struct MockDriver {
    name: String,
    long_name: String,
    signature: Vec<u8>,
    live: Arc<AtomicUsize>,
    writable: bool,
}

impl MockDriver {
    pub fn new(name: &str, signature: &[u8]) -> Self {
        MockDriver {
            name: name.to_string(),
            long_name: format!("Mock driver {name}"),
            signature: signature.to_vec(),
            live: Arc::new(AtomicUsize::new(0)),
            writable: true,
        }
    }

    pub fn with_counter(mut self, live: Arc<AtomicUsize>) -> Self {
        self.live = live;
        self
    }

    /// Opening only; no create.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }
}

impl FormatDriver for MockDriver {
    fn short_name(&self) -> &str {
        &self.name
    }

    fn long_name(&self) -> &str {
        &self.long_name
    }

    fn capabilities(&self) -> DriverCapabilities {
        let mut capabilities = DriverCapabilities::RASTER | DriverCapabilities::OPEN;
        if self.writable {
            capabilities |= DriverCapabilities::CREATE;
        }
        capabilities
    }

    fn identify(&self, info: &OpenInfo) -> bool {
        info.header_starts_with(&self.signature)
    }

    fn open(&self, info: &OpenInfo) -> Result<Box<dyn FormatDataset>> {
        let mut inner = MemDataset::new((1, 1));
        inner.push_band(DataType::UInt8)?;
        Ok(Box::new(MockDataset::new(
            inner,
            self.live.clone(),
            vec![info.filename.to_string()],
        )))
    }

    fn create(
        &self,
        _filename: &str,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
        _options: &NameValueList,
    ) -> Result<Box<dyn FormatDataset>> {
        let mut inner = MemDataset::new(size);
        for _ in 0..bands {
            inner.push_band(data_type)?;
        }
        Ok(Box::new(MockDataset::new(inner, self.live.clone(), Vec::new())))
    }
}

struct MockDataset {
    inner: MemDataset,
    live: Arc<AtomicUsize>,
    files: Vec<String>,
}

impl MockDataset {
    fn new(inner: MemDataset, live: Arc<AtomicUsize>, files: Vec<String>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        MockDataset { inner, live, files }
    }
}

impl Drop for MockDataset {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FormatDataset for MockDataset {
    fn raster_size(&self) -> (usize, usize) {
        self.inner.raster_size()
    }

    fn raster_count(&self) -> usize {
        self.inner.raster_count()
    }

    fn band_type(&self, band: usize) -> DataType {
        self.inner.band_type(band)
    }

    fn read_window(
        &mut self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &mut [f64],
    ) -> Result<()> {
        self.inner.read_window(band, offset, size, buffer)
    }

    fn write_window(
        &mut self,
        band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &[f64],
    ) -> Result<()> {
        self.inner.write_window(band, offset, size, buffer)
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.inner.geo_transform()
    }

    fn set_geo_transform(&mut self, transform: &GeoTransform) -> Result<()> {
        self.inner.set_geo_transform(transform)
    }

    fn file_list(&self) -> Vec<String> {
        self.files.clone()
    }
}

/// Assert numerical difference between two expressions is less than
/// 64-bit machine epsilon or a specified epsilon.
///
/// # Examples:
/// ```rust, ignore
/// use std::f64::consts::{PI, E};
/// assert_near!(PI / E, 1.1557273497909217);
/// // with specified epsilon
/// assert_near!(PI / E, 1.15572734, epsilon = 1e-8);
/// ```
#[macro_export]
macro_rules! assert_near {
    ($left:expr, $right:expr) => {
        $crate::assert_near!($left, $right, epsilon = f64::EPSILON)
    };
    ($left:expr, $right:expr, epsilon = $ep:expr) => {
        assert!(
            ($left - $right).abs() < $ep,
            "|{} - {}| = {} is greater than epsilon {:.4e}",
            $left,
            $right,
            ($left - $right).abs(),
            $ep
        )
    };
}
