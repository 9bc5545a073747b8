use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Once, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{self, error_num};
use crate::dataset::{Dataset, SharedKey, SharedPool};
use crate::driver::{Driver, DriverCapabilities, OpenInfo, HEADER_BYTES};
use crate::drivers;
use crate::errors::{ErrorClass, GeoDataError, Result};
use crate::options::{DatasetOptions, OpenFlags};
use crate::raster::{DataType, RasterCreationOptions};
use crate::string_list::NameValueList;
use crate::vsi;

/// An ordered collection of drivers.
///
/// Drivers are addressed by _0-based_ index (registration order) or by
/// short name, compared case-insensitively. Short names are unique.
///
/// Besides the process-wide [`DriverManager`], independent registries can be
/// built for isolation, e.g. in tests.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<Driver>,
    shared: Arc<SharedPool>,
}

impl DriverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in driver (subject to `GDAL_SKIP`).
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        registry.register_all();
        registry
    }

    /// Registers every built-in driver that is not registered yet.
    ///
    /// Drivers named in the `GDAL_SKIP` configuration option (separated by
    /// spaces or commas) are left out.
    pub fn register_all(&mut self) {
        let skip = config::get_config_option("GDAL_SKIP", "").unwrap_or_default();
        let skip: Vec<&str> = skip
            .split([' ', ','])
            .filter(|name| !name.is_empty())
            .collect();

        for driver in drivers::builtin_drivers() {
            if skip.iter().any(|name| driver.has_name(name)) {
                log::debug!("skipping driver {}", driver.short_name());
                continue;
            }
            self.register_driver(&driver);
        }
    }

    /// Deregisters every driver.
    pub fn destroy(&mut self) {
        log::debug!("dropping {} driver(s)", self.drivers.len());
        self.drivers.clear();
    }

    /// Adds `driver` at the end, returning its index.
    ///
    /// A driver whose name is already registered is not added again; the
    /// index of the registered one is returned.
    pub fn register_driver(&mut self, driver: &Driver) -> usize {
        if let Some(index) = self.drivers.iter().position(|d| d.is_same(driver)) {
            return index;
        }
        self.drivers.push(driver.clone());
        self.drivers.len() - 1
    }

    /// Removes `driver`. Datasets it opened stay usable.
    pub fn deregister_driver(&mut self, driver: &Driver) -> Result<()> {
        let index = self
            .drivers
            .iter()
            .position(|d| d.is_same(driver))
            .ok_or_else(|| GeoDataError::DriverNotFound {
                name: driver.short_name(),
            })?;
        self.drivers.remove(index);
        Ok(())
    }

    /// Returns the number of registered drivers.
    pub fn count(&self) -> usize {
        self.drivers.len()
    }

    /// Returns the driver at the _0-based_ `index`.
    pub fn get_driver(&self, index: usize) -> Result<Driver> {
        self.drivers
            .get(index)
            .cloned()
            .ok_or(GeoDataError::DriverIndexNotFound { index })
    }

    /// Returns the driver with the given short name.
    pub fn get_driver_by_name(&self, name: &str) -> Result<Driver> {
        self.drivers
            .iter()
            .find(|d| d.has_name(name))
            .cloned()
            .ok_or_else(|| GeoDataError::DriverNotFound {
                name: name.to_string(),
            })
    }

    /// Registered drivers, in registration order.
    pub fn drivers(&self) -> impl Iterator<Item = &Driver> {
        self.drivers.iter()
    }

    /// The first driver, in registration order, claiming the resource `name`.
    ///
    /// Returns `None` if the resource does not exist, cannot be read or is
    /// not recognized.
    pub fn identify<P: AsRef<Path>>(&self, name: P) -> Option<Driver> {
        self.identify_with_allowed(name, None)
    }

    /// Like [`DriverRegistry::identify`], only probing the drivers named in `allowed_drivers`.
    pub fn identify_with_allowed<P: AsRef<Path>>(
        &self,
        name: P,
        allowed_drivers: Option<&[&str]>,
    ) -> Option<Driver> {
        identify_with(&self.drivers, name.as_ref(), allowed_drivers)
    }

    /// Opens `path` with the drivers of this registry. See [`Dataset::open_ex`].
    pub fn open_ex<P: AsRef<Path>>(&self, path: P, options: DatasetOptions) -> Result<Dataset> {
        open_with(&self.drivers, &self.shared, path.as_ref(), options)
    }

    /// Opens a dataset, hands it to `f` and closes it on every exit path.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn with_open<P, R, F>(&self, path: P, options: DatasetOptions, f: F) -> Result<R>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Dataset) -> Result<R>,
    {
        let mut dataset = self.open_ex(path, options)?;
        let result = f(&mut dataset);
        let closed = dataset.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Creates a dataset with the driver named `driver_name`.
    pub fn create<P: AsRef<Path>>(
        &self,
        filename: P,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
        driver_name: &str,
        options: &RasterCreationOptions,
    ) -> Result<Dataset> {
        self.get_driver_by_name(driver_name)?
            .create_with_data_type(filename, size, bands, data_type, options)
    }

    /// Picks a driver able to write `filename`, going by its extension.
    pub fn get_output_driver_for_dataset_name<P: AsRef<Path>>(&self, filename: P) -> Option<Driver> {
        let ext = filename
            .as_ref()
            .extension()?
            .to_string_lossy()
            .to_ascii_lowercase();
        self.drivers
            .iter()
            .filter(|d| {
                d.capabilities()
                    .intersects(DriverCapabilities::CREATE | DriverCapabilities::CREATE_COPY)
            })
            .find(|d| d.extensions().iter().any(|e| e.eq_ignore_ascii_case(&ext)))
            .cloned()
    }
}

/// Drivers allowed by `allowed` and the raster/vector open flags.
fn candidates<'a>(
    drivers: &'a [Driver],
    allowed: Option<&'a [&'a str]>,
    flags: OpenFlags,
) -> impl Iterator<Item = &'a Driver> {
    let kinds = {
        let mut kinds = DriverCapabilities::empty();
        if flags.contains(OpenFlags::RASTER) {
            kinds |= DriverCapabilities::RASTER;
        }
        if flags.contains(OpenFlags::VECTOR) {
            kinds |= DriverCapabilities::VECTOR;
        }
        kinds
    };
    drivers.iter().filter(move |driver| {
        let allowed = allowed.map_or(true, |names| names.iter().any(|n| driver.has_name(n)));
        allowed && (kinds.is_empty() || driver.capabilities().intersects(kinds))
    })
}

fn identify_with(drivers: &[Driver], name: &Path, allowed: Option<&[&str]>) -> Option<Driver> {
    let filename = name.to_string_lossy();
    // the header is read once and shared by every probe
    let header = vsi::read_header(filename.as_ref(), HEADER_BYTES).ok()?;
    let open_options = NameValueList::new();
    let info = OpenInfo {
        filename: &filename,
        access: Default::default(),
        flags: OpenFlags::default(),
        header: &header,
        open_options: &open_options,
        sibling_files: None,
    };
    candidates(drivers, allowed, OpenFlags::default())
        .find(|driver| driver.identify_info(&info))
        .cloned()
}

fn open_with(
    drivers: &[Driver],
    shared: &Arc<SharedPool>,
    path: &Path,
    options: DatasetOptions,
) -> Result<Dataset> {
    let filename = path.to_string_lossy();
    let flags = options.open_flags;
    let access = flags.access();

    let shared_key = flags
        .contains(OpenFlags::SHARED)
        .then(|| SharedKey::new(&filename, access));
    if let Some(dataset) = shared_key.as_ref().and_then(|key| shared.acquire(key)) {
        return Ok(dataset);
    }

    let open_options = NameValueList::try_from(options.open_options.unwrap_or(&[]))?;
    let header = vsi::read_header(filename.as_ref(), HEADER_BYTES).unwrap_or_default();
    let info = OpenInfo {
        filename: &filename,
        access,
        flags,
        header: &header,
        open_options: &open_options,
        sibling_files: options.sibling_files,
    };

    let Some(driver) =
        candidates(drivers, options.allowed_drivers, flags).find(|d| d.identify_info(&info))
    else {
        let err = GeoDataError::UnsupportedFormat {
            name: filename.to_string(),
        };
        if flags.contains(OpenFlags::VERBOSE_ERROR) {
            config::report(ErrorClass::Failure, error_num::OPEN_FAILED, &err.to_string());
        }
        return Err(err);
    };

    let mut dataset = driver.open_info(&info).inspect_err(|e| {
        if flags.contains(OpenFlags::VERBOSE_ERROR) {
            config::report(
                ErrorClass::Failure,
                error_num::OPEN_FAILED,
                &format!("{} failed to open '{filename}': {e}", driver.short_name()),
            );
        }
    })?;
    if let Some(key) = shared_key {
        shared.adopt(key, &mut dataset);
    }
    Ok(dataset)
}

static REGISTRY: LazyLock<RwLock<DriverRegistry>> = LazyLock::new(Default::default);
static AUTO_REGISTRATION: AtomicBool = AtomicBool::new(true);
static AUTO_REGISTERED: Once = Once::new();

/// Process-wide driver registry.
///
/// The built-in drivers are registered on first use unless
/// [`DriverManager::prevent_auto_registration`] was called before.
pub struct DriverManager;

impl DriverManager {
    fn registry() -> RwLockReadGuard<'static, DriverRegistry> {
        Self::auto_register();
        match REGISTRY.read() {
            Ok(guard) => guard,
            Err(poison_error) => poison_error.into_inner(),
        }
    }

    fn registry_mut() -> RwLockWriteGuard<'static, DriverRegistry> {
        Self::auto_register();
        match REGISTRY.write() {
            Ok(guard) => guard,
            Err(poison_error) => poison_error.into_inner(),
        }
    }

    fn auto_register() {
        if AUTO_REGISTRATION.load(Ordering::SeqCst) {
            AUTO_REGISTERED.call_once(|| {
                let mut registry = match REGISTRY.write() {
                    Ok(guard) => guard,
                    Err(poison_error) => poison_error.into_inner(),
                };
                registry.register_all();
            });
        }
    }

    /// Returns the number of registered drivers.
    pub fn count() -> usize {
        Self::registry().count()
    }

    /// Returns the driver at the _0-based_ `index`.
    pub fn get_driver(index: usize) -> Result<Driver> {
        Self::registry().get_driver(index)
    }

    /// Returns the driver with the given short name.
    pub fn get_driver_by_name(name: &str) -> Result<Driver> {
        Self::registry().get_driver_by_name(name)
    }

    /// A snapshot of the registered drivers.
    pub fn all() -> Vec<Driver> {
        Self::registry().drivers().cloned().collect()
    }

    /// See [`DriverRegistry::identify`].
    pub fn identify<P: AsRef<Path>>(name: P) -> Option<Driver> {
        Self::identify_with_allowed(name, None)
    }

    /// See [`DriverRegistry::identify_with_allowed`].
    pub fn identify_with_allowed<P: AsRef<Path>>(
        name: P,
        allowed_drivers: Option<&[&str]>,
    ) -> Option<Driver> {
        let drivers = Self::all();
        identify_with(&drivers, name.as_ref(), allowed_drivers)
    }

    pub(crate) fn open_ex(path: &Path, options: DatasetOptions) -> Result<Dataset> {
        // probing runs without holding the registry lock
        let (drivers, shared) = {
            let registry = Self::registry();
            (registry.drivers.clone(), registry.shared.clone())
        };
        open_with(&drivers, &shared, path, options)
    }

    /// Creates a dataset with the driver named `driver_name`.
    pub fn create<P: AsRef<Path>>(
        filename: P,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
        driver_name: &str,
        options: &RasterCreationOptions,
    ) -> Result<Dataset> {
        Self::get_driver_by_name(driver_name)?
            .create_with_data_type(filename, size, bands, data_type, options)
    }

    /// See [`DriverRegistry::get_output_driver_for_dataset_name`].
    pub fn get_output_driver_for_dataset_name<P: AsRef<Path>>(filename: P) -> Option<Driver> {
        Self::registry().get_output_driver_for_dataset_name(filename)
    }

    pub fn register_driver(driver: &Driver) -> usize {
        Self::registry_mut().register_driver(driver)
    }

    pub fn deregister_driver(driver: &Driver) -> Result<()> {
        Self::registry_mut().deregister_driver(driver)
    }

    /// Registers every built-in driver that is not registered yet.
    pub fn register_all() {
        Self::registry_mut().register_all();
    }

    /// Deregisters every driver.
    ///
    /// Automatic registration does not happen again afterwards; use
    /// [`DriverManager::register_all`].
    pub fn destroy() {
        Self::registry_mut().destroy();
    }

    /// Prevents the built-in drivers from being registered on first use.
    pub fn prevent_auto_registration() {
        AUTO_REGISTRATION.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockDriver;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = DriverRegistry::new();
        assert_eq!(registry.count(), 0);
        assert!(registry.get_driver_by_name("MockA").unwrap_err().is_not_found());

        let a = Driver::new(MockDriver::new("MockA", b"MOCKA"));
        let b = Driver::new(MockDriver::new("MockB", b"MOCKB"));
        assert_eq!(registry.register_driver(&a), 0);
        assert_eq!(registry.register_driver(&b), 1);
        assert_eq!(registry.register_driver(&a), 0);
        assert_eq!(registry.count(), 2);

        assert_eq!(registry.get_driver(1).unwrap().short_name(), "MockB");
        assert_eq!(registry.get_driver_by_name("mocka").unwrap(), a);
        assert!(matches!(
            registry.get_driver(2),
            Err(GeoDataError::DriverIndexNotFound { index: 2 })
        ));

        registry.deregister_driver(&a).unwrap();
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get_driver(0).unwrap(), b);
        assert!(registry.deregister_driver(&a).is_err());

        registry.destroy();
        assert_eq!(registry.count(), 0);
        assert!(registry.get_driver_by_name("MockB").unwrap_err().is_not_found());
    }

    #[test]
    fn test_register_all_is_idempotent() {
        let mut registry = DriverRegistry::with_builtin_drivers();
        let count = registry.count();
        assert!(count >= 2);
        registry.register_all();
        assert_eq!(registry.count(), count);
        assert!(registry.get_driver_by_name("MEM").is_ok());
        assert!(registry.get_driver_by_name("AAIGrid").is_ok());
    }

    #[test]
    fn test_gdal_skip() {
        config::set_thread_local_config_option("GDAL_SKIP", "aaigrid").unwrap();
        let registry = DriverRegistry::with_builtin_drivers();
        config::clear_thread_local_config_option("GDAL_SKIP").unwrap();

        assert!(registry.get_driver_by_name("MEM").is_ok());
        assert!(registry.get_driver_by_name("AAIGrid").is_err());
    }

    #[test]
    fn test_identify_in_registration_order() {
        let mut registry = DriverRegistry::new();
        registry.register_driver(&Driver::new(MockDriver::new("MockA", b"MOCKA")));
        registry.register_driver(&Driver::new(MockDriver::new("MockB", b"MOCKB")));
        registry.register_driver(&Driver::new(MockDriver::new("MockB2", b"MOCKB")));

        vsi::create_mem_file("/vsimem/registry-tests/b.mock", b"MOCKB and more".to_vec())
            .unwrap();
        vsi::create_mem_file("/vsimem/registry-tests/c.mock", b"MOCKC".to_vec()).unwrap();

        let driver = registry.identify("/vsimem/registry-tests/b.mock").unwrap();
        assert_eq!(driver.short_name(), "MockB");
        let driver = registry
            .identify_with_allowed("/vsimem/registry-tests/b.mock", Some(&["MockB2"]))
            .unwrap();
        assert_eq!(driver.short_name(), "MockB2");
        assert!(registry.identify("/vsimem/registry-tests/c.mock").is_none());
        assert!(registry.identify("/vsimem/registry-tests/missing").is_none());

        vsi::unlink_mem_file("/vsimem/registry-tests/b.mock").unwrap();
        vsi::unlink_mem_file("/vsimem/registry-tests/c.mock").unwrap();
    }

    #[test]
    fn test_open_unclaimed() {
        let registry = DriverRegistry::new();
        vsi::create_mem_file("/vsimem/registry-tests/x.mock", b"MOCKA".to_vec()).unwrap();
        let err = registry
            .open_ex("/vsimem/registry-tests/x.mock", DatasetOptions::default())
            .unwrap_err();
        assert!(matches!(err, GeoDataError::UnsupportedFormat { .. }));
        vsi::unlink_mem_file("/vsimem/registry-tests/x.mock").unwrap();
    }

    #[test]
    fn test_output_driver_by_extension() {
        let registry = DriverRegistry::with_builtin_drivers();
        let driver = registry
            .get_output_driver_for_dataset_name("/tmp/out.ASC")
            .unwrap();
        assert_eq!(driver.short_name(), "AAIGrid");
        assert!(registry
            .get_output_driver_for_dataset_name("/tmp/out.unknown")
            .is_none());
    }
}
