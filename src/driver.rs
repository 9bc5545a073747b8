use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bitflags::bitflags;

use crate::config::{self, error_num};
use crate::dataset::{Dataset, FormatDataset};
use crate::errors::{ErrorClass, GeoDataError, Result};
use crate::metadata::Metadata;
use crate::options::{Access, OpenFlags};
use crate::progress::{Progress, ProgressCallback};
use crate::raster::{copy_whole_raster_with, DataType, PixelType, RasterCreationOptions};
use crate::string_list::NameValueList;
use crate::vsi;

/// Number of leading bytes handed to [`FormatDriver::identify`].
pub const HEADER_BYTES: usize = 1024;

bitflags! {
    /// What a driver is able to do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DriverCapabilities: u32 {
        const RASTER = 0x01;
        const VECTOR = 0x02;
        /// Existing resources can be opened.
        const OPEN = 0x04;
        /// New datasets can be created from scratch.
        const CREATE = 0x08;
        /// The driver has its own create-copy implementation.
        const CREATE_COPY = 0x10;
        /// Resources may live in the `/vsimem/` store.
        const VIRTUAL_IO = 0x20;
    }
}

/// Value domain of a creation option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Int,
    Float,
    Boolean,
    String,
    StringSelect(&'static [&'static str]),
}

impl OptionKind {
    fn name(&self) -> &'static str {
        match self {
            OptionKind::Int => "int",
            OptionKind::Float => "float",
            OptionKind::Boolean => "boolean",
            OptionKind::String => "string",
            OptionKind::StringSelect(_) => "string-select",
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            OptionKind::Int => value.trim().parse::<i64>().is_ok(),
            OptionKind::Float => value.trim().parse::<f64>().is_ok(),
            OptionKind::Boolean => matches!(
                value.to_ascii_uppercase().as_str(),
                "YES" | "NO" | "ON" | "OFF" | "TRUE" | "FALSE" | "1" | "0"
            ),
            OptionKind::String => true,
            OptionKind::StringSelect(values) => {
                values.iter().any(|v| v.eq_ignore_ascii_case(value))
            }
        }
    }
}

/// One entry of a driver's creation option schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreationOptionDefn {
    pub name: &'static str,
    pub kind: OptionKind,
    pub description: &'static str,
    pub default: Option<&'static str>,
    /// Creation fails when a required option is missing.
    pub required: bool,
}

impl CreationOptionDefn {
    pub const fn new(name: &'static str, kind: OptionKind, description: &'static str) -> Self {
        CreationOptionDefn {
            name,
            kind,
            description,
            default: None,
            required: false,
        }
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A non-fatal creation option problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationWarning {
    pub driver: String,
    pub key: String,
    pub message: String,
}

impl Display for ValidationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.driver, self.message)
    }
}

/// Checks `options` against `schema`.
///
/// Unknown keys and values outside an option's domain produce warnings, which
/// are also delivered to the error handler. A missing required option is an error.
pub fn validate_creation_options(
    driver: &str,
    schema: &[CreationOptionDefn],
    options: &NameValueList,
) -> Result<Vec<ValidationWarning>> {
    if !config::config_option_bool("GDAL_VALIDATE_CREATION_OPTIONS", true) {
        return Ok(Vec::new());
    }

    let mut warnings = Vec::new();
    for (key, value) in options.iter() {
        let message = match schema.iter().find(|d| d.name.eq_ignore_ascii_case(key)) {
            None => format!("driver {driver} does not support creation option {key}"),
            Some(defn) if !defn.kind.accepts(value) => match defn.kind {
                OptionKind::StringSelect(values) => format!(
                    "'{value}' is an unexpected value for {key} creation option of type string-select (allowed: {})",
                    values.join(", ")
                ),
                kind => format!(
                    "'{value}' is an unexpected value for {key} creation option of type {}",
                    kind.name()
                ),
            },
            Some(_) => continue,
        };
        config::report(ErrorClass::Warning, error_num::NOT_SUPPORTED, &message);
        warnings.push(ValidationWarning {
            driver: driver.to_string(),
            key: key.to_string(),
            message,
        });
    }

    if let Some(missing) = schema
        .iter()
        .find(|d| d.required && options.fetch_name_value(d.name).is_none())
    {
        return Err(GeoDataError::BadArgument(format!(
            "driver {driver} requires creation option {}",
            missing.name
        )));
    }

    Ok(warnings)
}

fn xml_escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;"),
    )
}

/// Renders a creation option schema in the `<CreationOptionList>` XML form.
pub fn creation_option_list_xml(schema: &[CreationOptionDefn]) -> String {
    let mut xml = String::from("<CreationOptionList>\n");
    for defn in schema {
        xml.push_str(&format!(
            "  <Option name=\"{}\" type=\"{}\" description=\"{}\"",
            xml_escape(defn.name),
            defn.kind.name(),
            xml_escape(defn.description)
        ));
        if let Some(default) = defn.default {
            xml.push_str(&format!(" default=\"{}\"", xml_escape(default)));
        }
        if defn.required {
            xml.push_str(" required=\"true\"");
        }
        match defn.kind {
            OptionKind::StringSelect(values) => {
                xml.push_str(">\n");
                for value in values {
                    xml.push_str(&format!("    <Value>{}</Value>\n", xml_escape(value)));
                }
                xml.push_str("  </Option>\n");
            }
            _ => xml.push_str("/>\n"),
        }
    }
    xml.push_str("</CreationOptionList>");
    xml
}

/// What a driver gets to look at when asked to identify or open a resource.
#[derive(Debug)]
pub struct OpenInfo<'a> {
    pub filename: &'a str,
    pub access: Access,
    pub flags: OpenFlags,
    /// Leading bytes of the resource; empty when it is not a readable file.
    pub header: &'a [u8],
    pub open_options: &'a NameValueList,
    pub sibling_files: Option<&'a [&'a str]>,
}

impl<'a> OpenInfo<'a> {
    /// Lower-case extension of the resource name, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// The header as text, replacing invalid UTF-8.
    pub fn header_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.header)
    }

    pub fn header_starts_with(&self, signature: &[u8]) -> bool {
        self.header.starts_with(signature)
    }
}

/// A format implementation.
///
/// Implementors are registered into a [`DriverRegistry`](crate::DriverRegistry)
/// wrapped in a [`Driver`] handle. Probing (`identify`) must be cheap and must
/// not touch the resource beyond the header it is given.
pub trait FormatDriver: Send + Sync {
    /// Unique (case-insensitive) identifier, e.g. `MEM`.
    fn short_name(&self) -> &str;

    fn long_name(&self) -> &str;

    fn capabilities(&self) -> DriverCapabilities;

    /// File extensions, without the dot. The first one is the primary extension.
    fn extensions(&self) -> &[&str] {
        &[]
    }

    fn creation_option_list(&self) -> &[CreationOptionDefn] {
        &[]
    }

    /// Returns `true` if this driver recognizes the resource.
    fn identify(&self, info: &OpenInfo) -> bool;

    fn open(&self, info: &OpenInfo) -> Result<Box<dyn FormatDataset>> {
        let _ = info;
        Err(GeoDataError::unsupported(self.short_name(), "open"))
    }

    /// Creates a new dataset. `options` have already been validated.
    fn create(
        &self,
        filename: &str,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
        options: &NameValueList,
    ) -> Result<Box<dyn FormatDataset>> {
        let _ = (filename, size, bands, data_type, options);
        Err(GeoDataError::unsupported(self.short_name(), "create"))
    }

    /// Native create-copy, used when [`DriverCapabilities::CREATE_COPY`] is set.
    fn create_copy(
        &self,
        filename: &str,
        src: &Dataset,
        strict: bool,
        options: &NameValueList,
        progress: &mut Progress,
    ) -> Result<Box<dyn FormatDataset>> {
        let _ = (filename, src, strict, options, progress);
        Err(GeoDataError::unsupported(self.short_name(), "create-copy"))
    }

    /// Native delete. `None` selects the file-list based default.
    fn delete(&self, filename: &str) -> Option<Result<()>> {
        let _ = filename;
        None
    }

    /// Native rename. `None` selects the file-list based default.
    fn rename(&self, new_name: &str, old_name: &str) -> Option<Result<()>> {
        let _ = (new_name, old_name);
        None
    }

    /// Native copy. `None` selects the file-list based default.
    fn copy_files(&self, new_name: &str, old_name: &str) -> Option<Result<()>> {
        let _ = (new_name, old_name);
        None
    }
}

/// Handle to a format driver.
///
/// Cloning is cheap; clones refer to the same driver. Identity is the short name.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<dyn FormatDriver>,
}

impl Driver {
    pub fn new<D: FormatDriver + 'static>(driver: D) -> Driver {
        Driver {
            inner: Arc::new(driver),
        }
    }

    pub fn short_name(&self) -> String {
        self.inner.short_name().to_string()
    }

    pub fn long_name(&self) -> String {
        self.inner.long_name().to_string()
    }

    pub fn capabilities(&self) -> DriverCapabilities {
        self.inner.capabilities()
    }

    pub fn extensions(&self) -> Vec<String> {
        self.inner
            .extensions()
            .iter()
            .map(|ext| ext.to_string())
            .collect()
    }

    pub fn creation_option_list(&self) -> &[CreationOptionDefn] {
        self.inner.creation_option_list()
    }

    /// The creation option schema as `<CreationOptionList>` XML.
    pub fn creation_option_list_xml(&self) -> String {
        creation_option_list_xml(self.inner.creation_option_list())
    }

    /// Validates `options` against this driver's creation option schema.
    pub fn validate_creation_options(
        &self,
        options: &NameValueList,
    ) -> Result<Vec<ValidationWarning>> {
        validate_creation_options(
            self.inner.short_name(),
            self.inner.creation_option_list(),
            options,
        )
    }

    pub(crate) fn is_same(&self, other: &Driver) -> bool {
        self.inner
            .short_name()
            .eq_ignore_ascii_case(other.inner.short_name())
    }

    pub(crate) fn has_name(&self, name: &str) -> bool {
        self.inner.short_name().eq_ignore_ascii_case(name)
    }

    /// Probes `filename` with this driver only.
    pub fn identify<P: AsRef<Path>>(&self, filename: P) -> bool {
        let filename = filename.as_ref().to_string_lossy();
        let header = vsi::read_header(filename.as_ref(), HEADER_BYTES).unwrap_or_default();
        let open_options = NameValueList::new();
        let info = OpenInfo {
            filename: &filename,
            access: Access::ReadOnly,
            flags: OpenFlags::default(),
            header: &header,
            open_options: &open_options,
            sibling_files: None,
        };
        self.identify_info(&info)
    }

    pub(crate) fn identify_info(&self, info: &OpenInfo) -> bool {
        self.inner.identify(info)
    }

    pub(crate) fn open_info(&self, info: &OpenInfo) -> Result<Dataset> {
        let backend = self.inner.open(info)?;
        log::debug!("{} opened '{}'", self.inner.short_name(), info.filename);
        Ok(Dataset::from_backend(
            backend,
            self.clone(),
            info.filename,
            info.access,
        ))
    }

    /// Opens `filename` with this driver, bypassing registry probing.
    fn open_with_this_driver(&self, filename: &str) -> Result<Dataset> {
        let header = vsi::read_header(filename, HEADER_BYTES).unwrap_or_default();
        let open_options = NameValueList::new();
        let info = OpenInfo {
            filename,
            access: Access::ReadOnly,
            flags: OpenFlags::default(),
            header: &header,
            open_options: &open_options,
            sibling_files: None,
        };
        if !self.identify_info(&info) {
            return Err(GeoDataError::UnsupportedFormat {
                name: filename.to_string(),
            });
        }
        self.open_info(&info)
    }

    /// Create a new dataset of size (`size_x`, `size_y`) and `bands` band count,
    /// and `u8` as the cell data type.
    ///
    /// To specify an alternative data type (e.g. `f32`), use [`Driver::create_with_band_type`].
    ///
    /// See also: [`Driver::create_with_band_type_with_options`].
    ///
    /// # Example
    ///
    /// ```rust
    /// # fn main() -> geodata::errors::Result<()> {
    /// use geodata::DriverManager;
    /// let d = DriverManager::get_driver_by_name("MEM")?;
    /// let ds = d.create("in-memory", 64, 64, 3)?;
    /// assert_eq!(ds.raster_count()?, 3);
    /// assert_eq!(ds.raster_size()?, (64, 64));
    /// assert_eq!(ds.rasterband(1)?.band_type(), geodata::raster::DataType::UInt8);
    /// # Ok(())
    /// # }
    /// ```
    pub fn create<P: AsRef<Path>>(
        &self,
        filename: P,
        size_x: usize,
        size_y: usize,
        bands: usize,
    ) -> Result<Dataset> {
        self.create_with_band_type::<u8, _>(filename, size_x, size_y, bands)
    }

    /// Create a new dataset of size (`size_x`, `size_y`) and `bands` band count,
    /// with cell data type specified by `T`.
    pub fn create_with_band_type<T: PixelType, P: AsRef<Path>>(
        &self,
        filename: P,
        size_x: usize,
        size_y: usize,
        bands: usize,
    ) -> Result<Dataset> {
        let options = RasterCreationOptions::default();
        self.create_with_band_type_with_options::<T, _>(filename, size_x, size_y, bands, &options)
    }

    /// Create a new dataset of size (`size_x`, `size_y`) and `bands` band count,
    /// with cell data type specified by `T` and extended options specified via `options`.
    pub fn create_with_band_type_with_options<T: PixelType, P: AsRef<Path>>(
        &self,
        filename: P,
        size_x: usize,
        size_y: usize,
        bands: usize,
        options: &RasterCreationOptions,
    ) -> Result<Dataset> {
        self.create_with_data_type(filename, (size_x, size_y), bands, T::data_type(), options)
    }

    /// Creates a dataset with no raster bands, for vector content.
    pub fn create_vector_only<P: AsRef<Path>>(&self, filename: P) -> Result<Dataset> {
        self.create_with_data_type(
            filename,
            (0, 0),
            0,
            DataType::Unknown,
            &RasterCreationOptions::default(),
        )
    }

    /// Create a new dataset with the band type given at runtime.
    ///
    /// `options` are validated first; problems that are not fatal are reported
    /// as warnings and creation continues.
    pub fn create_with_data_type<P: AsRef<Path>>(
        &self,
        filename: P,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
        options: &RasterCreationOptions,
    ) -> Result<Dataset> {
        let filename = filename.as_ref().to_string_lossy();
        let capabilities = self.capabilities();
        if !capabilities.contains(DriverCapabilities::CREATE) {
            let operation = if capabilities.contains(DriverCapabilities::CREATE_COPY) {
                "create (only create-copy is available)"
            } else {
                "create"
            };
            return Err(GeoDataError::unsupported(self.inner.short_name(), operation));
        }

        self.validate_creation_options(options)?;
        let backend = self
            .inner
            .create(&filename, size, bands, data_type, options)?;
        log::debug!(
            "{} created '{}' ({}x{}, {} band(s) of {})",
            self.inner.short_name(),
            filename,
            size.0,
            size.1,
            bands,
            data_type
        );
        Ok(Dataset::from_backend(
            backend,
            self.clone(),
            &filename,
            Access::Update,
        ))
    }

    /// Creates a dataset, hands it to `f` and closes it on every exit path.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn with_create<P, R, F>(
        &self,
        filename: P,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
        options: &RasterCreationOptions,
        f: F,
    ) -> Result<R>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Dataset) -> Result<R>,
    {
        let mut dataset = self.create_with_data_type(filename, size, bands, data_type, options)?;
        let result = f(&mut dataset);
        let closed = dataset.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Copies `src` into a new dataset named `filename` created by this driver.
    ///
    /// With `strict`, any attribute this driver cannot represent fails the
    /// copy; otherwise it is dropped with a warning. Size and band count are
    /// always preserved. Drivers without a native create-copy get a dataset
    /// from [`FormatDriver::create`] filled by
    /// [`copy_whole_raster`](crate::raster::copy_whole_raster).
    ///
    /// The returned dataset is flushed.
    pub fn create_copy<P: AsRef<Path>>(
        &self,
        filename: P,
        src: &Dataset,
        strict: bool,
        options: &RasterCreationOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<Dataset> {
        let filename = filename.as_ref().to_string_lossy();
        let mut progress = Progress::new(progress);
        let capabilities = self.capabilities();

        if capabilities.contains(DriverCapabilities::CREATE_COPY) {
            self.validate_creation_options(options)?;
            let backend =
                self.inner
                    .create_copy(&filename, src, strict, options, &mut progress)?;
            let mut dataset =
                Dataset::from_backend(backend, self.clone(), &filename, Access::Update);
            dataset.flush()?;
            return Ok(dataset);
        }

        if !capabilities.contains(DriverCapabilities::CREATE) {
            return Err(GeoDataError::unsupported(
                self.inner.short_name(),
                "create-copy",
            ));
        }

        let mut dst = self.create_like(&filename, src, strict, options)?;
        self.copy_attributes(src, &mut dst, strict)?;
        copy_whole_raster_with(src, &mut dst, &NameValueList::new(), &mut progress)?;
        dst.flush()?;
        Ok(dst)
    }

    /// Creates a dataset with the size and band types of `src`.
    ///
    /// Mixed band types need [`FormatDataset::add_band`]; without it a strict
    /// copy fails and a lenient one falls back to the first band's type.
    fn create_like(
        &self,
        filename: &str,
        src: &Dataset,
        strict: bool,
        options: &RasterCreationOptions,
    ) -> Result<Dataset> {
        let size = src.raster_size()?;
        let band_types = src
            .rasterbands()
            .map(|band| band.map(|band| band.band_type()))
            .collect::<Result<Vec<_>>>()?;
        let data_type = band_types.first().copied().unwrap_or(DataType::Unknown);
        if band_types.iter().all(|t| *t == data_type) {
            return self.create_with_data_type(filename, size, band_types.len(), data_type, options);
        }

        let mut dst = self.create_with_data_type(filename, size, 1, data_type, options)?;
        let added = band_types[1..]
            .iter()
            .try_for_each(|t| dst.add_band(*t, options));
        let Err(e) = added else {
            return Ok(dst);
        };

        let driver = self.inner.short_name();
        if strict {
            return Err(GeoDataError::StrictCopy(format!(
                "{driver} cannot preserve mixed band types: {e}"
            )));
        }
        config::report(
            ErrorClass::Warning,
            error_num::NOT_SUPPORTED,
            &format!("{driver} dropped mixed band types, all bands are {data_type}: {e}"),
        );
        dst.close()?;
        self.create_with_data_type(filename, size, band_types.len(), data_type, options)
    }

    fn copy_attributes(&self, src: &Dataset, dst: &mut Dataset, strict: bool) -> Result<()> {
        let driver = self.inner.short_name();
        let keep = |result: Result<()>, what: &str| -> Result<()> {
            match result {
                Ok(()) => Ok(()),
                Err(e) if strict => Err(GeoDataError::StrictCopy(format!(
                    "{driver} cannot preserve {what}: {e}"
                ))),
                Err(e) => {
                    config::report(
                        ErrorClass::Warning,
                        error_num::NOT_SUPPORTED,
                        &format!("{driver} dropped {what}: {e}"),
                    );
                    Ok(())
                }
            }
        };

        if let Some(gt) = src.native_geo_transform()? {
            keep(dst.set_geo_transform(&gt), "the geotransform")?;
        }
        let projection = src.projection()?;
        if !projection.is_empty() {
            keep(dst.set_projection(&projection), "the projection")?;
        }
        let gcps = src.gcps()?;
        if !gcps.is_empty() {
            let gcp_projection = src.gcp_projection()?.unwrap_or_default();
            keep(dst.set_gcps(&gcps, &gcp_projection), "the ground control points")?;
        }
        for (index, band) in src.rasterbands().enumerate() {
            let band = band?;
            if let Some(no_data) = band.no_data_value()? {
                let mut dst_band = dst.rasterband(index + 1)?;
                keep(dst_band.set_no_data_value(Some(no_data)), "nodata values")?;
            }
        }
        Ok(())
    }

    /// Deletes the named dataset and its companion files.
    pub fn delete<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let filename = filename.as_ref().to_string_lossy();
        if let Some(result) = self.inner.delete(&filename) {
            return result;
        }

        for file in self.resource_files(&filename)? {
            vsi::unlink(&file)?;
        }
        Ok(())
    }

    /// Renames the dataset `old_filename` to `new_filename`, companion files included.
    pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        new_filename: P,
        old_filename: Q,
    ) -> Result<()> {
        let new_filename = new_filename.as_ref().to_string_lossy();
        let old_filename = old_filename.as_ref().to_string_lossy();
        if let Some(result) = self.inner.rename(&new_filename, &old_filename) {
            return result;
        }

        let files = self.resource_files(&old_filename)?;
        let targets = corresponding_paths(&old_filename, &new_filename, &files)?;
        for (from, to) in files.iter().zip(targets) {
            vsi::rename(from, to)?;
        }
        Ok(())
    }

    /// Copies the files of dataset `old_filename` to `new_filename`.
    pub fn copy_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        new_filename: P,
        old_filename: Q,
    ) -> Result<()> {
        let new_filename = new_filename.as_ref().to_string_lossy();
        let old_filename = old_filename.as_ref().to_string_lossy();
        if let Some(result) = self.inner.copy_files(&new_filename, &old_filename) {
            return result;
        }

        let files = self.resource_files(&old_filename)?;
        let targets = corresponding_paths(&old_filename, &new_filename, &files)?;
        for (from, to) in files.iter().zip(targets) {
            vsi::copy_file(from, to)?;
        }
        Ok(())
    }

    fn resource_files(&self, filename: &str) -> Result<Vec<String>> {
        let mut dataset = self.open_with_this_driver(filename)?;
        let files = dataset.file_list()?;
        dataset.close()?;
        if files.is_empty() {
            return Err(GeoDataError::NotFound {
                what: format!("Files backing '{filename}'"),
            });
        }
        Ok(files)
    }
}

/// Maps every file of a dataset named `old` to its counterpart for `new`.
///
/// Companion files share the stem of the primary file; the part after the
/// stem (usually the extension) is kept.
fn corresponding_paths(old: &str, new: &str, files: &[String]) -> Result<Vec<PathBuf>> {
    let old_stem = Path::new(old).with_extension("");
    let new_stem = Path::new(new).with_extension("");
    let old_stem = old_stem.to_string_lossy();
    let new_stem = new_stem.to_string_lossy();

    files
        .iter()
        .map(|file| {
            if file == old {
                Ok(PathBuf::from(new))
            } else if let Some(rest) = file.strip_prefix(old_stem.as_ref()) {
                Ok(PathBuf::from(format!("{new_stem}{rest}")))
            } else {
                Err(GeoDataError::BadArgument(format!(
                    "cannot derive a new name for companion file '{file}'"
                )))
            }
        })
        .collect()
}

impl PartialEq for Driver {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Debug for Driver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("short_name", &self.inner.short_name())
            .field("capabilities", &self.inner.capabilities())
            .finish()
    }
}

impl Metadata for Driver {
    fn metadata_domains(&self) -> Vec<String> {
        vec![String::new()]
    }

    fn metadata_domain(&self, domain: &str) -> Option<NameValueList> {
        if !domain.is_empty() {
            return None;
        }
        let capabilities = self.capabilities();
        let flags = [
            ("DCAP_RASTER", DriverCapabilities::RASTER),
            ("DCAP_VECTOR", DriverCapabilities::VECTOR),
            ("DCAP_OPEN", DriverCapabilities::OPEN),
            ("DCAP_CREATE", DriverCapabilities::CREATE),
            ("DCAP_CREATECOPY", DriverCapabilities::CREATE_COPY),
            ("DCAP_VIRTUALIO", DriverCapabilities::VIRTUAL_IO),
        ];

        let mut items = NameValueList::new();
        items.set_name_value("DMD_LONGNAME", self.inner.long_name()).ok()?;
        for (key, flag) in flags {
            if capabilities.contains(flag) {
                items.set_name_value(key, "YES").ok()?;
            }
        }
        if !self.inner.extensions().is_empty() {
            items
                .set_name_value("DMD_EXTENSIONS", &self.inner.extensions().join(" "))
                .ok()?;
        }
        if !self.inner.creation_option_list().is_empty() {
            // the XML spans several lines, which a list value cannot hold
            let xml = self.creation_option_list_xml().replace('\n', "");
            items.set_name_value("DMD_CREATIONOPTIONLIST", &xml).ok()?;
        }
        Some(items)
    }

    fn set_metadata_item(&mut self, _key: &str, _value: &str, _domain: &str) -> Result<()> {
        Err(GeoDataError::unsupported(
            self.inner.short_name(),
            "setting driver metadata",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockDriver;

    const SCHEMA: &[CreationOptionDefn] = &[
        CreationOptionDefn::new("BLOCKSIZE", OptionKind::Int, "Block height"),
        CreationOptionDefn::new("SCALE", OptionKind::Float, "Scale factor"),
        CreationOptionDefn::new("TILED", OptionKind::Boolean, "Tiling").with_default("NO"),
        CreationOptionDefn::new(
            "COMPRESS",
            OptionKind::StringSelect(&["NONE", "LZW", "DEFLATE"]),
            "Compression & <friends>",
        ),
    ];

    #[test]
    fn test_validate_accepts_known_options() {
        let options = NameValueList::from(&[
            ("BLOCKSIZE", "256"),
            ("scale", "0.5"),
            ("TILED", "yes"),
            ("COMPRESS", "lzw"),
        ]);
        let warnings = validate_creation_options("TEST", SCHEMA, &options).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_validate_warns_without_failing() {
        let options = NameValueList::from(&[
            ("BLOCKSIZE", "big"),
            ("TILED", "maybe"),
            ("COMPRESS", "JPEG"),
            ("UNKNOWN", "1"),
        ]);
        let warnings = validate_creation_options("TEST", SCHEMA, &options).unwrap();
        let keys: Vec<_> = warnings.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, vec!["BLOCKSIZE", "TILED", "COMPRESS", "UNKNOWN"]);
        assert!(warnings[3].message.contains("does not support"));
    }

    #[test]
    fn test_validate_required() {
        const REQUIRED: &[CreationOptionDefn] =
            &[CreationOptionDefn::new("TABLE", OptionKind::String, "Table name").required()];
        let err = validate_creation_options("TEST", REQUIRED, &NameValueList::new()).unwrap_err();
        assert!(matches!(err, GeoDataError::BadArgument(_)));
        let ok = NameValueList::from(&[("TABLE", "t")]);
        assert!(validate_creation_options("TEST", REQUIRED, &ok).is_ok());
    }

    #[test]
    fn test_option_list_xml() {
        let xml = creation_option_list_xml(SCHEMA);
        assert!(xml.starts_with("<CreationOptionList>"));
        assert!(xml.contains(r#"<Option name="TILED" type="boolean" description="Tiling" default="NO"/>"#));
        assert!(xml.contains("<Value>DEFLATE</Value>"));
        assert!(xml.contains("Compression &amp; &lt;friends&gt;"));
    }

    #[test]
    fn test_corresponding_paths() {
        let files = vec!["/data/a.asc".to_string(), "/data/a.prj".to_string()];
        let mapped = corresponding_paths("/data/a.asc", "/out/b.asc", &files).unwrap();
        assert_eq!(
            mapped,
            vec![PathBuf::from("/out/b.asc"), PathBuf::from("/out/b.prj")]
        );

        let stray = vec!["/elsewhere/x.aux".to_string()];
        assert!(corresponding_paths("/data/a.asc", "/out/b.asc", &stray).is_err());
    }

    #[test]
    fn test_driver_identity_and_metadata() {
        let a = Driver::new(MockDriver::new("MockA", b"MOCKA"));
        let b = Driver::new(MockDriver::new("mocka", b"MOCKA"));
        assert_eq!(a, b);

        assert_eq!(a.metadata_item("DCAP_RASTER", "").as_deref(), Some("YES"));
        assert_eq!(
            a.metadata_item("DMD_LONGNAME", "").as_deref(),
            Some("Mock driver MockA")
        );
        assert!(a.metadata_item("DCAP_VECTOR", "").is_none());
    }

    #[test]
    fn test_create_unsupported() {
        let driver = Driver::new(MockDriver::new("MockRO", b"MOCKRO").read_only());
        let err = driver.create("/vsimem/driver-tests/ro", 1, 1, 1).unwrap_err();
        assert!(matches!(err, GeoDataError::UnsupportedOperation { .. }));

        let src = crate::DriverManager::get_driver_by_name("MEM")
            .unwrap()
            .create("", 1, 1, 1)
            .unwrap();
        let err = driver
            .create_copy("/vsimem/driver-tests/ro", &src, false, &NameValueList::new(), None)
            .unwrap_err();
        assert!(matches!(err, GeoDataError::UnsupportedOperation { .. }));
    }
}
