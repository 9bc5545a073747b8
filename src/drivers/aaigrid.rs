//! Arc/Info ASCII Grid
//!
//! ```text
//! ncols        4
//! nrows        2
//! xllcorner    100.0
//! yllcorner    40.0
//! cellsize     5.0
//! NODATA_value -9999
//! 1 2 3 4
//! 5 6 7 -9999
//! ```
//!
//! A single band, stored as text. The projection lives in a `.prj` file next
//! to the grid. Writing goes through create-copy only.

use std::path::Path;

use crate::config::{self, error_num};
use crate::dataset::{Dataset, FormatDataset};
use crate::driver::{CreationOptionDefn, DriverCapabilities, FormatDriver, OpenInfo, OptionKind};
use crate::errors::{ErrorClass, GeoDataError, Result};
use crate::geo_transform::GeoTransform;
use crate::options::Access;
use crate::progress::Progress;
use crate::raster::DataType;
use crate::spatial_ref::SpatialRef;
use crate::string_list::NameValueList;
use crate::vsi;

const HEADER_KEYWORDS: &[&str] = &[
    "ncols",
    "nrows",
    "xllcorner",
    "yllcorner",
    "xllcenter",
    "yllcenter",
    "cellsize",
    "dx",
    "dy",
    "nodata_value",
];

const CREATION_OPTIONS: &[CreationOptionDefn] = &[
    CreationOptionDefn::new(
        "FORCE_CELLSIZE",
        OptionKind::Boolean,
        "Force use of CELLSIZE, average of dx and dy when they differ",
    ),
    CreationOptionDefn::new(
        "DECIMAL_PRECISION",
        OptionKind::Int,
        "Number of decimal places when writing floating-point values",
    ),
    CreationOptionDefn::new(
        "SIGNIFICANT_DIGITS",
        OptionKind::Int,
        "Number of significant digits when writing floating-point values",
    ),
];

/// The `AAIGrid` driver.
#[derive(Debug, Default)]
pub struct AaiGridDriver;

impl FormatDriver for AaiGridDriver {
    fn short_name(&self) -> &str {
        "AAIGrid"
    }

    fn long_name(&self) -> &str {
        "Arc/Info ASCII Grid"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities::RASTER
            | DriverCapabilities::OPEN
            | DriverCapabilities::CREATE_COPY
            | DriverCapabilities::VIRTUAL_IO
    }

    fn extensions(&self) -> &[&str] {
        &["asc"]
    }

    fn creation_option_list(&self) -> &[CreationOptionDefn] {
        CREATION_OPTIONS
    }

    fn identify(&self, info: &OpenInfo) -> bool {
        let header = info.header_str();
        let Some(first) = header.split_ascii_whitespace().next() else {
            return false;
        };
        HEADER_KEYWORDS
            .iter()
            .any(|keyword| keyword.eq_ignore_ascii_case(first))
    }

    fn open(&self, info: &OpenInfo) -> Result<Box<dyn FormatDataset>> {
        if info.access == Access::Update {
            return Err(GeoDataError::unsupported(
                self.short_name(),
                "update access",
            ));
        }
        let text = vsi::read_file(info.filename)?;
        let text = String::from_utf8_lossy(&text);
        let mut grid = AaiGrid::parse(info.filename, &text)?;

        let prj = prj_path(info.filename);
        if vsi::exists(&prj) {
            let content = vsi::read_file(&prj)?;
            let content = String::from_utf8_lossy(&content);
            // ESRI-style multi-line .prj files are not understood and skipped
            if let Ok(srs) = SpatialRef::from_wkt(&content) {
                grid.projection = srs.to_wkt();
            } else {
                log::debug!("ignoring {prj}: not a WKT definition");
            }
            grid.files.push(prj);
        }
        Ok(Box::new(grid))
    }

    fn create_copy(
        &self,
        filename: &str,
        src: &Dataset,
        strict: bool,
        options: &NameValueList,
        progress: &mut Progress,
    ) -> Result<Box<dyn FormatDataset>> {
        let bands = src.raster_count()?;
        if bands == 0 {
            return Err(GeoDataError::unsupported(
                self.short_name(),
                "datasets without bands",
            ));
        }
        if bands > 1 {
            lossy(
                strict,
                &format!("AAIGrid holds a single band, bands 2 to {bands} are dropped"),
            )?;
        }

        let band = src.rasterband(1)?;
        let (width, height) = band.size();
        let gt = match src.native_geo_transform()? {
            Some(gt) => {
                if gt[2] != 0.0 || gt[4] != 0.0 {
                    lossy(strict, "AAIGrid does not support rotated geotransforms")?;
                }
                if gt[5] > 0.0 {
                    lossy(strict, "AAIGrid does not support south-up grids")?;
                }
                gt
            }
            None => [0.0, 1.0, 0.0, height as f64, 0.0, -1.0],
        };

        let mut text = String::new();
        text.push_str(&format!("ncols        {width}\n"));
        text.push_str(&format!("nrows        {height}\n"));
        text.push_str(&format!("xllcorner    {}\n", gt[0]));
        let (dx, dy) = (gt[1], gt[5].abs());
        text.push_str(&format!("yllcorner    {}\n", gt[3] - dy * height as f64));

        if (dx - dy).abs() <= 1e-10 * dx.abs().max(dy) {
            text.push_str(&format!("cellsize     {dx}\n"));
        } else if options.fetch_bool("FORCE_CELLSIZE", false) {
            text.push_str(&format!("cellsize     {}\n", (dx + dy) / 2.0));
        } else {
            text.push_str(&format!("dx           {dx}\n"));
            text.push_str(&format!("dy           {dy}\n"));
        }

        let no_data = band.no_data_value()?;
        let formatter = ValueFormatter::new(band.band_type(), options)?;
        if let Some(no_data) = no_data {
            text.push_str(&format!("NODATA_value {}\n", formatter.format(no_data)));
        }

        // formatting the rows, the rest is writing
        progress.set_range(0.0, 0.9);
        let mut line = vec![0.0; width];
        for y in 0..height {
            band.read_into_slice((0, y as isize), (width, 1), &mut line)?;
            let row: Vec<String> = line.iter().map(|v| formatter.format(*v)).collect();
            text.push_str(&row.join(" "));
            text.push('\n');
            progress.report((y + 1) as f64 / height as f64, "")?;
        }
        vsi::write_file(filename, text.as_bytes())?;

        let projection = src.projection()?;
        if !projection.is_empty() {
            vsi::write_file(prj_path(filename), projection.as_bytes())?;
        }
        progress.set_range(0.0, 1.0);
        progress.report(1.0, "")?;

        let header = vsi::read_header(filename, crate::driver::HEADER_BYTES)?;
        let open_options = NameValueList::new();
        self.open(&OpenInfo {
            filename,
            access: Access::ReadOnly,
            flags: Default::default(),
            header: &header,
            open_options: &open_options,
            sibling_files: None,
        })
    }
}

/// Fails a strict copy, warns otherwise.
fn lossy(strict: bool, message: &str) -> Result<()> {
    if strict {
        return Err(GeoDataError::StrictCopy(message.to_string()));
    }
    config::report(ErrorClass::Warning, error_num::NOT_SUPPORTED, message);
    Ok(())
}

fn prj_path(filename: &str) -> String {
    Path::new(filename)
        .with_extension("prj")
        .to_string_lossy()
        .into_owned()
}

enum ValueFormatter {
    Integer,
    Decimals(usize),
    Significant(usize),
    Shortest,
}

impl ValueFormatter {
    fn new(data_type: DataType, options: &NameValueList) -> Result<Self> {
        let parse = |key: &str| -> Result<Option<usize>> {
            options
                .fetch_name_value(key)
                .map(|v| {
                    v.trim()
                        .parse::<usize>()
                        .map_err(|_| GeoDataError::BadArgument(format!("invalid {key} '{v}'")))
                })
                .transpose()
        };
        if data_type.is_integer() {
            return Ok(ValueFormatter::Integer);
        }
        if let Some(decimals) = parse("DECIMAL_PRECISION")? {
            return Ok(ValueFormatter::Decimals(decimals));
        }
        if let Some(digits) = parse("SIGNIFICANT_DIGITS")? {
            return Ok(ValueFormatter::Significant(digits.max(1)));
        }
        Ok(ValueFormatter::Shortest)
    }

    fn format(&self, value: f64) -> String {
        match self {
            ValueFormatter::Integer => format!("{}", value as i64),
            ValueFormatter::Decimals(decimals) => format!("{value:.decimals$}"),
            ValueFormatter::Significant(digits) => {
                if value == 0.0 || !value.is_finite() {
                    return format!("{value}");
                }
                let magnitude = value.abs().log10().floor() as i32;
                let decimals = (*digits as i32 - 1 - magnitude).max(0) as usize;
                format!("{value:.decimals$}")
            }
            ValueFormatter::Shortest => format!("{value}"),
        }
    }
}

/// An open grid, fully loaded.
#[derive(Debug)]
struct AaiGrid {
    size: (usize, usize),
    data_type: DataType,
    geo_transform: GeoTransform,
    no_data: Option<f64>,
    data: Vec<f64>,
    projection: String,
    files: Vec<String>,
}

impl AaiGrid {
    fn parse(name: &str, text: &str) -> Result<Self> {
        let mut tokens = text.split_ascii_whitespace().peekable();

        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut center = false;
        let mut cellsize = None;
        let mut dx = None;
        let mut dy = None;
        let mut no_data = None;

        while let Some(token) = tokens.peek() {
            let keyword = token.to_ascii_lowercase();
            if !HEADER_KEYWORDS.contains(&keyword.as_str()) {
                break;
            }
            tokens.next();
            let value = tokens
                .next()
                .ok_or_else(|| GeoDataError::corrupt(name, format!("no value for {keyword}")))?;
            let number = value.parse::<f64>().map_err(|_| {
                GeoDataError::corrupt(name, format!("invalid value '{value}' for {keyword}"))
            })?;
            match keyword.as_str() {
                "ncols" => ncols = Some(number),
                "nrows" => nrows = Some(number),
                "xllcorner" => xll = Some(number),
                "yllcorner" => yll = Some(number),
                "xllcenter" => {
                    xll = Some(number);
                    center = true;
                }
                "yllcenter" => {
                    yll = Some(number);
                    center = true;
                }
                "cellsize" => cellsize = Some(number),
                "dx" => dx = Some(number),
                "dy" => dy = Some(number),
                _ => no_data = Some(number),
            }
        }

        let missing = |what: &str| GeoDataError::corrupt(name, format!("missing {what}"));
        let dimension = |value: Option<f64>, what: &str| -> Result<usize> {
            match value {
                Some(v) if v >= 1.0 && v.fract() == 0.0 => Ok(v as usize),
                Some(v) => Err(GeoDataError::corrupt(name, format!("invalid {what} {v}"))),
                None => Err(missing(what)),
            }
        };
        let width = dimension(ncols, "ncols")?;
        let height = dimension(nrows, "nrows")?;
        let xll = xll.ok_or_else(|| missing("xllcorner"))?;
        let yll = yll.ok_or_else(|| missing("yllcorner"))?;
        let (dx, dy) = match (cellsize, dx, dy) {
            (Some(size), _, _) => (size, size),
            (None, Some(dx), Some(dy)) => (dx, dy),
            _ => return Err(missing("cellsize")),
        };
        let (left, bottom) = if center {
            (xll - dx / 2.0, yll - dy / 2.0)
        } else {
            (xll, yll)
        };

        // every cell takes at least one byte of text
        let cells = width
            .checked_mul(height)
            .filter(|cells| *cells <= text.len())
            .ok_or_else(|| {
                GeoDataError::corrupt(name, format!("{width}x{height} cells exceed the file size"))
            })?;

        let mut data = Vec::with_capacity(cells);
        let mut floating = false;
        for token in tokens.by_ref().take(cells) {
            floating |= token.contains(['.', 'e', 'E']);
            let value = token.parse::<f64>().map_err(|_| {
                GeoDataError::corrupt(name, format!("invalid cell value '{token}'"))
            })?;
            data.push(value);
        }
        if data.len() != cells {
            return Err(GeoDataError::corrupt(
                name,
                format!("expected {cells} cells, found {}", data.len()),
            ));
        }

        let data_type = match no_data {
            Some(v) if v.fract() != 0.0 => DataType::Float32,
            _ if floating => DataType::Float32,
            _ => DataType::Int32,
        };
        log::debug!("{name}: {width}x{height} {data_type} grid");

        Ok(AaiGrid {
            size: (width, height),
            data_type,
            geo_transform: [left, dx, 0.0, bottom + dy * height as f64, 0.0, -dy],
            no_data,
            data,
            projection: String::new(),
            files: vec![name.to_string()],
        })
    }
}

impl FormatDataset for AaiGrid {
    fn raster_size(&self) -> (usize, usize) {
        self.size
    }

    fn raster_count(&self) -> usize {
        1
    }

    fn band_type(&self, _band: usize) -> DataType {
        self.data_type
    }

    fn read_window(
        &mut self,
        _band: usize,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &mut [f64],
    ) -> Result<()> {
        let width = self.size.0;
        for (row, line) in buffer.chunks_exact_mut(size.0.max(1)).take(size.1).enumerate() {
            let start = (offset.1 + row) * width + offset.0;
            line.copy_from_slice(&self.data[start..start + size.0]);
        }
        Ok(())
    }

    fn no_data_value(&self, _band: usize) -> Option<f64> {
        self.no_data
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        Some(self.geo_transform)
    }

    fn projection(&self) -> String {
        self.projection.clone()
    }

    fn file_list(&self) -> Vec<String> {
        self.files.clone()
    }
}
