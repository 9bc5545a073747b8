use crate::dataset::Dataset;
use crate::errors::{GeoDataError, Result};
use crate::progress::{Progress, ProgressCallback};
use crate::string_list::NameValueList;

/// Copies every pixel of every band of `src` into `dst`.
///
/// Both datasets must have the same size and band count. Values are adjusted
/// to the destination band types. Recognized `options`:
///
/// * `INTERLEAVE=PIXEL` copies all bands of a swath before moving on;
///   `INTERLEAVE=BAND` (the default) copies band by band.
/// * `COMPRESSED=YES` uses the whole raster as a single swath.
/// * `SKIP_HOLES=YES` is accepted and has no effect.
///
/// The swath height is the largest block height of the two datasets.
pub fn copy_whole_raster(
    src: &Dataset,
    dst: &mut Dataset,
    options: &NameValueList,
    progress: Option<ProgressCallback>,
) -> Result<()> {
    copy_whole_raster_with(src, dst, options, &mut Progress::new(progress))
}

pub(crate) fn copy_whole_raster_with(
    src: &Dataset,
    dst: &mut Dataset,
    options: &NameValueList,
    progress: &mut Progress,
) -> Result<()> {
    let (width, height) = src.raster_size()?;
    let bands = src.raster_count()?;
    let (dst_width, dst_height) = dst.raster_size()?;
    let dst_bands = dst.raster_count()?;
    if (width, height, bands) != (dst_width, dst_height, dst_bands) {
        return Err(GeoDataError::ShapeMismatch {
            src: (width, height, bands),
            dst: (dst_width, dst_height, dst_bands),
        });
    }
    dst.check_writable("raster writes")?;

    let pixel_interleave = match options.fetch_name_value("INTERLEAVE") {
        None => false,
        Some(v) if v.eq_ignore_ascii_case("BAND") => false,
        Some(v) if v.eq_ignore_ascii_case("PIXEL") => true,
        Some(v) => {
            return Err(GeoDataError::BadArgument(format!(
                "unsupported INTERLEAVE value '{v}'"
            )))
        }
    };

    progress.report(0.0, "")?;
    if bands == 0 || width == 0 || height == 0 {
        return progress.report(1.0, "");
    }

    let swath_lines = if options.fetch_bool("COMPRESSED", false) {
        height
    } else {
        let mut lines = 1;
        for band in 1..=bands {
            lines = lines
                .max(src.block_size(band)?.1)
                .max(dst.block_size(band)?.1);
        }
        lines.min(height)
    };
    log::debug!(
        "copying {width}x{height}x{bands} in swaths of {swath_lines} line(s), {} interleaved",
        if pixel_interleave { "pixel" } else { "band" }
    );

    let dst_types = (1..=bands)
        .map(|band| dst.band_type(band))
        .collect::<Result<Vec<_>>>()?;
    let mut swath = vec![0.0; width * swath_lines];
    let mut copy_swath = |band: usize, y: usize| -> Result<()> {
        let lines = swath_lines.min(height - y);
        let values = &mut swath[..width * lines];
        src.read_window(band, (0, y), (width, lines), values)?;
        let data_type = dst_types[band - 1];
        for value in values.iter_mut() {
            *value = data_type.adjust_value(*value);
        }
        dst.write_window(band, (0, y), (width, lines), values)
    };

    let total = (bands * height) as f64;
    if pixel_interleave {
        for y in (0..height).step_by(swath_lines) {
            for band in 1..=bands {
                copy_swath(band, y)?;
            }
            let done = (y + swath_lines).min(height) * bands;
            progress.report(done as f64 / total, "")?;
        }
    } else {
        for band in 1..=bands {
            for y in (0..height).step_by(swath_lines) {
                copy_swath(band, y)?;
                let done = (band - 1) * height + (y + swath_lines).min(height);
                progress.report(done as f64 / total, "")?;
            }
        }
    }
    Ok(())
}
