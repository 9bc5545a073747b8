use crate::dataset::Dataset;
use crate::errors::{GeoDataError, Result};
use crate::raster::{Buffer, DataType, PixelType};

#[cfg(feature = "ndarray")]
use ndarray::Array2;

/// Represents a single band of a dataset.
///
/// This object carries the lifetime of the dataset that
/// contains it. This is necessary to prevent the dataset
/// from being dropped (or closed) before the band.
#[derive(Debug)]
pub struct RasterBand<'a> {
    dataset: &'a Dataset,
    index: usize,
    size: (usize, usize),
    band_type: DataType,
    block_size: (usize, usize),
}

impl<'a> RasterBand<'a> {
    pub(crate) fn new(dataset: &'a Dataset, index: usize) -> Result<Self> {
        Ok(RasterBand {
            dataset,
            index,
            size: dataset.raster_size()?,
            band_type: dataset.band_type(index)?,
            block_size: dataset.block_size(index)?,
        })
    }

    /// The _1-based_ index of this band in its dataset.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Get block size from a 'Dataset'.
    pub fn block_size(&self) -> (usize, usize) {
        self.block_size
    }

    /// Get x-size of the band
    pub fn x_size(&self) -> usize {
        self.size.0
    }

    /// Get y-size of the band
    pub fn y_size(&self) -> usize {
        self.size.1
    }

    /// Get dimensions of the band.
    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    pub fn band_type(&self) -> DataType {
        self.band_type
    }

    /// Checks that the window lies inside the band and converts its offset.
    fn check_window(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
    ) -> Result<(usize, usize)> {
        let inside = |offset: isize, len: usize, extent: usize| {
            offset >= 0
                && (offset as usize)
                    .checked_add(len)
                    .is_some_and(|end| end <= extent)
        };
        if !inside(window.0, window_size.0, self.size.0)
            || !inside(window.1, window_size.1, self.size.1)
        {
            return Err(GeoDataError::BadArgument(format!(
                "window {window:?} of size {window_size:?} is outside band {} of size {:?}",
                self.index, self.size
            )));
        }
        Ok((window.0 as usize, window.1 as usize))
    }

    /// Read data from this band into a slice. T implements 'PixelType'
    ///
    /// # Arguments
    /// * window - the window position from top left
    /// * window_size - the window size, which must lie inside the band
    /// * buffer - a slice to hold the data (length must equal product of window_size)
    pub fn read_into_slice<T: PixelType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
        buffer: &mut [T],
    ) -> Result<()> {
        let offset = self.check_window(window, window_size)?;
        let pixels = window_size.0 * window_size.1;
        if buffer.len() != pixels {
            return Err(GeoDataError::BadArgument(format!(
                "buffer holds {} values, window needs {pixels}",
                buffer.len()
            )));
        }

        let mut values = vec![0.0; pixels];
        self.dataset
            .read_window(self.index, offset, window_size, &mut values)?;
        for (dst, value) in buffer.iter_mut().zip(values) {
            *dst = T::from_f64(value);
        }
        Ok(())
    }

    /// Read a 'Buffer<T>' from this band. T implements 'PixelType'
    ///
    /// # Arguments
    /// * window - the window position from top left
    /// * window_size - the window size, which is also the size of the 'Buffer'
    pub fn read_as<T: PixelType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
    ) -> Result<Buffer<T>> {
        let mut data = vec![T::from_f64(0.0); window_size.0 * window_size.1];
        self.read_into_slice(window, window_size, &mut data)?;
        Ok(Buffer::new(window_size, data))
    }

    #[cfg(feature = "ndarray")]
    /// Read a 'Array2<T>' from this band. T implements 'PixelType'.
    ///
    /// # Docs
    /// The Matrix shape is (rows, cols) and raster shape is (cols in x-axis, rows in y-axis).
    pub fn read_as_array<T: PixelType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
    ) -> Result<Array2<T>> {
        self.read_as::<T>(window, window_size)?.to_array()
    }

    /// Read the full band as a 'Buffer<T>'.
    pub fn read_band_as<T: PixelType>(&self) -> Result<Buffer<T>> {
        self.read_as::<T>((0, 0), self.size)
    }

    /// Get actual block size (at the edges) when block size
    /// does not divide band size.
    pub fn actual_block_size(&self, block_index: (usize, usize)) -> Result<(usize, usize)> {
        let (block_x, block_y) = self.block_size;
        let blocks_x = self.size.0.div_ceil(block_x.max(1));
        let blocks_y = self.size.1.div_ceil(block_y.max(1));
        if block_index.0 >= blocks_x || block_index.1 >= blocks_y {
            return Err(GeoDataError::BadArgument(format!(
                "block index {block_index:?} outside {blocks_x}x{blocks_y} blocks"
            )));
        }
        let width = block_x.min(self.size.0 - block_index.0 * block_x);
        let height = block_y.min(self.size.1 - block_index.1 * block_y);
        Ok((width, height))
    }

    /// Read the block at `block_index` as a 'Buffer<T>'. Edge blocks are truncated.
    pub fn read_block<T: PixelType>(&self, block_index: (usize, usize)) -> Result<Buffer<T>> {
        let size = self.actual_block_size(block_index)?;
        let window = (
            (block_index.0 * self.block_size.0) as isize,
            (block_index.1 * self.block_size.1) as isize,
        );
        self.read_as(window, size)
    }

    /// Write a 'Buffer<T>' into the band, with its top left corner at `window`.
    ///
    /// Values are adjusted to the band's data type.
    pub fn write<T: PixelType>(&mut self, window: (isize, isize), buffer: &Buffer<T>) -> Result<()> {
        let offset = self.check_window(window, buffer.size)?;
        if buffer.data.len() != buffer.size.0 * buffer.size.1 {
            return Err(GeoDataError::BadArgument(format!(
                "buffer of size {:?} holds {} values",
                buffer.size,
                buffer.data.len()
            )));
        }

        let values: Vec<f64> = buffer
            .data
            .iter()
            .map(|v| self.band_type.adjust_value(v.to_f64()))
            .collect();
        self.dataset
            .write_window(self.index, offset, buffer.size, &values)
    }

    /// Sets every pixel of the band to `value`.
    pub fn fill(&mut self, value: f64) -> Result<()> {
        let value = self.band_type.adjust_value(value);
        let (width, height) = self.size;
        let rows = self.block_size.1.clamp(1, height.max(1));
        let line = vec![value; width * rows];
        let mut y = 0;
        while y < height {
            let chunk = rows.min(height - y);
            self.dataset.write_window(
                self.index,
                (0, y),
                (width, chunk),
                &line[..width * chunk],
            )?;
            y += chunk;
        }
        Ok(())
    }

    pub fn no_data_value(&self) -> Result<Option<f64>> {
        self.dataset.no_data_value(self.index)
    }

    /// Sets the nodata value, or removes it with `None`.
    pub fn set_no_data_value(&mut self, no_data: Option<f64>) -> Result<()> {
        self.dataset.set_no_data_value(self.index, no_data)
    }
}
