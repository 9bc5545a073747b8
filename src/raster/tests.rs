use crate::dataset::Dataset;
use crate::errors::GeoDataError;
use crate::raster::{copy_whole_raster, Buffer, ByteBuffer, DataType, RasterCreationOptions};
use crate::test_utils::{InMemoryFixture, MockDriver, WGS84_WKT};
use crate::{Driver, DriverManager, GeoTransformEx, NameValueList};

#[cfg(feature = "ndarray")]
use ndarray::arr2;

/// A 10x5 byte raster whose pixel at (x, y) holds `y * 10 + x`.
fn ramp(bands: usize) -> Dataset {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let dataset = driver
        .create_with_band_type::<u8, _>("", 10, 5, bands)
        .unwrap();
    for band in dataset.rasterbands() {
        let mut band = band.unwrap();
        let offset = (band.index() as u8 - 1) * 100;
        let data = (0..50u8).map(|v| v + offset).collect();
        band.write((0, 0), &Buffer::new((10, 5), data)).unwrap();
    }
    dataset
}

#[test]
fn test_read_raster() {
    let dataset = ramp(1);
    let rb = dataset.rasterband(1).unwrap();
    let rv = rb.read_as::<u8>((2, 3), (2, 2)).unwrap();
    assert_eq!(rv.size.0, 2);
    assert_eq!(rv.size.1, 2);
    assert_eq!(rv.data, vec!(32, 33, 42, 43));

    let mut buf = rv;
    rb.read_into_slice((7, 0), (2, 2), &mut buf.data).unwrap();
    assert_eq!(buf.data, vec!(7, 8, 17, 18));
}

#[test]
fn test_read_raster_as() {
    let dataset = ramp(1);
    let rb = dataset.rasterband(1).unwrap();
    let rv = rb.read_as::<f32>((0, 4), (3, 1)).unwrap();
    assert_eq!(rv.data, vec!(40.0, 41.0, 42.0));

    let rv = rb.read_band_as::<i16>().unwrap();
    assert_eq!(rv.shape(), (10, 5));
    assert_eq!(rv.get(9, 4), Some(49));
    assert_eq!(rv.get(10, 4), None);
}

#[test]
fn test_read_outside_band() {
    let dataset = ramp(1);
    let rb = dataset.rasterband(1).unwrap();
    for (window, size) in [((8, 4), (3, 1)), ((-1, 0), (1, 1)), ((0, 0), (10, 6))] {
        let result = rb.read_as::<u8>(window, size);
        assert!(
            matches!(result, Err(GeoDataError::BadArgument(_))),
            "{window:?} {size:?}"
        );
    }

    let mut short = vec![0u8; 3];
    assert!(matches!(
        rb.read_into_slice((0, 0), (2, 2), &mut short),
        Err(GeoDataError::BadArgument(_))
    ));
}

#[test]
fn test_write_raster() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let dataset = driver.create("", 20, 10, 1).unwrap();

    let raster = ByteBuffer::new((2, 1), vec![50u8, 20u8]);

    let mut rb = dataset.rasterband(1).unwrap();
    rb.write((18, 9), &raster).unwrap();

    let corner = rb.read_as::<u8>((17, 9), (3, 1)).unwrap();
    assert_eq!(corner.data, vec!(0, 50, 20));

    let outside = rb.write((19, 9), &raster);
    assert!(matches!(outside, Err(GeoDataError::BadArgument(_))));
}

#[test]
fn test_write_saturates_to_band_type() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let dataset = driver.create("", 3, 1, 1).unwrap();
    let mut rb = dataset.rasterband(1).unwrap();
    rb.write((0, 0), &Buffer::new((3, 1), vec![-4.0f64, 12.7, 1000.0]))
        .unwrap();
    let rv = rb.read_as::<f64>((0, 0), (3, 1)).unwrap();
    assert_eq!(rv.data, vec!(0.0, 12.0, 255.0));
}

#[test]
fn test_fill() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let dataset = driver
        .create_with_band_type::<i16, _>("", 4, 3, 2)
        .unwrap();
    let mut rb = dataset.rasterband(2).unwrap();
    rb.fill(-7.5).unwrap();

    let filled = rb.read_band_as::<i16>().unwrap();
    assert!(filled.data.iter().all(|v| *v == -7));
    let untouched = dataset.rasterband(1).unwrap().read_band_as::<i16>().unwrap();
    assert!(untouched.data.iter().all(|v| *v == 0));
}

#[test]
#[cfg(feature = "ndarray")]
fn test_read_raster_as_array() {
    let dataset = ramp(1);
    let rb = dataset.rasterband(1).unwrap();
    let values = rb.read_as_array::<u8>((1, 2), (3, 2)).unwrap();
    assert_eq!(values, arr2(&[[21, 22, 23], [31, 32, 33]]));
}

#[test]
fn test_read_block() {
    let dataset = ramp(1);
    let rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.block_size(), (10, 1));
    assert_eq!(rb.actual_block_size((0, 4)).unwrap(), (10, 1));
    assert!(rb.actual_block_size((0, 5)).is_err());
    assert!(rb.actual_block_size((1, 0)).is_err());

    let block = rb.read_block::<u8>((0, 3)).unwrap();
    assert_eq!(block.size, (10, 1));
    assert_eq!(block.data, (30..40).collect::<Vec<u8>>());
}

#[test]
fn test_rasterband_properties() {
    let dataset = ramp(2);
    let rb = dataset.rasterband(2).unwrap();
    assert_eq!(rb.index(), 2);
    assert_eq!(rb.size(), (10, 5));
    assert_eq!(rb.x_size(), 10);
    assert_eq!(rb.y_size(), 5);
    assert_eq!(rb.band_type(), DataType::UInt8);
    assert_eq!(rb.dataset().raster_count().unwrap(), 2);
}

#[test]
fn test_no_data_value() {
    let dataset = ramp(1);
    let mut rb = dataset.rasterband(1).unwrap();
    assert_eq!(rb.no_data_value().unwrap(), None);
    rb.set_no_data_value(Some(3.0)).unwrap();
    assert_eq!(rb.no_data_value().unwrap(), Some(3.0));
    rb.set_no_data_value(None).unwrap();
    assert_eq!(rb.no_data_value().unwrap(), None);
}

#[test]
fn test_copy_whole_raster() {
    let src = ramp(2);
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();

    for interleave in ["BAND", "PIXEL"] {
        let mut dst = driver
            .create_with_band_type::<u16, _>("", 10, 5, 2)
            .unwrap();
        let options = NameValueList::from(&[("INTERLEAVE", interleave)]);
        let mut fractions = Vec::new();
        let mut progress = |complete: f64, _: &str| {
            fractions.push(complete);
            true
        };
        copy_whole_raster(&src, &mut dst, &options, Some(&mut progress)).unwrap();

        assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{interleave}");
        assert_eq!(fractions.first(), Some(&0.0));
        assert_eq!(fractions.last(), Some(&1.0));

        for band in 1..=2 {
            let expected = src.rasterband(band).unwrap().read_band_as::<u16>().unwrap();
            let actual = dst.rasterband(band).unwrap().read_band_as::<u16>().unwrap();
            assert_eq!(expected, actual, "{interleave} band {band}");
        }
    }
}

#[test]
fn test_copy_whole_raster_compressed() {
    let src = ramp(1);
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let mut dst = driver.create("", 10, 5, 1).unwrap();
    let options = NameValueList::from(&[("COMPRESSED", "YES"), ("SKIP_HOLES", "YES")]);

    let mut reports = 0;
    let mut progress = |_: f64, _: &str| {
        reports += 1;
        true
    };
    copy_whole_raster(&src, &mut dst, &options, Some(&mut progress)).unwrap();
    // start, then one swath for the whole band
    assert_eq!(reports, 2);
    assert_eq!(
        dst.rasterband(1).unwrap().read_band_as::<u8>().unwrap().data,
        (0..50).collect::<Vec<u8>>()
    );
}

#[test]
fn test_copy_whole_raster_saturates() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let src = driver
        .create_with_band_type::<f32, _>("", 2, 1, 1)
        .unwrap();
    src.rasterband(1)
        .unwrap()
        .write((0, 0), &Buffer::new((2, 1), vec![-5.0f32, 300.7]))
        .unwrap();
    let mut dst = driver.create("", 2, 1, 1).unwrap();

    copy_whole_raster(&src, &mut dst, &NameValueList::new(), None).unwrap();
    let values = dst.rasterband(1).unwrap().read_band_as::<u8>().unwrap();
    assert_eq!(values.data, vec!(0, 255));
}

#[test]
fn test_copy_whole_raster_shape_mismatch() {
    let src = ramp(2);
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();

    let mut narrower = driver.create("", 9, 5, 2).unwrap();
    let result = copy_whole_raster(&src, &mut narrower, &NameValueList::new(), None);
    assert!(matches!(
        result,
        Err(GeoDataError::ShapeMismatch {
            src: (10, 5, 2),
            dst: (9, 5, 2)
        })
    ));

    let mut fewer_bands = driver.create("", 10, 5, 1).unwrap();
    let result = copy_whole_raster(&src, &mut fewer_bands, &NameValueList::new(), None);
    assert!(matches!(result, Err(GeoDataError::ShapeMismatch { .. })));
}

#[test]
fn test_copy_whole_raster_bad_interleave() {
    let src = ramp(1);
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let mut dst = driver.create("", 10, 5, 1).unwrap();
    let options = NameValueList::from(&[("INTERLEAVE", "LINE")]);
    let result = copy_whole_raster(&src, &mut dst, &options, None);
    assert!(matches!(result, Err(GeoDataError::BadArgument(_))));
}

#[test]
fn test_copy_whole_raster_cancelled() {
    let src = ramp(1);
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let mut dst = driver.create("", 10, 5, 1).unwrap();

    let mut progress = |complete: f64, _: &str| complete < 0.5;
    let result = copy_whole_raster(&src, &mut dst, &NameValueList::new(), Some(&mut progress));
    assert!(matches!(result, Err(GeoDataError::Cancelled)));

    // the last rows were never copied
    let last = dst.rasterband(1).unwrap().read_as::<u8>((0, 4), (10, 1)).unwrap();
    assert!(last.data.iter().all(|v| *v == 0));
}

#[test]
fn test_create_copy() {
    let mut src = ramp(2);
    src.set_geo_transform(&[10.0, 2.0, 0.0, 20.0, 0.0, -2.0])
        .unwrap();
    src.set_projection(WGS84_WKT).unwrap();
    src.rasterband(2)
        .unwrap()
        .set_no_data_value(Some(149.0))
        .unwrap();

    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let copy = driver
        .create_copy("", &src, true, &RasterCreationOptions::default(), None)
        .unwrap();

    assert_eq!(copy.raster_size().unwrap(), (10, 5));
    assert_eq!(copy.raster_count().unwrap(), 2);
    assert_eq!(copy.geo_transform().unwrap(), src.geo_transform().unwrap());
    assert_eq!(copy.projection().unwrap(), WGS84_WKT);
    assert_eq!(
        copy.rasterband(2).unwrap().no_data_value().unwrap(),
        Some(149.0)
    );
    assert_eq!(
        copy.rasterband(2).unwrap().read_as::<u8>((9, 4), (1, 1)).unwrap().data,
        vec!(149)
    );
}

#[test]
fn test_create_copy_drops_unsupported_attributes() {
    let mut src = ramp(1);
    src.set_projection(WGS84_WKT).unwrap();
    let driver = Driver::new(MockDriver::new("MockCopy", b"MOCKCOPY"));

    let strict = driver.create_copy("", &src, true, &RasterCreationOptions::default(), None);
    assert!(matches!(strict, Err(GeoDataError::StrictCopy(_))));

    let copy = src
        .create_copy(&driver, "", &RasterCreationOptions::default())
        .unwrap();
    assert_eq!(copy.projection().unwrap(), "");
    assert_eq!(
        copy.rasterband(1).unwrap().read_band_as::<u8>().unwrap().data,
        (0..50).collect::<Vec<u8>>()
    );
}

#[test]
fn test_create_copy_mixed_band_types() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let mut src = driver.create_with_band_type::<u8, _>("", 2, 1, 1).unwrap();
    src.add_band(DataType::Float32, &RasterCreationOptions::default())
        .unwrap();
    src.rasterband(2)
        .unwrap()
        .write((0, 0), &Buffer::new((2, 1), vec![1.5f32, 1000.25]))
        .unwrap();

    let copy = driver
        .create_copy("", &src, true, &RasterCreationOptions::default(), None)
        .unwrap();
    assert_eq!(copy.rasterband(1).unwrap().band_type(), DataType::UInt8);
    let band = copy.rasterband(2).unwrap();
    assert_eq!(band.band_type(), DataType::Float32);
    assert_eq!(band.read_band_as::<f32>().unwrap().data, vec![1.5, 1000.25]);

    // no add_band: strict refuses, lenient keeps the first band's type
    let mock = Driver::new(MockDriver::new("MockMixed", b"MOCKMIXED"));
    let strict = mock.create_copy("", &src, true, &RasterCreationOptions::default(), None);
    assert!(matches!(strict, Err(GeoDataError::StrictCopy(_))));

    let copy = src
        .create_copy(&mock, "", &RasterCreationOptions::default())
        .unwrap();
    assert_eq!(copy.raster_count().unwrap(), 2);
    assert_eq!(copy.rasterband(2).unwrap().band_type(), DataType::UInt8);
    assert_eq!(
        copy.rasterband(2).unwrap().read_band_as::<u8>().unwrap().data,
        vec![1, 255]
    );
}

#[test]
fn test_create_copy_read_only_driver() {
    let src = ramp(1);
    let driver = Driver::new(MockDriver::new("MockRO", b"MOCKRO").read_only());
    let result = src.create_copy(&driver, "", &RasterCreationOptions::default());
    assert!(matches!(
        result,
        Err(GeoDataError::UnsupportedOperation { .. })
    ));
}

#[test]
fn test_create_copy_to_aaigrid() {
    let fixture = InMemoryFixture::new("raster-tests/ramp.asc");
    let prj = InMemoryFixture::new("raster-tests/ramp.prj");

    let mut src = ramp(1);
    src.set_geo_transform(&[100.0, 5.0, 0.0, 50.0, 0.0, -5.0])
        .unwrap();
    src.set_projection(WGS84_WKT).unwrap();
    src.rasterband(1)
        .unwrap()
        .set_no_data_value(Some(0.0))
        .unwrap();

    let driver = DriverManager::get_driver_by_name("AAIGrid").unwrap();
    let mut fractions = Vec::new();
    let mut progress = |complete: f64, _: &str| {
        fractions.push(complete);
        true
    };
    let copy = driver
        .create_copy(
            fixture.path(),
            &src,
            true,
            &RasterCreationOptions::default(),
            Some(&mut progress),
        )
        .unwrap();
    // one report per row, then one once the files are written
    assert_eq!(fractions.len(), 6);
    assert_eq!(fractions[4], 0.9);
    assert_eq!(fractions.last(), Some(&1.0));
    assert_eq!(copy.driver().short_name(), "AAIGrid");
    drop(copy);

    let dataset = Dataset::open(fixture.path()).unwrap();
    assert_eq!(dataset.driver().short_name(), "AAIGrid");
    assert_eq!(dataset.raster_size().unwrap(), (10, 5));
    assert_eq!(
        dataset.geo_transform().unwrap(),
        [100.0, 5.0, 0.0, 50.0, 0.0, -5.0]
    );
    assert_eq!(dataset.geo_transform().unwrap().apply(10.0, 5.0), (150.0, 25.0));
    assert_eq!(dataset.spatial_ref().unwrap().name().as_deref(), Some("WGS 84"));
    assert_eq!(
        dataset.file_list().unwrap(),
        vec![
            fixture.path().to_string_lossy().into_owned(),
            prj.path().to_string_lossy().into_owned()
        ]
    );

    let band = dataset.rasterband(1).unwrap();
    assert_eq!(band.band_type(), DataType::Int32);
    assert_eq!(band.no_data_value().unwrap(), Some(0.0));
    assert_eq!(
        band.read_band_as::<u8>().unwrap(),
        src.rasterband(1).unwrap().read_band_as::<u8>().unwrap()
    );
}

#[test]
fn test_create_copy_to_aaigrid_lossy() {
    let fixture = InMemoryFixture::new("raster-tests/rotated.asc");
    let mut src = ramp(2);
    src.set_geo_transform(&[100.0, 5.0, 0.5, 50.0, 0.0, -5.0])
        .unwrap();
    let driver = DriverManager::get_driver_by_name("AAIGrid").unwrap();

    let strict = driver.create_copy(
        fixture.path(),
        &src,
        true,
        &RasterCreationOptions::default(),
        None,
    );
    assert!(matches!(strict, Err(GeoDataError::StrictCopy(_))));

    let copy = src
        .create_copy(&driver, fixture.path(), &RasterCreationOptions::default())
        .unwrap();
    assert_eq!(copy.raster_count().unwrap(), 1);
    assert_eq!(copy.raster_size().unwrap(), (10, 5));
}

#[test]
fn test_create_copy_without_bands() {
    let driver = DriverManager::get_driver_by_name("MEM").unwrap();
    let src = driver.create_vector_only("").unwrap();
    let aaigrid = DriverManager::get_driver_by_name("AAIGrid").unwrap();
    let result = src.create_copy(
        &aaigrid,
        "/vsimem/raster-tests/empty.asc",
        &RasterCreationOptions::default(),
    );
    assert!(matches!(
        result,
        Err(GeoDataError::UnsupportedOperation { .. })
    ));
}
