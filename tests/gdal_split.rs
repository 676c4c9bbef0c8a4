use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, ColorInterpretation, GdalDataType};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use geotiff_patch_split::gdal_io::GdalSource;
use geotiff_patch_split::profile::Compression;
use geotiff_patch_split::{split_to_patches, PatchError, RasterSource, RunConfig, SizingPolicy};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const SOURCE_GT: [f64; 6] = [500000.0, 10.0, 0.0, 4200000.0, 0.0, -10.0];

/// UInt16 GeoTIFF with nodata=0 whose band values come from `fill(band, row, col)`.
fn write_source<F>(path: &Path, width: usize, height: usize, bands: usize, options: &[&str], fill: F)
where
    F: Fn(usize, usize, usize) -> u16,
{
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut gdal_options = CslStringList::new();
    for opt in options {
        gdal_options.add_string(opt).unwrap();
    }
    let mut dataset = driver
        .create_with_band_type_with_options::<u16, _>(path, width, height, bands, &gdal_options)
        .unwrap();
    dataset.set_geo_transform(&SOURCE_GT).unwrap();
    dataset
        .set_spatial_ref(&SpatialRef::from_epsg(32633).unwrap())
        .unwrap();

    for band_index in 1..=bands {
        let mut band = dataset.rasterband(band_index).unwrap();
        band.set_no_data_value(Some(0.0)).unwrap();

        let mut values = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                values.push(fill(band_index, row, col));
            }
        }
        let mut buffer = Buffer::new((width, height), values);
        band.write((0, 0), (width, height), &mut buffer).unwrap();
    }
}

fn config(src: &Path, out_dir: &Path, sizing: SizingPolicy) -> RunConfig {
    RunConfig {
        src: src.to_path_buf(),
        out_dir: out_dir.to_path_buf(),
        sizing,
        log_every: 0,
    }
}

/// 8-bit RGB PNG; the PNG driver only supports CreateCopy, so it is built in MEM first.
fn write_png_source(path: &Path, width: usize, height: usize) {
    let mem = DriverManager::get_driver_by_name("MEM").unwrap();
    let dataset = mem
        .create_with_band_type::<u8, _>("", width, height, 3)
        .unwrap();
    for band_index in 1..=3 {
        let mut band = dataset.rasterband(band_index).unwrap();
        let values = vec![(band_index * 40) as u8; width * height];
        let mut buffer = Buffer::new((width, height), values);
        band.write((0, 0), (width, height), &mut buffer).unwrap();
    }

    let png = DriverManager::get_driver_by_name("PNG").unwrap();
    dataset.create_copy(&png, path, &CslStringList::new()).unwrap();
}

/// Tile names in the output folder, ignoring mask/aux sidecars.
fn tile_names(out_dir: &Path) -> Vec<String> {
    tile_names_with_extension(out_dir, "tif")
}

fn tile_names_with_extension(out_dir: &Path, extension: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(out_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == extension))
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_all_valid_source_is_fully_tiled() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("scene.tif");
    let out_dir = dir.path().join("patches");
    write_source(&src, 100, 100, 1, &[], |_, _, _| 1);

    let summary = split_to_patches(&config(&src, &out_dir, SizingPolicy::PatchSize(32))).unwrap();

    assert_eq!(summary.total_cells, 16);
    assert_eq!(summary.counters.written, 16);
    assert_eq!(summary.counters.discarded, 0);
    assert_eq!(tile_names(&out_dir).len(), 16);

    let corner = Dataset::open(out_dir.join("3_3.tif")).unwrap();
    assert_eq!(corner.raster_size(), (4, 4));
    assert_eq!(
        corner.geo_transform().unwrap(),
        [500960.0, 10.0, 0.0, 4199040.0, 0.0, -10.0]
    );
    assert!(!corner.projection().is_empty());
}

#[test]
fn test_all_nodata_source_writes_nothing() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("empty.tif");
    let out_dir = dir.path().join("patches");
    write_source(&src, 100, 100, 1, &[], |_, _, _| 0);

    let summary = split_to_patches(&config(&src, &out_dir, SizingPolicy::PatchSize(32))).unwrap();

    assert_eq!(summary.counters.written, 0);
    assert_eq!(summary.counters.discarded, 16);
    assert!(tile_names(&out_dir).is_empty());
}

#[test]
fn test_partial_tile_keeps_data_type_and_mask() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("half.tif");
    let out_dir = dir.path().join("patches");
    // Left 50 columns are NoData
    write_source(&src, 100, 100, 2, &[], |band, row, col| {
        if col < 50 {
            0
        } else {
            (band * 1000 + row + col) as u16
        }
    });

    let summary = split_to_patches(&config(&src, &out_dir, SizingPolicy::PatchSize(32))).unwrap();
    assert_eq!(summary.counters.written, 12);
    assert_eq!(summary.counters.discarded, 4);
    assert!(!out_dir.join("0_0.tif").exists());

    let tile = Dataset::open(out_dir.join("1_0.tif")).unwrap();
    assert_eq!(tile.raster_count() as usize, 2);

    let band = tile.rasterband(2).unwrap();
    assert_eq!(band.band_type(), GdalDataType::UInt16);
    let values = band.read_as::<u16>((31, 0), (1, 1), (1, 1), None).unwrap();
    assert_eq!(values.data()[0], 2000 + 63);

    let mask = band.open_mask_band().unwrap();
    let mask_values = mask.read_as::<u8>((0, 0), (32, 1), (32, 1), None).unwrap();
    assert_eq!(mask_values.data()[0], 0);
    assert_eq!(mask_values.data()[17], 0);
    assert_ne!(mask_values.data()[18], 0);
    assert_ne!(mask_values.data()[31], 0);
}

#[test]
fn test_grid_count_on_small_raster() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("small.tif");
    let out_dir = dir.path().join("cells");
    write_source(&src, 10, 10, 1, &[], |_, row, col| (row * 10 + col + 1) as u16);

    let summary = split_to_patches(&config(&src, &out_dir, SizingPolicy::GridSize(32))).unwrap();

    assert_eq!(summary.total_cells, 1024);
    assert_eq!(summary.counters.written, 100);
    assert_eq!(summary.counters.discarded, 924);

    let names = tile_names(&out_dir);
    assert_eq!(names.len(), 100);
    assert!(names.contains(&"9_9.tif".to_string()));
    assert!(!names.contains(&"10_0.tif".to_string()));
}

#[test]
fn test_tiled_source_profile_and_sanitized_output() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("tiled.tif");
    let out_dir = dir.path().join("patches");
    write_source(
        &src,
        64,
        64,
        1,
        &["TILED=YES", "BLOCKXSIZE=16", "BLOCKYSIZE=16", "COMPRESS=DEFLATE"],
        |_, _, _| 9,
    );

    {
        let source = GdalSource::open(&src).unwrap();
        let profile = source.profile();
        assert_eq!((profile.width, profile.height), (64, 64));
        assert!(profile.tiled);
        assert_eq!(profile.block_size, Some((16, 16)));
        assert_eq!(profile.compression, Compression::Deflate);
        assert_eq!(profile.nodata, Some(0.0));
        assert_eq!(profile.bigtiff, None);
    }

    split_to_patches(&config(&src, &out_dir, SizingPolicy::PatchSize(32))).unwrap();

    let tile = Dataset::open(out_dir.join("1_1.tif")).unwrap();
    let band = tile.rasterband(1).unwrap();
    // Striped layout: one block spans the full tile width
    assert_eq!(band.block_size().0, 32);
    assert_eq!(band.no_data_value(), Some(0.0));
}

#[test]
fn test_rerun_overwrites_with_same_result() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("scene.tif");
    let out_dir = dir.path().join("patches");
    write_source(&src, 50, 40, 1, &[], |_, row, _| if row < 16 { 0 } else { 5 });

    let cfg = config(&src, &out_dir, SizingPolicy::PatchSize(16));
    let first = split_to_patches(&cfg).unwrap();
    let first_names = tile_names(&out_dir);
    let second = split_to_patches(&cfg).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_names, tile_names(&out_dir));
    assert_eq!(first.counters.discarded, 4);
}

#[test]
fn test_missing_source_fails() {
    let dir = tempdir().unwrap();
    let src: PathBuf = dir.path().join("does_not_exist.tif");
    let result = split_to_patches(&config(&src, &dir.path().join("out"), SizingPolicy::PatchSize(32)));

    assert!(matches!(result, Err(PatchError::Gdal(_))));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_zero_size_rejected_before_opening() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("does_not_exist.tif");
    let out_dir = dir.path().join("out");

    let result = split_to_patches(&config(&src, &out_dir, SizingPolicy::PatchSize(0)));
    assert!(matches!(result, Err(PatchError::InvalidPatchSize(0))));

    let result = split_to_patches(&config(&src, &out_dir, SizingPolicy::GridSize(0)));
    assert!(matches!(result, Err(PatchError::InvalidGridSize(0))));
    assert!(!out_dir.exists());
}

#[test]
fn test_rgb_source_keeps_colorimetry() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("rgb.tif");
    let out_dir = dir.path().join("patches");
    write_source(&src, 64, 64, 3, &["PHOTOMETRIC=RGB"], |band, _, _| (band * 100) as u16);

    {
        let source = GdalSource::open(&src).unwrap();
        assert_eq!(source.profile().photometric.as_deref(), Some("RGB"));
        assert_eq!(source.profile().band_colors[0], ColorInterpretation::RedBand);
    }

    split_to_patches(&config(&src, &out_dir, SizingPolicy::PatchSize(32))).unwrap();

    let tile = Dataset::open(out_dir.join("0_0.tif")).unwrap();
    let colors: Vec<_> = (1..=3)
        .map(|i| tile.rasterband(i).unwrap().color_interpretation())
        .collect();
    assert_eq!(
        colors,
        vec![
            ColorInterpretation::RedBand,
            ColorInterpretation::GreenBand,
            ColorInterpretation::BlueBand,
        ]
    );
}

#[test]
fn test_png_source_is_staged_through_memory() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("scene.png");
    let out_dir = dir.path().join("patches");
    write_png_source(&src, 64, 64);

    let summary = split_to_patches(&config(&src, &out_dir, SizingPolicy::PatchSize(32))).unwrap();
    assert_eq!(summary.counters.written, 4);

    let names = tile_names_with_extension(&out_dir, "png");
    assert_eq!(names, vec!["0_0.png", "0_1.png", "1_0.png", "1_1.png"]);

    let tile = Dataset::open(out_dir.join("1_1.png")).unwrap();
    assert_eq!(tile.driver().short_name(), "PNG");
    assert_eq!(tile.raster_size(), (32, 32));
    let values = tile
        .rasterband(2)
        .unwrap()
        .read_as::<u8>((0, 0), (1, 1), (1, 1), None)
        .unwrap();
    assert_eq!(values.data()[0], 80);
}

#[test]
fn test_vrt_source_is_written_as_gtiff() {
    let dir = tempdir().unwrap();
    let backing = dir.path().join("backing.tif");
    let src = dir.path().join("mosaic.vrt");
    let out_dir = dir.path().join("patches");
    write_source(&backing, 40, 40, 1, &[], |_, _, _| 3);

    {
        let vrt = DriverManager::get_driver_by_name("VRT").unwrap();
        Dataset::open(&backing)
            .unwrap()
            .create_copy(&vrt, &src, &CslStringList::new())
            .unwrap();
    }

    let summary = split_to_patches(&config(&src, &out_dir, SizingPolicy::PatchSize(20))).unwrap();
    assert_eq!(summary.counters.written, 4);
    assert!(tile_names_with_extension(&out_dir, "vrt").is_empty());

    let tile = Dataset::open(out_dir.join("1_0.tif")).unwrap();
    assert_eq!(tile.driver().short_name(), "GTiff");
    assert_eq!(
        tile.geo_transform().unwrap(),
        [500200.0, 10.0, 0.0, 4200000.0, 0.0, -10.0]
    );
}
