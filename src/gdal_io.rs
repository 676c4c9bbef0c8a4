use crate::error::{PatchError, Result};
use crate::grid::PixelWindow;
use crate::io::{RasterSource, TileWriter, ValidityMask};
use crate::profile::{BigTiff, Compression, PixelType, WriterProfile};
use crate::transform::GeoTransform;
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, ColorInterpretation, GdalDataType, GdalType};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, Driver, DriverManager, Metadata};
use log::{debug, warn};
use ndarray::{Array2, Array3, Axis};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Source raster opened once for the whole run; the dataset closes on drop.
pub struct GdalSource {
    dataset: Dataset,
    profile: WriterProfile,
}

impl GdalSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening source raster: {}", path.display());

        let dataset = Dataset::open(path)?;
        let profile = inspect_profile(&dataset, path)?;

        debug!("Source profile: {:?}", profile);
        Ok(Self { dataset, profile })
    }
}

impl RasterSource for GdalSource {
    fn profile(&self) -> &WriterProfile {
        &self.profile
    }

    fn read_mask(&self, window: &PixelWindow) -> Result<ValidityMask> {
        let offset = (window.col_off as isize, window.row_off as isize);
        let size = (window.width, window.height);

        // GDAL derives each band's mask from nodata, alpha or an internal mask
        let mut band_masks = Vec::with_capacity(self.profile.band_count);
        for band_index in 1..=self.profile.band_count {
            let band = self.dataset.rasterband(band_index)?;
            let mask_band = band.open_mask_band()?;
            let buffer = mask_band.read_as::<u8>(offset, size, size, None)?;

            let values: Vec<u8> = buffer.into_iter().collect();
            band_masks.push(Array2::from_shape_vec((window.height, window.width), values)?);
        }

        Ok(ValidityMask::from_band_masks(
            window.height,
            window.width,
            band_masks,
        ))
    }

    fn read_window(&self, window: &PixelWindow) -> Result<Array3<f64>> {
        let bands = self.profile.band_count;
        let offset = (window.col_off as isize, window.row_off as isize);
        let size = (window.width, window.height);

        debug!(
            "Reading window: offset=({},{}), size=({},{}), bands={}",
            window.col_off, window.row_off, window.width, window.height, bands
        );

        let mut values = Vec::with_capacity(bands * window.pixel_count());
        for band_index in 1..=bands {
            let band = self.dataset.rasterband(band_index)?;
            let buffer = band.read_as::<f64>(offset, size, size, None)?;
            values.extend(buffer.into_iter());
        }

        Ok(Array3::from_shape_vec(
            (bands, window.height, window.width),
            values,
        )?)
    }
}

fn inspect_profile(dataset: &Dataset, path: &Path) -> Result<WriterProfile> {
    let (width, height) = dataset.raster_size();
    if width == 0 || height == 0 {
        return Err(PatchError::InvalidDimensions(width, height));
    }

    let band_count = dataset.raster_count() as usize;
    if band_count == 0 {
        return Err(PatchError::NoBands);
    }

    let band = dataset.rasterband(1)?;
    let dtype = pixel_type(band.band_type())?;
    let nodata = band.no_data_value();
    let (block_x, block_y) = band.block_size();

    let transform = match dataset.geo_transform() {
        Ok(gt) => GeoTransform::from_gdal(gt),
        Err(e) => {
            warn!("Source has no geotransform ({}), tiles will use pixel coordinates", e);
            GeoTransform::default()
        }
    };

    let projection = dataset.projection();
    let crs = if projection.trim().is_empty() {
        None
    } else {
        Some(projection)
    };

    let compression_name = dataset.metadata_item("COMPRESSION", "IMAGE_STRUCTURE");
    let compression = compression_name
        .as_deref()
        .map(Compression::from_gdal_name)
        .unwrap_or(Compression::None);
    let predictor = dataset
        .metadata_item("PREDICTOR", "IMAGE_STRUCTURE")
        .and_then(|p| p.trim().parse().ok());
    let interleave = dataset.metadata_item("INTERLEAVE", "IMAGE_STRUCTURE");

    let mut band_colors = Vec::with_capacity(band_count);
    for band_index in 1..=band_count {
        band_colors.push(dataset.rasterband(band_index)?.color_interpretation());
    }
    let photometric = photometric(
        dataset
            .metadata_item("SOURCE_COLOR_SPACE", "IMAGE_STRUCTURE")
            .as_deref(),
        compression_name.as_deref(),
        &band_colors,
    );

    let tiled = is_tiled((block_x, block_y), (width, height));
    let block_size = tiled.then_some((block_x, block_y));

    let driver = dataset.driver().short_name();
    let bigtiff = if driver == "GTiff" || driver == "COG" {
        probe_bigtiff(path)
    } else {
        None
    };

    Ok(WriterProfile {
        driver,
        dtype,
        band_count,
        width,
        height,
        transform,
        crs,
        nodata,
        compression,
        predictor,
        interleave,
        photometric,
        band_colors,
        tiled,
        block_size,
        bigtiff,
    })
}

fn pixel_type(data_type: GdalDataType) -> Result<PixelType> {
    match data_type {
        GdalDataType::UInt8 => Ok(PixelType::UInt8),
        GdalDataType::UInt16 => Ok(PixelType::UInt16),
        GdalDataType::Int16 => Ok(PixelType::Int16),
        GdalDataType::UInt32 => Ok(PixelType::UInt32),
        GdalDataType::Int32 => Ok(PixelType::Int32),
        GdalDataType::Float32 => Ok(PixelType::Float32),
        GdalDataType::Float64 => Ok(PixelType::Float64),
        other => Err(PatchError::UnsupportedDataType(format!("{:?}", other))),
    }
}

/// Strips span the full raster width. TIFF tiles are multiples of 16 on both
/// sides, so a square full-width block shorter than the raster is a tile.
fn is_tiled(block: (usize, usize), size: (usize, usize)) -> bool {
    let (block_x, block_y) = block;
    let (width, height) = size;
    if block_x != width {
        return true;
    }
    block_x == block_y && block_y < height && block_x % 16 == 0
}

/// `PHOTOMETRIC` creation value that reproduces the source colour space.
fn photometric(
    source_color_space: Option<&str>,
    compression: Option<&str>,
    band_colors: &[ColorInterpretation],
) -> Option<String> {
    if let Some(space) = source_color_space.filter(|s| !s.trim().is_empty()) {
        return Some(space.trim().to_ascii_uppercase());
    }
    if compression.is_some_and(|c| c.eq_ignore_ascii_case("YCbCr JPEG")) {
        return Some("YCBCR".to_string());
    }

    let rgb = [
        ColorInterpretation::RedBand,
        ColorInterpretation::GreenBand,
        ColorInterpretation::BlueBand,
    ];
    band_colors.starts_with(&rgb).then(|| "RGB".to_string())
}

/// `EPSG:32633` style label for a WKT projection, or its name when it has no
/// authority code.
pub fn crs_label(wkt: Option<&str>) -> String {
    let Some(wkt) = wkt else {
        return "None".to_string();
    };

    let srs = match SpatialRef::from_wkt(wkt) {
        Ok(srs) => srs,
        Err(e) => {
            warn!("Could not parse source projection: {}", e);
            return wkt.to_string();
        }
    };

    match (srs.auth_name(), srs.auth_code()) {
        (Ok(name), Ok(code)) => format!("{}:{}", name, code),
        _ => srs.name().unwrap_or_else(|_| wkt.to_string()),
    }
}

/// Reads the TIFF header; version 43 marks a BigTIFF file.
fn probe_bigtiff(path: &Path) -> Option<BigTiff> {
    let mut header = [0u8; 4];
    let read = File::open(path).and_then(|mut f| f.read_exact(&mut header));
    if let Err(e) = read {
        debug!("Could not probe TIFF header of {}: {}", path.display(), e);
        return None;
    }

    let version = match &header[..2] {
        b"II" => u16::from_le_bytes([header[2], header[3]]),
        b"MM" => u16::from_be_bytes([header[2], header[3]]),
        _ => return None,
    };

    (version == 43).then_some(BigTiff::Yes)
}

/// Writes tiles through the GDAL driver named in the tile profile.
#[derive(Debug, Default)]
pub struct GdalTileWriter;

impl TileWriter for GdalTileWriter {
    fn write_tile(
        &mut self,
        path: &Path,
        profile: &WriterProfile,
        data: &Array3<f64>,
        mask: &ValidityMask,
    ) -> Result<()> {
        check_tile_shape(path, profile, data, mask)?;

        let driver = DriverManager::get_driver_by_name(profile.output_driver())?;

        let mut options = CslStringList::new();
        for opt in profile.creation_options() {
            options.add_string(&opt)?;
        }

        if supports_create(&driver) {
            let mut dataset = create_typed(&driver, path, profile, &options)?;
            fill_tile(&mut dataset, profile, data, mask)?;
            dataset.flush_cache()?;
        } else {
            // Build in memory, then let the target driver copy it out
            debug!("Driver {} has no Create, staging {} in memory", driver.short_name(), path.display());
            let mem = DriverManager::get_driver_by_name("MEM")?;
            let mut staged = create_typed(&mem, Path::new(""), profile, &CslStringList::new())?;
            fill_tile(&mut staged, profile, data, mask)?;

            let mut copied = staged.create_copy(&driver, path, &options)?;
            copied.flush_cache()?;
        }

        debug!(
            "Wrote {} ({}x{}, {} bands, {} valid px)",
            path.display(),
            profile.width,
            profile.height,
            profile.band_count,
            mask.valid_count()
        );
        Ok(())
    }
}

fn supports_create(driver: &Driver) -> bool {
    driver
        .metadata_item("DCAP_CREATE", "")
        .is_some_and(|cap| cap.eq_ignore_ascii_case("YES"))
}

fn create_typed(
    driver: &Driver,
    path: &Path,
    profile: &WriterProfile,
    options: &CslStringList,
) -> Result<Dataset> {
    match profile.dtype {
        PixelType::UInt8 => create_dataset::<u8>(driver, path, profile, options),
        PixelType::UInt16 => create_dataset::<u16>(driver, path, profile, options),
        PixelType::Int16 => create_dataset::<i16>(driver, path, profile, options),
        PixelType::UInt32 => create_dataset::<u32>(driver, path, profile, options),
        PixelType::Int32 => create_dataset::<i32>(driver, path, profile, options),
        PixelType::Float32 => create_dataset::<f32>(driver, path, profile, options),
        PixelType::Float64 => create_dataset::<f64>(driver, path, profile, options),
    }
}

/// Georeferencing, band values, colour interpretation and the shared mask.
fn fill_tile(
    dataset: &mut Dataset,
    profile: &WriterProfile,
    data: &Array3<f64>,
    mask: &ValidityMask,
) -> Result<()> {
    dataset.set_geo_transform(&profile.transform.to_gdal())?;
    if let Some(wkt) = &profile.crs {
        dataset.set_projection(wkt)?;
    }

    let size = (profile.width, profile.height);
    for (i, band_data) in data.axis_iter(Axis(0)).enumerate() {
        let mut raster_band = dataset.rasterband(i + 1)?;
        if let Some(nodata) = profile.nodata {
            raster_band.set_no_data_value(Some(nodata))?;
        }
        if let Some(color) = profile.band_colors.get(i) {
            raster_band.set_color_interpretation(crate::profile::copy_color(color))?;
        }

        // GDAL converts from f64 to the band type on write
        let mut buffer = Buffer::new(size, band_data.iter().copied().collect());
        raster_band.write((0, 0), size, &mut buffer)?;
    }

    // One mask shared by all bands, like the combined mask it came from
    let mut first_band = dataset.rasterband(1)?;
    first_band.create_mask_band(true)?;
    let mut mask_band = first_band.open_mask_band()?;
    let mut mask_buffer = Buffer::new(size, mask.values().iter().copied().collect());
    mask_band.write((0, 0), size, &mut mask_buffer)?;

    Ok(())
}

fn create_dataset<T: GdalType>(
    driver: &Driver,
    path: &Path,
    profile: &WriterProfile,
    options: &CslStringList,
) -> Result<Dataset> {
    let dataset = driver.create_with_band_type_with_options::<T, _>(
        path,
        profile.width,
        profile.height,
        profile.band_count,
        options,
    )?;
    Ok(dataset)
}

fn check_tile_shape(
    path: &Path,
    profile: &WriterProfile,
    data: &Array3<f64>,
    mask: &ValidityMask,
) -> Result<()> {
    let (bands, rows, cols) = data.dim();
    let (mask_rows, mask_cols) = mask.dim();

    let data_ok = bands == profile.band_count && rows == profile.height && cols == profile.width;
    let mask_ok = mask_rows == profile.height && mask_cols == profile.width;
    if data_ok && mask_ok {
        return Ok(());
    }

    let (actual_height, actual_width) = if data_ok {
        (mask_rows, mask_cols)
    } else {
        (rows, cols)
    };

    Err(PatchError::TileShapeMismatch {
        path: path.display().to_string(),
        expected_bands: profile.band_count,
        expected_height: profile.height,
        expected_width: profile.width,
        actual_bands: bands,
        actual_height,
        actual_width,
    })
}
