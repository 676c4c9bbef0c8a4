use crate::grid::PixelWindow;
use crate::transform::GeoTransform;
use gdal::raster::ColorInterpretation;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    UInt8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl PixelType {
    pub fn name(&self) -> &'static str {
        match self {
            PixelType::UInt8 => "uint8",
            PixelType::UInt16 => "uint16",
            PixelType::Int16 => "int16",
            PixelType::UInt32 => "uint32",
            PixelType::Int32 => "int32",
            PixelType::Float32 => "float32",
            PixelType::Float64 => "float64",
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// GTiff `COMPRESS` values; anything unrecognised is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compression {
    None,
    Deflate,
    Lzw,
    Zstd,
    PackBits,
    Jpeg,
    Lzma,
    Webp,
    Lerc,
    Other(String),
}

impl Compression {
    pub fn from_gdal_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "" | "NONE" => Compression::None,
            "DEFLATE" | "ADOBE_DEFLATE" => Compression::Deflate,
            "LZW" => Compression::Lzw,
            "ZSTD" => Compression::Zstd,
            "PACKBITS" => Compression::PackBits,
            "JPEG" | "YCBCR JPEG" => Compression::Jpeg,
            "LZMA" => Compression::Lzma,
            "WEBP" => Compression::Webp,
            "LERC" => Compression::Lerc,
            other => Compression::Other(other.to_string()),
        }
    }

    pub fn as_gdal_name(&self) -> &str {
        match self {
            Compression::None => "NONE",
            Compression::Deflate => "DEFLATE",
            Compression::Lzw => "LZW",
            Compression::Zstd => "ZSTD",
            Compression::PackBits => "PACKBITS",
            Compression::Jpeg => "JPEG",
            Compression::Lzma => "LZMA",
            Compression::Webp => "WEBP",
            Compression::Lerc => "LERC",
            Compression::Other(name) => name.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BigTiff {
    Yes,
    No,
    IfNeeded,
    IfSafer,
}

impl BigTiff {
    pub fn as_gdal_name(&self) -> &'static str {
        match self {
            BigTiff::Yes => "YES",
            BigTiff::No => "NO",
            BigTiff::IfNeeded => "IF_NEEDED",
            BigTiff::IfSafer => "IF_SAFER",
        }
    }
}

/// Everything needed to create an output raster compatible with the source.
#[derive(Debug, PartialEq)]
pub struct WriterProfile {
    /// GDAL driver short name, e.g. "GTiff"
    pub driver: String,
    pub dtype: PixelType,
    pub band_count: usize,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    /// Projection as WKT
    pub crs: Option<String>,
    pub nodata: Option<f64>,
    pub compression: Compression,
    pub predictor: Option<u8>,
    /// "PIXEL" or "BAND"
    pub interleave: Option<String>,
    /// GTiff `PHOTOMETRIC` value, e.g. "RGB" or "YCBCR"
    pub photometric: Option<String>,
    /// Colour interpretation of each band, in band order
    pub band_colors: Vec<ColorInterpretation>,
    pub tiled: bool,
    pub block_size: Option<(usize, usize)>,
    pub bigtiff: Option<BigTiff>,
}

/// Copies a colour interpretation; gdal's enum implements neither `Clone` nor `Copy`.
pub(crate) fn copy_color(color: &ColorInterpretation) -> ColorInterpretation {
    ColorInterpretation::from_c_int(color.c_int()).expect("every variant round-trips through its C value")
}

// Field-for-field equivalent of `#[derive(Clone)]`.
impl Clone for WriterProfile {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            dtype: self.dtype.clone(),
            band_count: self.band_count,
            width: self.width,
            height: self.height,
            transform: self.transform.clone(),
            crs: self.crs.clone(),
            nodata: self.nodata,
            compression: self.compression.clone(),
            predictor: self.predictor,
            interleave: self.interleave.clone(),
            photometric: self.photometric.clone(),
            band_colors: self.band_colors.iter().map(copy_color).collect(),
            tiled: self.tiled,
            block_size: self.block_size,
            bigtiff: self.bigtiff.clone(),
        }
    }
}

impl WriterProfile {
    /// Base profile for rasters much smaller than one source block.
    ///
    /// Drops block sizes and the BIGTIFF flag and turns tiling off. All other
    /// fields pass through unchanged.
    pub fn sanitized_for_small_tiles(&self) -> Self {
        Self {
            tiled: false,
            block_size: None,
            bigtiff: None,
            ..self.clone()
        }
    }

    /// Profile for one tile: size and transform come from the window.
    pub fn for_window(&self, window: &PixelWindow) -> Self {
        Self {
            width: window.width,
            height: window.height,
            transform: self.transform.for_window(window.col_off, window.row_off),
            ..self.clone()
        }
    }

    /// Driver used to write tiles. COG tiles and VRT sources (which hold no
    /// pixels of their own) are written as plain GTiff.
    pub fn output_driver(&self) -> &str {
        if self.driver.eq_ignore_ascii_case("COG") || self.driver.eq_ignore_ascii_case("VRT") {
            "GTiff"
        } else {
            self.driver.as_str()
        }
    }

    /// True when tiles go out in a different format than the source.
    pub fn changes_format(&self) -> bool {
        !self.output_driver().eq_ignore_ascii_case(&self.driver)
    }

    /// GDAL creation options for this profile (GTiff only; other drivers get none).
    pub fn creation_options(&self) -> Vec<String> {
        if !self.output_driver().eq_ignore_ascii_case("GTiff") {
            return Vec::new();
        }

        let mut options = vec![format!("COMPRESS={}", self.compression.as_gdal_name())];

        if let Some(predictor) = self.predictor {
            options.push(format!("PREDICTOR={}", predictor));
        }
        if let Some(interleave) = &self.interleave {
            options.push(format!("INTERLEAVE={}", interleave));
        }
        if let Some(photometric) = &self.photometric {
            options.push(format!("PHOTOMETRIC={}", photometric));
        }

        options.push(format!("TILED={}", if self.tiled { "YES" } else { "NO" }));
        if let Some((block_x, block_y)) = self.block_size {
            options.push(format!("BLOCKXSIZE={}", block_x));
            options.push(format!("BLOCKYSIZE={}", block_y));
        }

        if let Some(bigtiff) = self.bigtiff {
            options.push(format!("BIGTIFF={}", bigtiff.as_gdal_name()));
        }

        options
    }
}
