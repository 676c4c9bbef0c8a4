use crate::error::Result;
use crate::grid::PixelWindow;
use crate::profile::WriterProfile;
use ndarray::{Array2, Array3};
use std::path::Path;

/// Per-pixel validity for one window, combined over all bands.
///
/// 0 marks an invalid (NoData) pixel, anything else a valid one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityMask {
    values: Array2<u8>,
}

impl ValidityMask {
    pub const VALID: u8 = 255;

    pub fn new(values: Array2<u8>) -> Self {
        Self { values }
    }

    pub fn all_valid(height: usize, width: usize) -> Self {
        Self::new(Array2::from_elem((height, width), Self::VALID))
    }

    /// Combine per-band masks: a pixel stays valid only if it is valid in every band.
    pub fn from_band_masks<I>(height: usize, width: usize, band_masks: I) -> Self
    where
        I: IntoIterator<Item = Array2<u8>>,
    {
        let mut combined = Self::all_valid(height, width);
        for band_mask in band_masks {
            combined.intersect(&band_mask);
        }
        combined
    }

    pub fn intersect(&mut self, band_mask: &Array2<u8>) {
        self.values.zip_mut_with(band_mask, |combined, &band| {
            if band == 0 {
                *combined = 0;
            }
        });
    }

    /// True when no pixel in the window is valid.
    pub fn is_fully_invalid(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|&&v| v != 0).count()
    }

    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn values(&self) -> &Array2<u8> {
        &self.values
    }
}

/// Read-only access to the source raster.
pub trait RasterSource {
    /// Profile describing the full source raster
    fn profile(&self) -> &WriterProfile;

    /// Combined validity mask for `window`.
    fn read_mask(&self, window: &PixelWindow) -> Result<ValidityMask>;

    /// Pixel data for `window`, shaped (bands, rows, cols).
    fn read_window(&self, window: &PixelWindow) -> Result<Array3<f64>>;
}

/// Creates one output raster per call.
pub trait TileWriter {
    /// Write `data` and `mask` as a new raster at `path`, replacing any existing file.
    fn write_tile(
        &mut self,
        path: &Path,
        profile: &WriterProfile,
        data: &Array3<f64>,
        mask: &ValidityMask,
    ) -> Result<()>;
}
