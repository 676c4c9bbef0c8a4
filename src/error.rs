use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Source raster has invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error("Source raster has no bands")]
    NoBands,

    #[error("Invalid patch size: {0} (must be positive)")]
    InvalidPatchSize(usize),

    #[error("Invalid grid size: {0} (must be positive)")]
    InvalidGridSize(usize),

    #[error("Unsupported pixel data type: {0}")]
    UnsupportedDataType(String),

    #[error("Tile {path}: expected {expected_bands}x{expected_height}x{expected_width}, got {actual_bands}x{actual_height}x{actual_width}")]
    TileShapeMismatch {
        path: String,
        expected_bands: usize,
        expected_height: usize,
        expected_width: usize,
        actual_bands: usize,
        actual_height: usize,
        actual_width: usize,
    },
}

pub type Result<T> = std::result::Result<T, PatchError>;
