// Library exports for testing and reuse

pub mod cli;
pub mod config;
pub mod error;
pub mod gdal_io;
pub mod grid;
pub mod io;
pub mod profile;
pub mod tiler;
pub mod transform;

// Re-export commonly used types
pub use config::{RunConfig, SizingPolicy};
pub use error::{PatchError, Result};
pub use grid::{FixedGridCount, FixedPatchSize, GridCell, GridPlanner, PixelWindow};
pub use io::{RasterSource, TileWriter, ValidityMask};
pub use profile::WriterProfile;
pub use tiler::{split_to_patches, RunCounters, RunSummary, TileSplitter};
