use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "patch-split")]
#[command(about = "Split a GeoTIFF into small patches, skipping fully-NoData patches, preserving georeferencing")]
#[command(version)]
pub struct Args {
    /// Source GeoTIFF path
    #[arg(short, long, value_name = "FILE", env = "PATCH_SPLIT_SRC")]
    pub src: PathBuf,

    /// Patch size in pixels (default: 32)
    #[arg(short, long, value_name = "PX", conflicts_with = "grid_size")]
    pub patch_size: Option<usize>,

    /// Split into exactly N x N cells instead of fixed-size patches
    #[arg(short, long, value_name = "N")]
    pub grid_size: Option<usize>,

    /// Output directory (default: <src_dir>/patches)
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Log progress every N grid cells, 0 disables (default: 5000, or 100 with --grid-size)
    #[arg(short, long, value_name = "N")]
    pub log_every: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
