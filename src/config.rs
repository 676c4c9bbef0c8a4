use crate::cli::Args;
use crate::error::{PatchError, Result};
use crate::grid::{FixedGridCount, FixedPatchSize, GridPlanner};
use std::path::{Path, PathBuf};

pub const DEFAULT_PATCH_SIZE: usize = 32;

/// How the grid over the source raster is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingPolicy {
    /// Square patches of this many pixels per side
    PatchSize(usize),
    /// This many cells per side, whatever the raster size
    GridSize(usize),
}

impl SizingPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            SizingPolicy::PatchSize(0) => Err(PatchError::InvalidPatchSize(0)),
            SizingPolicy::GridSize(0) => Err(PatchError::InvalidGridSize(0)),
            _ => Ok(()),
        }
    }

    /// Planner for this policy; zero sizes are rejected here so no planner
    /// ever divides by zero.
    pub fn planner(&self) -> Result<Box<dyn GridPlanner>> {
        self.validate()?;
        Ok(match *self {
            SizingPolicy::PatchSize(patch_size) => Box::new(FixedPatchSize { patch_size }),
            SizingPolicy::GridSize(grid_size) => Box::new(FixedGridCount { grid_size }),
        })
    }

    pub fn default_log_every(&self) -> usize {
        match self {
            SizingPolicy::PatchSize(_) => 5000,
            SizingPolicy::GridSize(_) => 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub src: PathBuf,
    pub out_dir: PathBuf,
    pub sizing: SizingPolicy,
    /// 0 disables periodic progress lines
    pub log_every: usize,
}

impl RunConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let sizing = match (args.patch_size, args.grid_size) {
            (_, Some(grid_size)) => SizingPolicy::GridSize(grid_size),
            (Some(patch_size), None) => SizingPolicy::PatchSize(patch_size),
            (None, None) => SizingPolicy::PatchSize(DEFAULT_PATCH_SIZE),
        };
        sizing.validate()?;

        let out_dir = args
            .out_dir
            .clone()
            .unwrap_or_else(|| default_out_dir(&args.src));

        Ok(Self {
            src: args.src.clone(),
            out_dir,
            sizing,
            log_every: args.log_every.unwrap_or_else(|| sizing.default_log_every()),
        })
    }

    /// Tiles keep the source's extension so they stay in the same format.
    pub fn tile_extension(&self) -> String {
        self.src
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or("tif")
            .to_string()
    }
}

/// `<src_dir>/patches`
pub fn default_out_dir(src: &Path) -> PathBuf {
    src.parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
        .join("patches")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["patch-split", "--src", "/data/scenes/scene.tif"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_args(&parse(&[])).unwrap();
        assert_eq!(config.sizing, SizingPolicy::PatchSize(32));
        assert_eq!(config.out_dir, PathBuf::from("/data/scenes/patches"));
        assert_eq!(config.log_every, 5000);
        assert_eq!(config.tile_extension(), "tif");
    }

    #[test]
    fn test_grid_size_defaults() {
        let config = RunConfig::from_args(&parse(&["--grid-size", "16"])).unwrap();
        assert_eq!(config.sizing, SizingPolicy::GridSize(16));
        assert_eq!(config.log_every, 100);
    }

    #[test]
    fn test_explicit_values() {
        let config = RunConfig::from_args(&parse(&[
            "--patch-size",
            "256",
            "--out-dir",
            "/tmp/tiles",
            "--log-every",
            "0",
        ]))
        .unwrap();
        assert_eq!(config.sizing, SizingPolicy::PatchSize(256));
        assert_eq!(config.out_dir, PathBuf::from("/tmp/tiles"));
        assert_eq!(config.log_every, 0);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(matches!(
            RunConfig::from_args(&parse(&["--patch-size", "0"])),
            Err(PatchError::InvalidPatchSize(0))
        ));
        assert!(matches!(
            RunConfig::from_args(&parse(&["--grid-size", "0"])),
            Err(PatchError::InvalidGridSize(0))
        ));
    }

    #[test]
    fn test_default_out_dir_for_bare_filename() {
        assert_eq!(default_out_dir(Path::new("scene.tif")), PathBuf::from("patches"));
    }

    #[test]
    fn test_tile_extension_follows_source() {
        let mut config = RunConfig::from_args(&parse(&[])).unwrap();
        config.src = PathBuf::from("/data/mosaic.TIFF");
        assert_eq!(config.tile_extension(), "TIFF");
        config.src = PathBuf::from("/data/mosaic");
        assert_eq!(config.tile_extension(), "tif");
    }

    #[test]
    fn test_policy_selects_planner() {
        let dims = SizingPolicy::GridSize(32).planner().unwrap().dimensions(10, 10);
        assert_eq!(dims.total_cells(), 1024);
        let dims = SizingPolicy::PatchSize(32).planner().unwrap().dimensions(100, 100);
        assert_eq!(dims.total_cells(), 16);
    }

    #[test]
    fn test_zero_policy_has_no_planner() {
        assert!(matches!(
            SizingPolicy::PatchSize(0).planner(),
            Err(PatchError::InvalidPatchSize(0))
        ));
        assert!(matches!(
            SizingPolicy::GridSize(0).planner(),
            Err(PatchError::InvalidGridSize(0))
        ));
    }
}
