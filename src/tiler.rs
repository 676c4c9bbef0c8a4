use crate::config::RunConfig;
use crate::error::Result;
use crate::gdal_io::{crs_label, GdalSource, GdalTileWriter};
use crate::grid::{GridCell, GridPlanner, PlannedCell};
use crate::io::{RasterSource, TileWriter};
use crate::profile::WriterProfile;
use log::{debug, info};
use std::fmt;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub written: usize,
    pub discarded: usize,
}

impl RunCounters {
    pub fn processed(&self) -> usize {
        self.written + self.discarded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_cells: usize,
    pub counters: RunCounters,
    pub out_dir: PathBuf,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "  - Total grid cells evaluated: {}", self.total_cells)?;
        writeln!(f, "  - Written patches: {}", self.counters.written)?;
        writeln!(f, "  - Discarded (fully NoData) cells: {}", self.counters.discarded)?;
        write!(f, "  - Output folder: {}", self.out_dir.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellOutcome {
    Written,
    Discarded,
}

/// Walks the planned grid, writing every cell that holds at least one valid pixel.
pub struct TileSplitter<'a, S: RasterSource, W: TileWriter> {
    source: &'a S,
    writer: &'a mut W,
    planner: &'a dyn GridPlanner,
    out_dir: PathBuf,
    extension: String,
    log_every: usize,
}

impl<'a, S: RasterSource, W: TileWriter> TileSplitter<'a, S, W> {
    pub fn new(
        source: &'a S,
        writer: &'a mut W,
        planner: &'a dyn GridPlanner,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            writer,
            planner,
            out_dir: out_dir.into(),
            extension: "tif".to_string(),
            log_every: 0,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    pub fn tile_path(&self, cell: GridCell) -> PathBuf {
        self.out_dir
            .join(format!("{}_{}.{}", cell.x, cell.y, self.extension))
    }

    pub fn run(mut self) -> Result<RunSummary> {
        let source = self.source;
        let source_profile = source.profile();
        let plan = self.planner.plan(source_profile.width, source_profile.height);
        let dims = plan.dimensions();
        let total_cells = dims.total_cells();

        info!("[4/6] Planning grid: {}", self.planner.describe());
        info!(
            "      grid_cols={} (x=0..{}), grid_rows={} (y=0..{}), cell={}x{} px",
            dims.n_cols,
            dims.n_cols.saturating_sub(1),
            dims.n_rows,
            dims.n_rows.saturating_sub(1),
            dims.cell_width,
            dims.cell_height
        );
        info!("      total grid cells to evaluate: {}", total_cells);

        // Window-independent, so sanitized once per run
        let base_profile = source_profile.sanitized_for_small_tiles();

        info!("[5/6] Processing windows (skipping fully-NoData tiles using the raster mask)...");

        let mut counters = RunCounters::default();
        for planned in plan {
            match self.evaluate(&planned, &base_profile)? {
                CellOutcome::Written => counters.written += 1,
                CellOutcome::Discarded => counters.discarded += 1,
            }

            if should_report(counters.processed(), self.log_every) {
                info!(
                    "  - Progress: processed={}/{}, written={}, discarded={}",
                    counters.processed(),
                    total_cells,
                    counters.written,
                    counters.discarded
                );
            }
        }

        info!("[6/6] Done.");

        Ok(RunSummary {
            total_cells,
            counters,
            out_dir: self.out_dir,
        })
    }

    fn evaluate(
        &mut self,
        planned: &PlannedCell,
        base_profile: &WriterProfile,
    ) -> Result<CellOutcome> {
        let cell = planned.cell;
        let Some(window) = planned.window else {
            debug!("Cell ({}, {}) lies outside the raster, discarding", cell.x, cell.y);
            return Ok(CellOutcome::Discarded);
        };

        let mask = self.source.read_mask(&window)?;
        if mask.is_fully_invalid() {
            debug!("Cell ({}, {}) is fully NoData, discarding", cell.x, cell.y);
            return Ok(CellOutcome::Discarded);
        }

        let data = self.source.read_window(&window)?;
        let profile = base_profile.for_window(&window);
        let path = self.tile_path(cell);

        self.writer.write_tile(&path, &profile, &data, &mask)?;
        Ok(CellOutcome::Written)
    }
}

/// Progress is logged after every `log_every` processed cells; 0 turns it off.
fn should_report(processed: usize, log_every: usize) -> bool {
    log_every > 0 && processed > 0 && processed % log_every == 0
}

/// Full run against a GDAL-readable source: open, plan, write tiles.
pub fn split_to_patches(config: &RunConfig) -> Result<RunSummary> {
    let planner = config.sizing.planner()?;

    info!("[1/6] Opening source GeoTIFF: {}", config.src.display());
    let source = GdalSource::open(&config.src)?;

    let profile = source.profile();
    info!(
        "[2/6] Source info: width={}, height={}, bands={}, dtype={}, crs={}",
        profile.width,
        profile.height,
        profile.band_count,
        profile.dtype,
        crs_label(profile.crs.as_deref())
    );
    info!(
        "      nodata={} (mask will be used to detect NoData tiles)",
        profile
            .nodata
            .map_or_else(|| "None".to_string(), |nd| nd.to_string())
    );

    info!("[3/6] Ensuring output folder exists: {}", config.out_dir.display());
    fs::create_dir_all(&config.out_dir)?;

    let extension = if profile.changes_format() {
        info!(
            "      {} source, tiles are written as {}",
            profile.driver,
            profile.output_driver()
        );
        "tif".to_string()
    } else {
        config.tile_extension()
    };
    let mut writer = GdalTileWriter;

    TileSplitter::new(&source, &mut writer, planner.as_ref(), &config.out_dir)
        .with_extension(extension)
        .with_log_every(config.log_every)
        .run()
}
