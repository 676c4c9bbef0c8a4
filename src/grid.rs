use log::debug;

/// Grid coordinates of one cell; `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
}

/// Rectangular region of the source raster in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn col_end(&self) -> usize {
        self.col_off + self.width
    }

    pub fn row_end(&self) -> usize {
        self.row_off + self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// A cell together with its clipped window.
///
/// `window` is `None` when the cell starts at or past the raster edge, which
/// only happens under [`FixedGridCount`] on rasters smaller than the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedCell {
    pub cell: GridCell,
    pub window: Option<PixelWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    pub n_cols: usize,
    pub n_rows: usize,
    /// Nominal (unclipped) cell size in pixels
    pub cell_width: usize,
    pub cell_height: usize,
}

impl GridDimensions {
    pub fn total_cells(&self) -> usize {
        self.n_cols * self.n_rows
    }
}

/// Sizing strategy that lays a grid over a `width` x `height` raster.
pub trait GridPlanner {
    fn dimensions(&self, width: usize, height: usize) -> GridDimensions;

    /// Short human-readable description for progress output
    fn describe(&self) -> String;

    /// Fresh row-major enumeration of every cell in the grid.
    fn plan(&self, width: usize, height: usize) -> GridPlan {
        GridPlan::new(width, height, self.dimensions(width, height))
    }
}

/// Square tiles of `patch_size` pixels; the last column and row are clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPatchSize {
    pub patch_size: usize,
}

impl GridPlanner for FixedPatchSize {
    fn dimensions(&self, width: usize, height: usize) -> GridDimensions {
        GridDimensions {
            n_cols: width.div_ceil(self.patch_size),
            n_rows: height.div_ceil(self.patch_size),
            cell_width: self.patch_size,
            cell_height: self.patch_size,
        }
    }

    fn describe(&self) -> String {
        format!("patch_size={} px", self.patch_size)
    }
}

/// Exactly `grid_size` x `grid_size` cells of near-equal size.
///
/// The nominal cell size is rounded up, so trailing cells can fall entirely
/// outside the raster. Those cells are still enumerated (with no window) so
/// the total always equals `grid_size * grid_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedGridCount {
    pub grid_size: usize,
}

impl GridPlanner for FixedGridCount {
    fn dimensions(&self, width: usize, height: usize) -> GridDimensions {
        GridDimensions {
            n_cols: self.grid_size,
            n_rows: self.grid_size,
            cell_width: width.div_ceil(self.grid_size),
            cell_height: height.div_ceil(self.grid_size),
        }
    }

    fn describe(&self) -> String {
        format!("grid_size={} cells per side", self.grid_size)
    }
}

pub struct GridPlan {
    raster_width: usize,
    raster_height: usize,
    dims: GridDimensions,
    current_idx: usize,
}

impl GridPlan {
    fn new(raster_width: usize, raster_height: usize, dims: GridDimensions) -> Self {
        debug!(
            "GridPlan: {}x{} raster, cell={}x{} → {}x{} cells ({} total)",
            raster_width,
            raster_height,
            dims.cell_width,
            dims.cell_height,
            dims.n_cols,
            dims.n_rows,
            dims.total_cells()
        );

        Self {
            raster_width,
            raster_height,
            dims,
            current_idx: 0,
        }
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    pub fn cell_at(&self, idx: usize) -> PlannedCell {
        // Linear index to row-major grid coordinates
        let cell = GridCell {
            x: idx % self.dims.n_cols,
            y: idx / self.dims.n_cols,
        };

        let col_off = cell.x * self.dims.cell_width;
        let row_off = cell.y * self.dims.cell_height;

        let window = if col_off >= self.raster_width || row_off >= self.raster_height {
            None
        } else {
            Some(PixelWindow {
                col_off,
                row_off,
                width: self.dims.cell_width.min(self.raster_width - col_off),
                height: self.dims.cell_height.min(self.raster_height - row_off),
            })
        };

        PlannedCell { cell, window }
    }
}

impl Iterator for GridPlan {
    type Item = PlannedCell;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_idx < self.dims.total_cells() {
            let planned = self.cell_at(self.current_idx);
            self.current_idx += 1;
            Some(planned)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dims.total_cells() - self.current_idx;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridPlan {}
