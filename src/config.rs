use crate::container::{RasterFormat, DEFAULT_JPEG_QUALITY};
use crate::error::ConfigError;
use crate::node::tree::BuildParams;
use crate::tile::DepthPolicy;

/// Default number of tile columns and rows.
pub const DEFAULT_GRID: (u32, u32) = (2, 2);

/// Default size of the tile worker pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Everything that can be tuned about a compression run.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressConfig {
	pub grid_columns: u32,
	pub grid_rows: u32,
	/// Number of threads tiles are processed on.
	pub workers: usize,
	/// Splitting rules for each tile's quadtree.
	pub build: BuildParams,
	/// Depth each tile's quadtree is rendered at.
	pub depth: DepthPolicy,
	/// Raster encoding inside the container.
	pub format: RasterFormat,
	pub jpeg_quality: u8,
}

impl Default for CompressConfig {
	fn default() -> Self {
		CompressConfig {
			grid_columns: DEFAULT_GRID.0,
			grid_rows: DEFAULT_GRID.1,
			workers: DEFAULT_WORKERS,
			build: BuildParams::default(),
			depth: DepthPolicy::default(),
			format: RasterFormat::Jpeg,
			jpeg_quality: DEFAULT_JPEG_QUALITY,
		}
	}
}

impl CompressConfig {
	pub fn with_grid(mut self, columns: u32, rows: u32) -> Self {
		self.grid_columns = columns;
		self.grid_rows = rows;
		self
	}

	pub fn with_workers(mut self, workers: usize) -> Self {
		self.workers = workers;
		self
	}

	pub fn with_error_threshold(mut self, threshold: f64) -> Self {
		self.build.error_threshold = threshold;
		self
	}

	/// Sets the depth cap used while building tile quadtrees.
	pub fn with_max_depth(mut self, max_depth: u32) -> Self {
		self.build.max_depth = max_depth;
		self
	}

	/// Sets the ceiling on the depth tiles are rendered at.
	pub fn with_depth_ceiling(mut self, ceiling: u32) -> Self {
		self.depth.ceiling = ceiling;
		self
	}

	pub fn with_format(mut self, format: RasterFormat) -> Self {
		self.format = format;
		self
	}

	pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
		self.jpeg_quality = quality;
		self
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.grid_columns == 0 || self.grid_rows == 0 {
			return Err(ConfigError::EmptyGrid { columns: self.grid_columns, rows: self.grid_rows });
		}
		if self.workers == 0 {
			return Err(ConfigError::NoWorkers);
		}
		if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
			return Err(ConfigError::InvalidQuality(self.jpeg_quality));
		}
		self.build.validate()?;
		Ok(())
	}
}
