use std::path::PathBuf;

use thiserror::Error;

use crate::node::error::{BuildError, DrawError};
use crate::tile::TileId;

/// Reason why a pixel array couldn't be turned into an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PixelError {
	/// There are no columns, or the columns have no pixels.
	#[error("pixel array is empty")]
	Empty,
	/// A column has a different height than the first one.
	#[error("column {column} has {found} pixels, expected {expected}")]
	Ragged { column: usize, expected: usize, found: usize },
	/// A dimension doesn't fit in a `u32`.
	#[error("pixel array is too large")]
	TooLarge,
}

/// Reason why a compressed container couldn't be written or read.
#[derive(Debug, Error)]
pub enum ContainerError {
	/// The data is too short to hold a header, or the magic bytes are wrong.
	#[error("missing container header")]
	MissingHeader,
	/// The container was written by an unknown version of the format.
	#[error("unsupported container version {0}")]
	UnsupportedVersion(u8),
	/// The raster format tag is unknown.
	#[error("unknown raster format tag {0}")]
	UnknownFormat(u8),
	/// The payload is shorter than the header announces.
	#[error("payload truncated: expected {expected} bytes, found {found}")]
	Truncated { expected: u64, found: u64 },
	/// There are bytes past the end of the announced payload.
	#[error("{0} bytes of trailing data after payload")]
	TrailingData(u64),
	/// The raster encoder rejected the image.
	#[error("failed to encode raster")]
	Encode(#[source] image::ImageError),
	/// The raster decoder rejected the payload.
	#[error("failed to decode raster")]
	Decode(#[source] image::ImageError),
}

/// Reason why a single tile couldn't be compressed.
#[derive(Debug, Error)]
pub enum TileError {
	#[error("could not build quadtree")]
	Build(#[from] BuildError),
	#[error("could not render quadtree")]
	Draw(#[from] DrawError),
	/// The tile's task panicked; carries the panic message.
	#[error("tile task panicked: {0}")]
	Panicked(String),
	/// The tile was skipped because the compression was cancelled.
	#[error("tile skipped after cancellation")]
	Cancelled,
}

/// Reason why a `CompressConfig` is unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
	#[error("tile grid must have at least one row and one column, got {columns}x{rows}")]
	EmptyGrid { columns: u32, rows: u32 },
	#[error("worker pool must have at least one worker")]
	NoWorkers,
	#[error("JPEG quality must be within 1..=100, got {0}")]
	InvalidQuality(u8),
	#[error(transparent)]
	Build(#[from] BuildError),
}

/// Reason why an image couldn't be compressed.
#[derive(Debug, Error)]
pub enum CompressError {
	#[error("invalid configuration")]
	Config(#[from] ConfigError),
	#[error("invalid pixel data")]
	Pixels(#[from] PixelError),
	#[error("could not start worker pool")]
	Pool(#[from] rayon::ThreadPoolBuildError),
	/// At least one tile failed; `tile` is the first failure in grid
	/// order and `failed` the total number of failed tiles.
	#[error("tile {tile} failed ({failed} failed tiles in total)")]
	Worker {
		tile: TileId,
		failed: usize,
		#[source]
		source: TileError,
	},
	#[error("compression was cancelled")]
	Cancelled,
	#[error("could not encode container")]
	Container(#[from] ContainerError),
	#[error("could not write {}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Reason why a compressed file couldn't be decompressed.
#[derive(Debug, Error)]
pub enum DecompressError {
	#[error("could not read {}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid compressed data")]
	Format(#[from] ContainerError),
}
