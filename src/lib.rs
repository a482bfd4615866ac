//! Lossy image compression by quadtree flattening.
//!
//! The image is cut into a grid of tiles. Each tile gets its own quadtree,
//! split wherever a region's luma-weighted color deviation is above a
//! threshold, and is rendered back with every cell painted in its mean
//! color. The recombined image is stored JPEG-encoded in a small framed
//! container.

pub mod config;
pub mod container;
pub mod error;
pub mod node;
pub mod pixels;
pub mod tile;

pub use config::CompressConfig;
pub use container::RasterFormat;
pub use error::{CompressError, ContainerError, DecompressError, PixelError, TileError};
pub use node::tree::{BuildParams, Quadtree};
pub use node::{QuadtreeNode, Region};
pub use pixels::PixelArray;
pub use tile::CancellationToken;

use std::fs;
use std::path::Path;

use image::RgbImage;
use log::info;

/// Compresses and decompresses images with a fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct Compressor {
	config: CompressConfig,
}

impl Compressor {
	pub fn new(config: CompressConfig) -> Self {
		Compressor { config }
	}

	pub fn config(&self) -> &CompressConfig {
		&self.config
	}

	/// Compresses `pixels`, indexed `[x][y][channel]`, and writes the
	/// container to `output`.
	pub fn compress<P: AsRef<Path>>(&self, pixels: &[Vec<[u8; 3]>], output: P) -> Result<(), CompressError> {
		self.compress_with_cancel(pixels, output, &CancellationToken::new())
	}

	/// Like `compress`, but gives up with `CompressError::Cancelled` once
	/// `cancel` is triggered.
	pub fn compress_with_cancel<P: AsRef<Path>>(
		&self,
		pixels: &[Vec<[u8; 3]>],
		output: P,
		cancel: &CancellationToken
	) -> Result<(), CompressError> {
		self.config.validate()?;
		let img = pixels::to_image(pixels)?;
		let data = self.compress_to_vec(&img, cancel)?;
		let output = output.as_ref();
		fs::write(output, &data).map_err(|source| CompressError::Io {
			path: output.to_owned(),
			source,
		})?;
		info!("wrote {} bytes to {}", data.len(), output.display());
		Ok(())
	}

	/// Compresses `img` into container data without touching the disk.
	pub fn compress_to_vec(&self, img: &RgbImage, cancel: &CancellationToken) -> Result<Vec<u8>, CompressError> {
		let flattened = self.compress_image(img, cancel)?;
		Ok(container::to_container(&flattened, self.config.format, self.config.jpeg_quality)?)
	}

	/// Runs the tiled quadtree flattening alone, returning the lossy image
	/// that would be encoded into the container.
	pub fn compress_image(&self, img: &RgbImage, cancel: &CancellationToken) -> Result<RgbImage, CompressError> {
		info!(
			"compressing {}x{} image in {}x{} tiles on {} workers",
			img.width(), img.height(), self.config.grid_columns, self.config.grid_rows, self.config.workers
		);
		tile::encode_tiles(img, &self.config, cancel)
	}

	/// Reads a container from `input` and returns its pixels, indexed
	/// `[x][y][channel]`.
	pub fn decompress<P: AsRef<Path>>(&self, input: P) -> Result<PixelArray, DecompressError> {
		decompress_image(input).map(|img| pixels::from_image(&img))
	}
}

/// Compresses `pixels` to `output` with the default configuration.
pub fn compress<P: AsRef<Path>>(pixels: &[Vec<[u8; 3]>], output: P) -> Result<(), CompressError> {
	Compressor::default().compress(pixels, output)
}

/// Reads the container at `input` back into pixels.
pub fn decompress<P: AsRef<Path>>(input: P) -> Result<PixelArray, DecompressError> {
	Compressor::default().decompress(input)
}

/// Reads the container at `input` back into an image.
pub fn decompress_image<P: AsRef<Path>>(input: P) -> Result<RgbImage, DecompressError> {
	let input = input.as_ref();
	let data = fs::read(input).map_err(|source| DecompressError::Io {
		path: input.to_owned(),
		source,
	})?;
	let img = container::from_container(&data)?;
	info!("decoded {}x{} image from {}", img.width(), img.height(), input.display());
	Ok(img)
}
