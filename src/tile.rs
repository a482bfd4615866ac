//! Splitting an image into a grid of tiles, compressing each tile with
//! its own quadtree on a worker pool, and stitching the results back
//! together.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbImage;
use log::debug;
use rayon::prelude::*;

use crate::config::CompressConfig;
use crate::error::{CompressError, TileError};
use crate::node::tree::{BuildParams, Quadtree};
use crate::node::Region;

/// Default ceiling on the depth tiles are rendered at.
pub const DEFAULT_DEPTH_CEILING: u32 = 8;

/// Position of a tile in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileId {
	pub row: u32,
	pub col: u32,
}

impl fmt::Display for TileId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}, {})", self.row, self.col)
	}
}

/// A tile's place in the grid and the part of the image it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
	pub id: TileId,
	pub region: Region,
}

/// Lays a `columns` by `rows` grid over a `width` by `height` image, in
/// row-major order.
///
/// Column `j` spans `j * width / columns` up to `(j + 1) * width / columns`,
/// and rows likewise, so tiles differ by at most one pixel in size and
/// always cover the image exactly.
///
/// The grid is clamped to at most one column per pixel of width and one
/// row per pixel of height, so no tile is empty unless the image is.
pub fn grid(width: u32, height: u32, columns: u32, rows: u32) -> Vec<Tile> {
	let columns = columns.min(width.max(1));
	let rows = rows.min(height.max(1));
	let edge = |i: u32, len: u32, parts: u32| (i as u64 * len as u64 / parts as u64) as u32;
	let mut tiles = Vec::with_capacity(columns as usize * rows as usize);
	for row in 0..rows {
		for col in 0..columns {
			tiles.push(Tile {
				id: TileId { row, col },
				region: Region::new(
					edge(col, width, columns),
					edge(row, height, rows),
					edge(col + 1, width, columns),
					edge(row + 1, height, rows),
				),
			});
		}
	}
	tiles
}

/// Chooses how deep each tile's quadtree is rendered.
///
/// The depth is `floor(log2(max(width, height)))` of the tile, capped at
/// `ceiling`, which bounds blockiness and run time regardless of size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthPolicy {
	pub ceiling: u32,
}

impl DepthPolicy {
	/// Depth at which a tile of this size would reach single pixels.
	pub fn theoretical_depth(width: u32, height: u32) -> u32 {
		match width.max(height) {
			0 => 0,
			size => 31 - size.leading_zeros(),
		}
	}

	pub fn render_depth(&self, width: u32, height: u32) -> u32 {
		Self::theoretical_depth(width, height).min(self.ceiling)
	}
}

impl Default for DepthPolicy {
	fn default() -> Self {
		DepthPolicy { ceiling: DEFAULT_DEPTH_CEILING }
	}
}

/// Cooperative cancellation flag shared between a caller and a running
/// compression.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stops tiles that have not started yet from being processed.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

/// Compresses one tile of `img`: builds a quadtree over it and renders
/// the tree at the policy's depth.
///
/// The render depth is also limited to the depth the tree actually
/// reached, since a smooth tile stops splitting early.
pub fn encode_tile(
	img: &RgbImage,
	tile: &Tile,
	params: &BuildParams,
	policy: &DepthPolicy
) -> Result<RgbImage, TileError> {
	let region = tile.region;
	let part = image::imageops::crop_imm(img, region.left, region.top, region.width(), region.height())
		.to_image();
	let tree = Quadtree::build(&part, *params)?;
	let depth = policy.render_depth(region.width(), region.height()).min(tree.max_depth());
	debug!(
		"tile {}: {}x{}, tree depth {}, {} leaves, rendering at depth {}",
		tile.id, region.width(), region.height(), tree.max_depth(), tree.leaf_count(), depth
	);
	Ok(tree.render_at_depth(depth)?)
}

/// Compresses every tile of `img` on a pool of `config.workers` threads
/// and recombines the tiles into an image of the original size.
///
/// All tiles are waited for. If any fails, the first failing tile in
/// grid order is reported along with the number of failures; no partial
/// image is returned. Tiles check `cancel` before starting, and a
/// cancelled run returns `CompressError::Cancelled`.
pub fn encode_tiles(
	img: &RgbImage,
	config: &CompressConfig,
	cancel: &CancellationToken
) -> Result<RgbImage, CompressError> {
	config.validate()?;
	let tiles = grid(img.width(), img.height(), config.grid_columns, config.grid_rows);
	run_tiles(img, &tiles, config.workers, cancel, |tile| {
		encode_tile(img, tile, &config.build, &config.depth)
	})
}

/// Runs `work` for every tile on a pool of `workers` threads, waits for
/// all of them and pastes the results onto a canvas the size of `img`.
fn run_tiles<F>(
	img: &RgbImage,
	tiles: &[Tile],
	workers: usize,
	cancel: &CancellationToken,
	work: F
) -> Result<RgbImage, CompressError>
where
	F: Fn(&Tile) -> Result<RgbImage, TileError> + Sync,
{
	let pool = rayon::ThreadPoolBuilder::new()
		.num_threads(workers)
		.thread_name(|i| format!("quadtree-tile-{}", i))
		.build()?;
	let results: Vec<Result<RgbImage, TileError>> = pool.install(|| tiles.par_iter()
		.map(|tile| {
			if cancel.is_cancelled() {
				return Err(TileError::Cancelled);
			}
			panic::catch_unwind(AssertUnwindSafe(|| work(tile)))
				.unwrap_or_else(|payload| Err(TileError::Panicked(panic_message(payload.as_ref()))))
		})
		.collect());
	drop(pool);

	if cancel.is_cancelled() {
		return Err(CompressError::Cancelled);
	}
	let failed = results.iter().filter(|r| r.is_err()).count();
	let mut canvas = RgbImage::new(img.width(), img.height());
	for (tile, result) in tiles.iter().zip(results) {
		match result {
			Ok(part) => image::imageops::replace(
				&mut canvas,
				&part,
				tile.region.left as i64,
				tile.region.top as i64,
			),
			Err(source) => return Err(CompressError::Worker { tile: tile.id, failed, source }),
		}
	}
	Ok(canvas)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		msg.to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"unknown panic".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::error::DrawError;
	use image::Rgb;
	use std::sync::atomic::AtomicUsize;

	fn blank_tile(tile: &Tile) -> RgbImage {
		RgbImage::new(tile.region.width(), tile.region.height())
	}

	fn noise(width: u32, height: u32) -> RgbImage {
		RgbImage::from_fn(width, height, |x, y| {
			let v = ((x * 7919 + y * 104_729) ^ (x * y * 31)) % 256;
			Rgb([v as u8, (255 - v) as u8, ((v * 5) % 256) as u8])
		})
	}

	fn coverage(width: u32, height: u32, columns: u32, rows: u32) -> Vec<u32> {
		let mut hits = vec![0; (width * height) as usize];
		for tile in grid(width, height, columns, rows) {
			let r = tile.region;
			for y in r.top..r.bottom {
				for x in r.left..r.right {
					hits[(y * width + x) as usize] += 1;
				}
			}
		}
		hits
	}

	#[test]
	fn grid_covers_non_divisible_images() {
		for &(w, h, c, r) in &[(7, 5, 2, 2), (10, 10, 3, 3), (1, 1, 2, 2), (9, 4, 4, 1), (64, 48, 2, 2)] {
			assert!(coverage(w, h, c, r).iter().all(|&n| n == 1), "{}x{} in {}x{}", w, h, c, r);
		}
	}

	#[test]
	fn grid_is_row_major() {
		let tiles = grid(10, 6, 2, 3);
		assert_eq!(tiles.len(), 6);
		assert_eq!(tiles[1].id, TileId { row: 0, col: 1 });
		assert_eq!(tiles[1].region, Region::new(5, 0, 10, 2));
		assert_eq!(tiles[4].id, TileId { row: 2, col: 0 });
		assert_eq!(tiles[4].region, Region::new(0, 4, 5, 6));
	}

	#[test]
	fn depth_policy() {
		assert_eq!(DepthPolicy::theoretical_depth(0, 0), 0);
		assert_eq!(DepthPolicy::theoretical_depth(1, 1), 0);
		assert_eq!(DepthPolicy::theoretical_depth(100, 3), 6);
		assert_eq!(DepthPolicy::theoretical_depth(256, 512), 9);
		let policy = DepthPolicy::default();
		assert_eq!(policy.render_depth(100, 3), 6);
		assert_eq!(policy.render_depth(4096, 4096), 8);
		assert_eq!(DepthPolicy { ceiling: 3 }.render_depth(100, 3), 3);
	}

	#[test]
	fn uniform_tiles_render_flat() {
		let img = RgbImage::from_pixel(64, 64, Rgb([10, 200, 30]));
		let out = encode_tiles(&img, &CompressConfig::default(), &CancellationToken::new()).unwrap();
		assert_eq!(out, img);
	}

	#[test]
	fn tiles_keep_their_grid_position() {
		let colors = [Rgb([255, 0, 0]), Rgb([0, 255, 0]), Rgb([0, 0, 255]), Rgb([255, 255, 0])];
		let img = RgbImage::from_fn(9, 7, |x, y| {
			let col = if x < 4 { 0 } else { 1 };
			let row = if y < 3 { 0 } else { 1 };
			colors[row * 2 + col]
		});
		let out = encode_tiles(&img, &CompressConfig::default(), &CancellationToken::new()).unwrap();
		assert_eq!(out, img);
	}

	#[test]
	fn output_matches_input_size_for_any_grid() {
		let img = RgbImage::from_fn(23, 17, |x, y| Rgb([(x * 11) as u8, (y * 13) as u8, ((x + y) * 5) as u8]));
		for &(c, r, workers) in &[(1, 1, 1), (2, 2, 4), (3, 5, 2), (30, 30, 3)] {
			let config = CompressConfig::default().with_grid(c, r).with_workers(workers);
			let out = encode_tiles(&img, &config, &CancellationToken::new()).unwrap();
			assert_eq!(out.dimensions(), (23, 17));
		}
	}

	#[test]
	fn cancelled_before_start() {
		let cancel = CancellationToken::new();
		cancel.cancel();
		let img = RgbImage::new(8, 8);
		let err = encode_tiles(&img, &CompressConfig::default(), &cancel).unwrap_err();
		assert!(matches!(err, CompressError::Cancelled));
	}

	#[test]
	fn bad_threshold_fails_before_dispatch() {
		let config = CompressConfig::default().with_error_threshold(-2.);
		let err = encode_tiles(&RgbImage::new(4, 4), &config, &CancellationToken::new()).unwrap_err();
		assert!(matches!(err, CompressError::Config(_)));
	}

	#[test]
	fn panic_messages_are_kept() {
		let err = panic::catch_unwind(|| panic!("tile exploded")).unwrap_err();
		assert_eq!(panic_message(err.as_ref()), "tile exploded");
		let err = panic::catch_unwind(|| panic!("{} exploded", 3)).unwrap_err();
		assert_eq!(panic_message(err.as_ref()), "3 exploded");
	}

	#[test]
	fn failed_tiles_report_the_first_in_grid_order() {
		let img = RgbImage::new(8, 8);
		let tiles = grid(8, 8, 2, 2);
		let err = run_tiles(&img, &tiles, 4, &CancellationToken::new(), |tile| {
			if tile.id.col == 1 {
				Err(TileError::Draw(DrawError::InvalidDepth { requested: 9, max: 0 }))
			} else {
				Ok(blank_tile(tile))
			}
		}).unwrap_err();
		match err {
			CompressError::Worker { tile, failed, source } => {
				assert_eq!(tile, TileId { row: 0, col: 1 });
				assert_eq!(failed, 2);
				assert!(matches!(source, TileError::Draw(DrawError::InvalidDepth { requested: 9, max: 0 })));
			},
			other => panic!("unexpected error {:?}", other),
		}
	}

	#[test]
	fn panicking_tile_fails_the_run() {
		let img = RgbImage::new(6, 6);
		let tiles = grid(6, 6, 2, 2);
		let err = run_tiles(&img, &tiles, 2, &CancellationToken::new(), |tile| {
			if tile.id == (TileId { row: 1, col: 0 }) {
				panic!("tile worker died");
			}
			Ok(blank_tile(tile))
		}).unwrap_err();
		match err {
			CompressError::Worker { tile, failed, source: TileError::Panicked(msg) } => {
				assert_eq!(tile, TileId { row: 1, col: 0 });
				assert_eq!(failed, 1);
				assert_eq!(msg, "tile worker died");
			},
			other => panic!("unexpected error {:?}", other),
		}
	}

	#[test]
	fn cancelling_mid_run_skips_remaining_tiles() {
		let img = RgbImage::new(8, 8);
		let tiles = grid(8, 8, 4, 4);
		let cancel = CancellationToken::new();
		let calls = AtomicUsize::new(0);
		let err = run_tiles(&img, &tiles, 1, &cancel, |tile| {
			calls.fetch_add(1, Ordering::SeqCst);
			cancel.cancel();
			Ok(blank_tile(tile))
		}).unwrap_err();
		assert!(matches!(err, CompressError::Cancelled));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn oversized_grid_is_clamped_to_pixels() {
		assert_eq!(grid(8, 8, 100_000, 100_000).len(), 64);
		assert_eq!(grid(3, 2, u32::MAX, u32::MAX).len(), 6);
		assert_eq!(grid(0, 0, 5, 5).len(), 1);
		let img = noise(8, 6);
		let config = CompressConfig::default().with_grid(100_000, 100_000);
		let out = encode_tiles(&img, &config, &CancellationToken::new()).unwrap();
		// Every tile is a single pixel and renders as itself.
		assert_eq!(out, img);
	}

	#[test]
	fn depth_cap_limits_tile_tree() {
		let img = noise(16, 16);
		let tile = grid(16, 16, 1, 1)[0];
		let flat = CompressConfig::default().with_max_depth(0);
		let out = encode_tile(&img, &tile, &flat.build, &flat.depth).unwrap();
		assert!(out.pixels().all(|p| p == out.get_pixel(0, 0)));

		let shallow = CompressConfig::default().with_max_depth(1);
		let out = encode_tile(&img, &tile, &shallow.build, &shallow.depth).unwrap();
		let mut colors: Vec<_> = out.pixels().map(|p| p.0).collect();
		colors.sort_unstable();
		colors.dedup();
		assert!(colors.len() <= 4, "{} colors at depth 1", colors.len());
		assert!(colors.len() > 1);
	}
}
