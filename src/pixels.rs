//! Conversion between column-major pixel arrays and `image` buffers.

use std::convert::TryFrom;

use image::{Rgb, RgbImage};

use crate::error::PixelError;

/// Pixel data indexed as `pixels[x][y][channel]`, channels being red,
/// green and blue.
pub type PixelArray = Vec<Vec<[u8; 3]>>;

/// Builds an image from a pixel array. Every column must have the same,
/// nonzero number of pixels.
pub fn to_image(pixels: &[Vec<[u8; 3]>]) -> Result<RgbImage, PixelError> {
	let height = pixels.first().map(Vec::len).unwrap_or(0);
	if height == 0 {
		return Err(PixelError::Empty);
	}
	if let Some((column, col)) = pixels.iter().enumerate().find(|(_, c)| c.len() != height) {
		return Err(PixelError::Ragged { column, expected: height, found: col.len() });
	}
	let width = u32::try_from(pixels.len()).map_err(|_| PixelError::TooLarge)?;
	let height = u32::try_from(height).map_err(|_| PixelError::TooLarge)?;
	Ok(RgbImage::from_fn(width, height, |x, y| Rgb(pixels[x as usize][y as usize])))
}

/// Reads an image back into a pixel array.
pub fn from_image(img: &RgbImage) -> PixelArray {
	(0..img.width())
		.map(|x| (0..img.height()).map(|y| img.get_pixel(x, y).0).collect())
		.collect()
}
