//! The framed container that compressed images are stored in.
//!
//! Layout, integers big-endian:
//!
//! | offset | size | content                                |
//! |--------|------|----------------------------------------|
//! | 0      | 6    | magic, `QuTrJp`                        |
//! | 6      | 1    | format version, currently 1            |
//! | 7      | 1    | raster format tag (1 JPEG, 2 PNG)      |
//! | 8      | 8    | payload length `N`                     |
//! | 16     | `N`  | payload, the encoded raster            |
//!
//! Width and height are not stored; the raster payload carries them.

use std::convert::TryInto;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbImage};

use crate::error::ContainerError;

pub const MAGIC: &[u8; 6] = b"QuTrJp";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 16;

/// Quality the JPEG encoder uses unless told otherwise.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Standard raster encoding wrapped by the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterFormat {
	Jpeg,
	/// Lossless payload; the quadtree flattening is then the only loss.
	Png,
}

impl RasterFormat {
	pub fn tag(self) -> u8 {
		match self {
			RasterFormat::Jpeg => 1,
			RasterFormat::Png => 2,
		}
	}

	pub fn from_tag(tag: u8) -> Option<Self> {
		match tag {
			1 => Some(RasterFormat::Jpeg),
			2 => Some(RasterFormat::Png),
			_ => None,
		}
	}

	/// Encodes `img` with the delegated codec. `quality` only applies to
	/// JPEG.
	pub fn encode(self, img: &RgbImage, quality: u8) -> Result<Vec<u8>, ContainerError> {
		let mut buf = Vec::new();
		let (width, height) = img.dimensions();
		let written = match self {
			RasterFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, quality)
				.write_image(img.as_raw(), width, height, ColorType::Rgb8),
			RasterFormat::Png => PngEncoder::new(&mut buf)
				.write_image(img.as_raw(), width, height, ColorType::Rgb8),
		};
		written.map_err(ContainerError::Encode)?;
		Ok(buf)
	}

	pub fn decode(self, payload: &[u8]) -> Result<RgbImage, ContainerError> {
		let format = match self {
			RasterFormat::Jpeg => ImageFormat::Jpeg,
			RasterFormat::Png => ImageFormat::Png,
		};
		let mut reader = image::io::Reader::new(Cursor::new(payload));
		reader.set_format(format);
		let decoded = reader.decode().map_err(ContainerError::Decode)?;
		Ok(decoded.to_rgb8())
	}
}

/// Wraps an encoded raster in a container frame.
pub fn frame(format: RasterFormat, payload: &[u8]) -> Vec<u8> {
	let mut ret = Vec::with_capacity(HEADER_LEN + payload.len());
	ret.extend_from_slice(MAGIC);
	ret.push(VERSION);
	ret.push(format.tag());
	ret.extend_from_slice(&(payload.len() as u64).to_be_bytes());
	ret.extend_from_slice(payload);
	ret
}

/// Validates a container frame and returns its raster format and payload.
pub fn unframe(source: &[u8]) -> Result<(RasterFormat, &[u8]), ContainerError> {
	if source.len() < HEADER_LEN || &source[..6] != MAGIC {
		return Err(ContainerError::MissingHeader);
	}
	if source[6] != VERSION {
		return Err(ContainerError::UnsupportedVersion(source[6]));
	}
	let format = RasterFormat::from_tag(source[7])
		.ok_or(ContainerError::UnknownFormat(source[7]))?;
	let mut len_bytes = [0u8; 8];
	len_bytes.copy_from_slice(&source[8..HEADER_LEN]);
	let expected = u64::from_be_bytes(len_bytes);
	let found = (source.len() - HEADER_LEN) as u64;
	if found < expected {
		return Err(ContainerError::Truncated { expected, found });
	}
	if found > expected {
		return Err(ContainerError::TrailingData(found - expected));
	}
	// `expected == found`, which already fits in memory.
	let len: usize = expected.try_into().map_err(|_| ContainerError::MissingHeader)?;
	Ok((format, &source[HEADER_LEN..HEADER_LEN + len]))
}

/// Encodes an image into container data.
pub fn to_container(img: &RgbImage, format: RasterFormat, quality: u8) -> Result<Vec<u8>, ContainerError> {
	let payload = format.encode(img, quality)?;
	Ok(frame(format, &payload))
}

/// Decodes container data back into an image.
pub fn from_container(source: &[u8]) -> Result<RgbImage, ContainerError> {
	let (format, payload) = unframe(source)?;
	format.decode(payload)
}
