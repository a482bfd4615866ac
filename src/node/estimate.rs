use image::RgbImage;

use super::{Color, Region};

/// Weights for combining per-channel deviations into one error value,
/// following the usual RGB to luma conversion.
pub const LUMA_WEIGHTS: [f64; 3] = [0.2989, 0.5870, 0.1140];

/// Per-channel frequency counts of the pixel values in a region.
#[derive(Clone)]
pub struct Histogram {
	counts: [[u64; 256]; 3],
}

impl Histogram {
	/// Counts every pixel of `region` that lies within `img`.
	pub fn from_region(img: &RgbImage, region: Region) -> Self {
		let mut counts = [[0u64; 256]; 3];
		let right = region.right.min(img.width());
		let bottom = region.bottom.min(img.height());
		for y in region.top..bottom {
			for x in region.left..right {
				let pix = img.get_pixel(x, y);
				for (channel, value) in pix.0.iter().enumerate() {
					counts[channel][*value as usize] += 1;
				}
			}
		}
		Histogram { counts }
	}

	/// Number of pixels counted.
	pub fn total(&self) -> u64 {
		self.counts[0].iter().sum()
	}

	/// Count-weighted mean and population standard deviation of one
	/// channel. Both are 0 for an empty histogram.
	pub fn mean_and_deviation(&self, channel: usize) -> (f64, f64) {
		let counts = &self.counts[channel];
		let total: u64 = counts.iter().sum();
		if total == 0 {
			return (0., 0.);
		}
		let total = total as f64;
		let mean = counts.iter()
			.enumerate()
			.map(|(value, &n)| value as f64 * n as f64)
			.sum::<f64>() / total;
		let variance = counts.iter()
			.enumerate()
			.map(|(value, &n)| n as f64 * (value as f64 - mean).powi(2))
			.sum::<f64>() / total;
		(mean, variance.sqrt())
	}
}

impl std::fmt::Debug for Histogram {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Histogram")
			.field("total", &self.total())
			.finish()
	}
}

/// Representative color and detail error of a region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionStats {
	pub color: Color,
	pub error: f64,
}

impl RegionStats {
	/// Measures `region` of `img`.
	///
	/// The color is the rounded per-channel mean and the error is the
	/// luma-weighted sum of the per-channel standard deviations. A region
	/// with no pixels yields black with an error of 0.
	pub fn of(img: &RgbImage, region: Region) -> Self {
		if region.is_degenerate() {
			return RegionStats::default();
		}
		let hist = Histogram::from_region(img, region);
		let mut color = [0u8; 3];
		let mut error = 0.;
		for channel in 0..3 {
			let (mean, deviation) = hist.mean_and_deviation(channel);
			// Means of u8 samples stay within 0..=255.
			color[channel] = mean.round() as u8;
			error += LUMA_WEIGHTS[channel] * deviation;
		}
		RegionStats { color: image::Rgb(color), error }
	}
}

impl Default for RegionStats {
	fn default() -> Self {
		RegionStats { color: image::Rgb([0; 3]), error: 0. }
	}
}
