pub mod error;
pub mod estimate;
pub mod image;
pub mod tree;

/// An RGB color as stored in quadtree nodes.
pub type Color = ::image::Rgb<u8>;

/// Axis-aligned rectangle of pixels, `right` and `bottom` exclusive.
///
/// A region may have zero width or height; such regions are legal
/// but carry no meaningful color or error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
	pub left: u32,
	pub top: u32,
	pub right: u32,
	pub bottom: u32,
}

impl Region {
	pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
		debug_assert!(left <= right && top <= bottom, "inverted region");
		Region { left, top, right, bottom }
	}

	/// Region of the given size anchored at the origin.
	pub fn from_size(width: u32, height: u32) -> Self {
		Region::new(0, 0, width, height)
	}

	pub fn width(&self) -> u32 {
		self.right.saturating_sub(self.left)
	}

	pub fn height(&self) -> u32 {
		self.bottom.saturating_sub(self.top)
	}

	pub fn area(&self) -> u64 {
		self.width() as u64 * self.height() as u64
	}

	/// Whether the region contains no pixels at all.
	pub fn is_degenerate(&self) -> bool {
		self.width() == 0 || self.height() == 0
	}

	/// Splits the region into quadrants, in the order top-left, top-right,
	/// bottom-left, bottom-right.
	///
	/// The split point is at half the width and height, rounded down, so
	/// the right and bottom quadrants absorb any odd remainder. The four
	/// quadrants always partition the region exactly.
	pub fn split(&self) -> [Region; 4] {
		let mid_x = self.left + self.width() / 2;
		let mid_y = self.top + self.height() / 2;
		[
			Region::new(self.left, self.top, mid_x, mid_y),
			Region::new(mid_x, self.top, self.right, mid_y),
			Region::new(self.left, mid_y, mid_x, self.bottom),
			Region::new(mid_x, mid_y, self.right, self.bottom),
		]
	}
}

/// Node in a quadtree built over an image.
///
/// A leaf node has no sections and stands for its whole region with a
/// single color. A branch node has exactly four sections covering its
/// region; it still carries its own color and error, such that tree
/// descent can stop at any level and give a meaningful preview.
#[derive(Clone, Debug)]
pub struct QuadtreeNode {
	pub region: Region,
	pub depth: u32,
	pub color: Color,
	pub error: f64,
	pub sections: Option<Box<[QuadtreeNode; 4]>>,
}

impl QuadtreeNode {
	/// Creates an unsplit node for `region` of `img`, measuring its
	/// representative color and error.
	pub fn new(img: &::image::RgbImage, region: Region, depth: u32) -> Self {
		let stats = estimate::RegionStats::of(img, region);
		QuadtreeNode {
			region,
			depth,
			color: stats.color,
			error: stats.error,
			sections: None,
		}
	}

	pub fn is_leaf(&self) -> bool {
		self.sections.is_none()
	}

	/// Replaces this node's (absent) sections with four fresh nodes, one
	/// per quadrant of its region.
	pub fn split(&mut self, img: &::image::RgbImage) {
		let [tl, tr, bl, br] = self.region.split();
		let depth = self.depth + 1;
		self.sections = Some(Box::new([
			QuadtreeNode::new(img, tl, depth),
			QuadtreeNode::new(img, tr, depth),
			QuadtreeNode::new(img, bl, depth),
			QuadtreeNode::new(img, br, depth),
		]));
	}
}
