use image::{Rgb, RgbImage};

use super::error::DrawError;
use super::tree::Quadtree;
use super::QuadtreeNode;

impl QuadtreeNode {
	/// Gathers the nodes that would be visible when the tree is cut off at
	/// `depth`: every leaf above the cut, and every node exactly at it.
	fn collect_at_depth<'a>(&'a self, depth: u32, out: &mut Vec<&'a QuadtreeNode>) {
		match self.sections {
			Some(ref sects) if self.depth != depth => {
				for section in sects.iter() {
					section.collect_at_depth(depth, out);
				}
			},
			_ => out.push(self),
		}
	}

	/// Fills this node's region of `img` with its color.
	fn paint(&self, img: &mut RgbImage) {
		if self.region.is_degenerate() {
			return;
		}
		image::imageops::replace(
			img,
			&RgbImage::from_pixel(self.region.width(), self.region.height(), self.color),
			self.region.left as i64,
			self.region.top as i64,
		);
	}
}

impl Quadtree {
	/// Lists the nodes making up the image at `depth`, in depth-first
	/// order. Descent stops at leaves and at nodes of exactly `depth`.
	///
	/// Will return an `Err` if `depth` is larger than the tree's depth.
	pub fn collect_nodes_at_depth(&self, depth: u32) -> Result<Vec<&QuadtreeNode>, DrawError> {
		self.check_depth(depth)?;
		let mut nodes = Vec::new();
		self.root().collect_at_depth(depth, &mut nodes);
		Ok(nodes)
	}

	/// Flattens the tree into an image the size of the source, painting
	/// each node from `collect_nodes_at_depth` as a solid rectangle of its
	/// color over a black background.
	///
	/// Will return an `Err` if `depth` is larger than the tree's depth.
	pub fn render_at_depth(&self, depth: u32) -> Result<RgbImage, DrawError> {
		self.check_depth(depth)?;
		let mut img = RgbImage::from_pixel(self.width(), self.height(), Rgb([0; 3]));
		for node in self.collect_nodes_at_depth(depth)? {
			node.paint(&mut img);
		}
		Ok(img)
	}

	fn check_depth(&self, depth: u32) -> Result<(), DrawError> {
		if depth > self.max_depth() {
			return Err(DrawError::InvalidDepth { requested: depth, max: self.max_depth() });
		}
		Ok(())
	}
}
