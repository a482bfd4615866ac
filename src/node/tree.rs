use image::RgbImage;

use super::error::BuildError;
use super::{QuadtreeNode, Region};

/// Default maximum error a region may have while still being a leaf.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 6.0;

/// Default depth cap; generous enough that the error threshold, not the
/// cap, normally decides where splitting stops.
pub const DEFAULT_MAX_DEPTH: u32 = 1024;

/// Parameters deciding when a node stops splitting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildParams {
	/// Nodes with an error at or below this become leaves.
	pub error_threshold: f64,
	/// Nodes at or below this depth become leaves.
	pub max_depth: u32,
}

impl BuildParams {
	pub fn new(error_threshold: f64, max_depth: u32) -> Self {
		BuildParams { error_threshold, max_depth }
	}

	pub fn validate(&self) -> Result<(), BuildError> {
		// Also rejects NaN.
		if !(self.error_threshold >= 0.) {
			return Err(BuildError::InvalidThreshold(self.error_threshold));
		}
		Ok(())
	}
}

impl Default for BuildParams {
	fn default() -> Self {
		BuildParams::new(DEFAULT_ERROR_THRESHOLD, DEFAULT_MAX_DEPTH)
	}
}

/// A quadtree covering a whole image, built top-down by splitting every
/// region whose error is above the threshold.
///
/// Once built, a `Quadtree` is read-only.
#[derive(Clone, Debug)]
pub struct Quadtree {
	root: QuadtreeNode,
	width: u32,
	height: u32,
	params: BuildParams,
	max_depth: u32,
}

impl Quadtree {
	/// Analyzes `img` into a quadtree.
	///
	/// A node becomes a leaf if its depth has reached `params.max_depth`
	/// or its error is at most `params.error_threshold`; otherwise it is
	/// split into four and each quadrant is analyzed in turn.
	pub fn build(img: &RgbImage, params: BuildParams) -> Result<Self, BuildError> {
		params.validate()?;
		let region = Region::from_size(img.width(), img.height());
		let mut root = QuadtreeNode::new(img, region, 0);
		let mut max_depth = 0;
		grow(img, &mut root, &params, &mut max_depth);
		Ok(Quadtree {
			root,
			width: img.width(),
			height: img.height(),
			params,
			max_depth,
		})
	}

	pub fn root(&self) -> &QuadtreeNode {
		&self.root
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn params(&self) -> &BuildParams {
		&self.params
	}

	/// Depth of the deepest leaf.
	pub fn max_depth(&self) -> u32 {
		self.max_depth
	}

	/// Iterates over every leaf, depth first, top-left quadrant first.
	pub fn leaves(&self) -> Leaves<'_> {
		Leaves { stack: vec![&self.root] }
	}

	pub fn leaf_count(&self) -> usize {
		self.leaves().count()
	}

	/// Number of nodes in the tree, branches included.
	pub fn node_count(&self) -> usize {
		let leaves = self.leaf_count();
		// Every branch has exactly four sections.
		leaves + (leaves - 1) / 3
	}
}

fn grow(img: &RgbImage, node: &mut QuadtreeNode, params: &BuildParams, reached: &mut u32) {
	if node.depth >= params.max_depth || node.error <= params.error_threshold {
		*reached = (*reached).max(node.depth);
		return;
	}
	node.split(img);
	if let Some(sections) = node.sections.as_mut() {
		for section in sections.iter_mut() {
			grow(img, section, params, reached);
		}
	}
}

/// Iterator over the leaves of a [`Quadtree`].
#[derive(Debug)]
pub struct Leaves<'a> {
	stack: Vec<&'a QuadtreeNode>,
}

impl<'a> Iterator for Leaves<'a> {
	type Item = &'a QuadtreeNode;

	fn next(&mut self) -> Option<Self::Item> {
		while let Some(node) = self.stack.pop() {
			match node.sections {
				Some(ref sects) => self.stack.extend(sects.iter().rev()),
				None => return Some(node),
			}
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::Rgb;

	const RED: Rgb<u8> = Rgb([255, 0, 0]);
	const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

	fn red_blue_quadrants() -> RgbImage {
		RgbImage::from_fn(4, 4, |x, y| if (x < 2) == (y < 2) { RED } else { BLUE })
	}

	fn noise(width: u32, height: u32) -> RgbImage {
		RgbImage::from_fn(width, height, |x, y| {
			let v = ((x * 7919 + y * 104_729) ^ (x * y * 31)) % 256;
			Rgb([v as u8, (255 - v) as u8, ((v * 3) % 256) as u8])
		})
	}

	fn check_shape(node: &QuadtreeNode, params: &BuildParams) {
		match node.sections {
			Some(ref sects) => {
				assert!(node.error > params.error_threshold, "split below threshold");
				assert!(node.depth < params.max_depth, "split at depth cap");
				let quads = node.region.split();
				for (section, quad) in sects.iter().zip(quads.iter()) {
					assert_eq!(section.region, *quad);
					assert_eq!(section.depth, node.depth + 1);
					check_shape(section, params);
				}
			},
			None => assert!(node.depth >= params.max_depth || node.error <= params.error_threshold),
		}
	}

	#[test]
	fn uniform_black_is_a_single_leaf() {
		let img = RgbImage::new(8, 8);
		let tree = Quadtree::build(&img, BuildParams::default()).unwrap();
		let root = tree.root();
		assert!(root.is_leaf());
		assert_eq!(root.depth, 0);
		assert_eq!(root.color, Rgb([0, 0, 0]));
		assert_eq!(root.error, 0.);
		assert_eq!(tree.max_depth(), 0);
	}

	#[test]
	fn uniform_color_is_a_leaf_for_any_positive_threshold() {
		let img = RgbImage::from_pixel(13, 7, Rgb([40, 200, 90]));
		for &threshold in &[0.001, 1., 6., 1000.] {
			let tree = Quadtree::build(&img, BuildParams::new(threshold, 1024)).unwrap();
			assert!(tree.root().is_leaf());
			assert_eq!(tree.root().error, 0.);
		}
	}

	#[test]
	fn red_blue_quadrants_split_once() {
		let tree = Quadtree::build(&red_blue_quadrants(), BuildParams::default()).unwrap();
		let root = tree.root();
		assert!(root.error > 0.);
		let sects = root.sections.as_ref().expect("root is split");
		let expected = [RED, BLUE, BLUE, RED];
		for (section, color) in sects.iter().zip(expected.iter()) {
			assert!(section.is_leaf());
			assert_eq!(section.error, 0.);
			assert_eq!(section.color, *color);
		}
		assert_eq!(tree.max_depth(), 1);
		assert_eq!(tree.leaf_count(), 4);
		assert_eq!(tree.node_count(), 5);
	}

	#[test]
	fn depth_cap_bounds_the_tree() {
		let img = noise(37, 23);
		for cap in 0..4 {
			let params = BuildParams::new(0., cap);
			let tree = Quadtree::build(&img, params).unwrap();
			assert!(tree.max_depth() <= cap);
			check_shape(tree.root(), &params);
		}
	}

	#[test]
	fn noisy_tree_is_well_formed() {
		let img = noise(19, 33);
		let params = BuildParams::default();
		let tree = Quadtree::build(&img, params).unwrap();
		check_shape(tree.root(), &params);
		let deepest = tree.leaves().map(|l| l.depth).max().unwrap();
		assert_eq!(deepest, tree.max_depth());
		let area: u64 = tree.leaves().map(|l| l.region.area()).sum();
		assert_eq!(area, 19 * 33);
	}

	#[test]
	fn zero_threshold_splits_to_uniform_leaves() {
		let img = noise(8, 8);
		let tree = Quadtree::build(&img, BuildParams::new(0., 1024)).unwrap();
		assert!(tree.leaves().all(|l| l.error == 0.));
	}

	#[test]
	fn empty_image_builds_a_leaf() {
		let tree = Quadtree::build(&RgbImage::new(0, 0), BuildParams::default()).unwrap();
		assert!(tree.root().is_leaf());
		assert_eq!(tree.max_depth(), 0);
	}

	#[test]
	fn invalid_threshold_is_rejected() {
		let img = RgbImage::new(2, 2);
		for &threshold in &[-1., std::f64::NAN] {
			let err = Quadtree::build(&img, BuildParams::new(threshold, 4)).unwrap_err();
			assert!(matches!(err, BuildError::InvalidThreshold(_)));
		}
	}
}
