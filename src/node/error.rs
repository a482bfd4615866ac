use thiserror::Error;

/// Reason why a quadtree couldn't be rendered to an image buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
	/// The requested depth lies below the deepest leaf of the tree.
	#[error("depth {requested} is larger than the tree's depth of {max}")]
	InvalidDepth { requested: u32, max: u32 },
}

/// Reason why an image couldn't be turned into a quadtree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
	/// The error threshold is negative or not a number. Such a threshold
	/// would keep splitting regions that can't get any more exact.
	#[error("error threshold must be a non-negative number, got {0}")]
	InvalidThreshold(f64),
}
