use image::error::ImageError;

use quadtree_jpg::error::{CompressError, ContainerError, DecompressError};
use quadtree_jpg::{CancellationToken, CompressConfig, Compressor, RasterFormat};

use std::str::FromStr;

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

/// Parses an optional numeric flag, exiting with code 2 if it is malformed.
fn numeric_arg<T: FromStr>(matches: &clap::ArgMatches<'_>, name: &str, default: T) -> T {
	match matches.value_of(name) {
		Some(v) => v.parse().unwrap_or_else(|_| error_exit(&format!("Non-numeric value for {}", name), 2)),
		None => default,
	}
}

fn build_config(matches: &clap::ArgMatches<'_>) -> CompressConfig {
	let defaults = CompressConfig::default();
	let grid = match matches.value_of("grid") {
		Some(g) => match g.split_once('x').map(|(c, r)| (c.parse(), r.parse())) {
			Some((Ok(c), Ok(r))) => (c, r),
			_ => error_exit("Grid must be given as COLUMNSxROWS", 2),
		},
		None => (defaults.grid_columns, defaults.grid_rows),
	};
	let format = if matches.is_present("lossless") { RasterFormat::Png } else { RasterFormat::Jpeg };
	defaults.clone()
		.with_grid(grid.0, grid.1)
		.with_workers(numeric_arg(matches, "workers", defaults.workers))
		.with_error_threshold(numeric_arg(matches, "threshold", defaults.build.error_threshold))
		.with_max_depth(numeric_arg(matches, "max-depth", defaults.build.max_depth))
		.with_depth_ceiling(numeric_arg(matches, "depth", defaults.depth.ceiling))
		.with_jpeg_quality(numeric_arg(matches, "quality", defaults.jpeg_quality))
		.with_format(format)
}

/// Default output path: the input with its extension swapped.
fn default_output(input_path: &str, extension: &str) -> String {
	input_path.rsplitn(2, '.').last().unwrap_or(input_path).to_string() + extension
}

/// `clap`-based CLI for quadtree-compressed files.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image data
///
/// 5: computation limits exceeded
///
/// 10: other, potentially unknown error
fn main() {
	env_logger::init();

	let clap_matches = clap::App::new("quadtree_jpg")
		.version(env!("CARGO_PKG_VERSION"))
		.author("vkcz")
		.about("Compresses images by quadtree flattening into a framed JPEG container (QTJ).")
		.arg_from_usage("-i, --into 'Compress the input file from PNG or JFIF to QTJ'")
		.arg_from_usage("-f, --from 'Decompress the input file from QTJ to PNG'")
		.arg_from_usage("-t, --threshold=[N] 'Maximum color error of an unsplit region (--into only); defaults to 6.0'")
		.arg_from_usage("-g, --grid=[CxR] 'Tile grid as columns x rows (--into only); defaults to 2x2'")
		.arg_from_usage("-w, --workers=[N] 'Number of tile worker threads (--into only); defaults to 4'")
		.arg_from_usage("-d, --depth=[N] 'Ceiling on the render depth of each tile (--into only); defaults to 8'")
		.arg_from_usage("-m, --max-depth=[N] 'Depth cap while building tile quadtrees (--into only); defaults to 1024'")
		.arg_from_usage("-q, --quality=[N] 'JPEG quality from 1 to 100 (--into only); defaults to 75'")
		.arg_from_usage("-l, --lossless 'Store the flattened image as PNG instead of JPEG (--into only)'")
		.arg_from_usage("<INPUT> 'Path to input file'")
		.arg_from_usage("[OUTPUT] 'Path to output file; defaults to INPUT with a modified file extension'")
		.get_matches();

	let (into, from) = (clap_matches.is_present("into"), clap_matches.is_present("from"));
	let input_path = clap_matches.value_of("INPUT").unwrap_or_else(|| error_exit("Missing input", 2));
	match (into, from) {
		(true, true) => error_exit("Only one of -i/--into and -f/--from must be present", 2),
		(true, false) => {
			let source = match image::open(input_path) {
				Ok(i) => i,
				Err(e) => {
					let (msg, code) = match e {
						ImageError::Decoding(_) | ImageError::Unsupported(_) => ("Invalid image data", 4),
						ImageError::Limits(_) => ("Computation limits exceeded", 5),
						ImageError::IoError(_) => ("File not found or could not be read", 3),
						_ => ("An error occurred", 10)
					};
					error_exit(msg, code)
				}
			}.to_rgb8();
			let compressor = Compressor::new(build_config(&clap_matches));
			let data = match compressor.compress_to_vec(&source, &CancellationToken::new()) {
				Ok(d) => d,
				Err(e) => {
					let code = match e {
						CompressError::Config(_) => 2,
						CompressError::Container(_) => 4,
						CompressError::Io { .. } => 3,
						_ => 10
					};
					error_exit(&format!("Compression failed: {}", error_chain(&e)), code)
				}
			};
			let output = clap_matches.value_of("OUTPUT").map(str::to_string)
				.unwrap_or_else(|| default_output(input_path, ".qtj"));
			if std::fs::write(&output, &data).is_err() {
				error_exit("Could not write to output file", 3)
			}
		},
		(false, true) => {
			let output = match quadtree_jpg::decompress_image(input_path) {
				Ok(img) => img,
				Err(DecompressError::Io { .. }) => error_exit("File not found or could not be read", 3),
				Err(DecompressError::Format(ContainerError::Decode(ImageError::Limits(_)))) =>
					error_exit("Computation limits exceeded", 5),
				Err(DecompressError::Format(_)) => error_exit("Invalid image data", 4),
			};
			match output.save(clap_matches.value_of("OUTPUT").map(str::to_string)
				.unwrap_or_else(|| default_output(input_path, ".png"))) {
				Ok(_) => (),
				Err(_) => error_exit("Could not save output", 3)
			}
		},
		(false, false) => error_exit("One of -i/--into and -f/--from must be present", 2)
	}
}

/// Joins an error and its sources into one line.
fn error_chain(e: &dyn std::error::Error) -> String {
	let mut msg = e.to_string();
	let mut source = e.source();
	while let Some(s) = source {
		msg.push_str(": ");
		msg.push_str(&s.to_string());
		source = s.source();
	}
	msg
}
