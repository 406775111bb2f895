//! qrscan - QR code detection and decoding with fixed memory bounds
//!
//! A pure Rust QR code engine built for constrained targets: one grayscale
//! frame in, decoded payloads and corner geometry out. All per-frame tables
//! (regions, capstones, candidate grids) have compile-time capacities and
//! are reset between captures rather than grown.
//!
//! ```
//! use qrscan::Scanner;
//!
//! let mut scanner = Scanner::new();
//! scanner.resize(640, 480);
//! let frame = scanner.begin();
//! // ... fill `frame` with grayscale pixels (one byte each) ...
//! frame.fill(255);
//! scanner.end(true);
//! for i in 0..scanner.count() {
//!     if let Ok(found) = scanner.decode(i) {
//!         println!("{:?} at {:?}", found.data.payload(), found.corners);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Symbol decoding (format info, error correction, payload segments)
pub mod decoder;
/// Status values returned by decoding
pub mod error;
/// Core data structures (Scanner results, points, capacity limits)
pub mod models;
/// Geometry helpers (perspective transforms)
pub mod utils;

mod debug;
mod detector;

pub use decoder::decode;
pub use error::DecodeError;
pub use models::{DataType, Decoded, DecodedData, ECLevel, ExtractedCode, Point};

use detector::finder::Capstone;
use detector::grid::Grid;
use detector::region::Region;
use detector::{finder, grid, region, threshold};
use models::{MAX_CAPSTONES, MAX_GRIDS, MAX_REGIONS};

/// The detection engine. Owns the frame buffers and the per-frame region,
/// capstone, and grid tables.
///
/// A scanner instance is not reentrant: detection and decoding must not run
/// concurrently on the same instance. One call processes one frame to
/// completion.
pub struct Scanner {
    pub(crate) width: usize,
    pub(crate) height: usize,
    /// Grayscale input, untouched by detection (so an inverted second pass
    /// can rethreshold it).
    pub(crate) image: Vec<u8>,
    /// Label buffer: 0 white, 1 black, 2.. region codes.
    pub(crate) pixels: Vec<u8>,
    pub(crate) regions: Vec<Region>,
    pub(crate) capstones: Vec<Capstone>,
    pub(crate) grids: Vec<Grid>,
}

impl Scanner {
    /// Create an engine with no frame storage. Call [`Scanner::resize`]
    /// before use.
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            image: Vec::new(),
            pixels: Vec::new(),
            regions: Vec::with_capacity(MAX_REGIONS),
            capstones: Vec::with_capacity(MAX_CAPSTONES),
            grids: Vec::with_capacity(MAX_GRIDS),
        }
    }

    /// (Re)allocate frame storage for the given dimensions. Must be called
    /// before the first frame and again whenever the dimensions change.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.image = vec![0; width * height];
        self.pixels = vec![0; width * height];
        self.reset_frame();
    }

    /// Frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Start a new frame: clears the per-frame tables and hands out the
    /// writable grayscale buffer (one byte per pixel, row-major, dark low).
    pub fn begin(&mut self) -> &mut [u8] {
        self.reset_frame();
        &mut self.image
    }

    /// Run thresholding and detection on the current frame. If no candidate
    /// grids were found and `try_inverted` is set, the whole detection pass
    /// is repeated with inverted thresholding to catch light-on-dark
    /// symbols.
    pub fn end(&mut self, try_inverted: bool) {
        self.identify(false);
        if self.grids.is_empty() && try_inverted {
            self.reset_frame();
            self.identify(true);
        }
    }

    /// Number of candidate grids found by the last [`Scanner::end`].
    pub fn count(&self) -> usize {
        self.grids.len()
    }

    /// Sample candidate grid `index` into an [`ExtractedCode`]: corner
    /// geometry plus the raw cell bitmap, before any error correction.
    pub fn extract(&self, index: usize) -> Result<ExtractedCode, DecodeError> {
        if index >= self.grids.len() {
            return Err(DecodeError::InvalidGridSize);
        }

        let qr = &self.grids[index];
        let size = qr.grid_size;
        let span = size as f64;

        let mut code = ExtractedCode {
            corners: [
                qr.c.map(0.0, 0.0),
                qr.c.map(span, 0.0),
                qr.c.map(span, span),
                qr.c.map(0.0, span),
            ],
            size,
            ..ExtractedCode::default()
        };

        let mut i = 0usize;
        for y in 0..size {
            for x in 0..size {
                if grid::read_cell(self, index, x, y) > 0 {
                    code.cell_bitmap[i >> 3] |= 1 << (i & 7);
                }
                i += 1;
            }
        }

        Ok(code)
    }

    /// Extract and fully decode candidate grid `index`.
    pub fn decode(&self, index: usize) -> Result<Decoded, DecodeError> {
        let code = self.extract(index)?;
        let data = decoder::decode(&code)?;
        Ok(Decoded {
            corners: code.corners,
            data,
        })
    }

    pub(crate) fn region(&self, code: usize) -> &Region {
        &self.regions[code - region::PIXEL_REGION as usize]
    }

    pub(crate) fn region_mut(&mut self, code: usize) -> &mut Region {
        &mut self.regions[code - region::PIXEL_REGION as usize]
    }

    fn reset_frame(&mut self) {
        self.regions.clear();
        self.capstones.clear();
        self.grids.clear();
    }

    fn identify(&mut self, inverted: bool) {
        if self.width == 0 || self.height == 0 {
            return;
        }

        threshold::binarize(&self.image, &mut self.pixels, self.width, self.height, inverted);

        for y in 0..self.height {
            finder::finder_scan(self, y);
        }

        for i in 0..self.capstones.len() {
            grid::test_grouping(self, i);
        }

        if debug::debug_enabled() {
            eprintln!(
                "IDENTIFY: inverted={} regions={} capstones={} grids={}",
                inverted,
                self.regions.len(),
                self.capstones.len(),
                self.grids.len()
            );
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan a single grayscale buffer end to end.
///
/// Convenience wrapper over [`Scanner`]: thresholds, detects, and decodes up
/// to `max_results` symbols. Candidates that fail to decode are skipped
/// silently; set `try_inverted` to retry detection with inverted
/// thresholding when nothing is found.
pub fn decode_grayscale(
    gray: &[u8],
    width: usize,
    height: usize,
    max_results: usize,
    try_inverted: bool,
) -> Vec<Decoded> {
    assert!(gray.len() >= width * height, "buffer smaller than dimensions");

    let mut scanner = Scanner::new();
    scanner.resize(width, height);
    scanner.begin().copy_from_slice(&gray[..width * height]);
    scanner.end(try_inverted);

    let mut results = Vec::new();
    for i in 0..scanner.count() {
        if results.len() >= max_results {
            break;
        }
        if let Ok(found) = scanner.decode(i) {
            results.push(found);
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame() {
        let mut scanner = Scanner::new();
        scanner.resize(32, 32);
        scanner.begin().fill(255);
        scanner.end(true);
        assert_eq!(scanner.count(), 0);
    }

    #[test]
    fn test_decode_index_out_of_range() {
        let mut scanner = Scanner::new();
        scanner.resize(32, 32);
        scanner.begin().fill(128);
        scanner.end(false);
        assert_eq!(scanner.decode(0).unwrap_err(), DecodeError::InvalidGridSize);
    }

    #[test]
    fn test_decode_grayscale_flat_image() {
        let gray = vec![200u8; 64 * 64];
        assert!(decode_grayscale(&gray, 64, 64, 8, true).is_empty());
    }

    #[test]
    fn test_resize_between_frames() {
        let mut scanner = Scanner::new();
        scanner.resize(16, 16);
        assert_eq!(scanner.begin().len(), 256);
        scanner.resize(32, 8);
        assert_eq!(scanner.begin().len(), 256);
        assert_eq!((scanner.width(), scanner.height()), (32, 8));
    }
}
