//! Core data structures shared between the detector and the decoder.

pub mod code;
pub mod point;

pub use code::{DataType, Decoded, DecodedData, ECLevel, ExtractedCode};
pub use point::Point;

/// Highest supported symbol version (Model 2).
pub const MAX_VERSION: u8 = 40;

/// Cell bitmap bytes needed for the largest supported symbol (177x177).
pub const MAX_BITMAP: usize = (177 * 177 + 7) / 8;

/// Payload capacity in bytes, sized for a version-40 low-ECC symbol.
pub const MAX_PAYLOAD: usize = 8896;

/// Connected-component budget per frame. Region labels live in the one-byte
/// pixel buffer, so codes run 2..=255.
pub const MAX_REGIONS: usize = 254;

/// Finder-pattern budget per frame.
pub const MAX_CAPSTONES: usize = 32;

/// Candidate-symbol budget per frame.
pub const MAX_GRIDS: usize = 8;
