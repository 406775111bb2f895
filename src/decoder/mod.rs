//! Symbol decoding: format info, Reed-Solomon block correction, and the
//! typed-segment payload decoder. Everything here works on an
//! [`ExtractedCode`] sampled by the detector; no image access remains.

pub(crate) mod bitstream;
pub(crate) mod blocks;
pub(crate) mod datastream;
pub(crate) mod format;
pub(crate) mod galois;
pub(crate) mod tables;

use crate::error::DecodeError;
use crate::models::{DecodedData, ExtractedCode, MAX_VERSION};

use datastream::Datastream;

/// Decode one extracted symbol into its payload.
///
/// Runs format-info correction (both redundant copies), data-bit sampling,
/// per-block Reed-Solomon correction, and segment decoding. Any failure is
/// scoped to this code; the caller can move on to the next candidate.
pub fn decode(code: &ExtractedCode) -> Result<DecodedData, DecodeError> {
    if code.size < 21 || (code.size - 17) % 4 != 0 {
        return Err(DecodeError::InvalidGridSize);
    }

    let version = ((code.size - 17) / 4) as u8;
    if version > MAX_VERSION {
        return Err(DecodeError::InvalidVersion);
    }

    // Two redundant format copies; only give up when both fail.
    let (ecc_level, mask) =
        format::read_format(code, 0).or_else(|_| format::read_format(code, 1))?;

    let mut ds = Box::new(Datastream::new());
    bitstream::read_data(code, version, mask, &mut ds);
    blocks::codestream_ecc(version, ecc_level, &mut ds)?;

    let mut data = DecodedData::new(version, ecc_level, mask);
    datastream::decode_payload(&mut data, &mut ds)?;

    Ok(data)
}
