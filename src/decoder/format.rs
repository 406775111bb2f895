//! Format-info reading and BCH(15,5) correction over GF(16).

use crate::error::DecodeError;
use crate::models::{ECLevel, ExtractedCode};

use super::galois::{GF16, MAX_POLY, berlekamp_massey, poly_eval};

/// XOR mask applied to the 15 format bits before encoding.
const FORMAT_MASK: u16 = 0x5412;

/// Up to 3 bit errors are correctable, driven by syndromes S1..S6.
const FORMAT_SYNDROMES: usize = 6;

/// Read one of the two redundant format-info locations and run it through
/// the BCH corrector. `which` 0 is the copy around the top-left capstone;
/// 1 is the copy split between the top-right and bottom-left capstones.
pub(crate) fn read_format(
    code: &ExtractedCode,
    which: usize,
) -> Result<(ECLevel, u8), DecodeError> {
    let mut format: u16 = 0;

    if which != 0 {
        for i in 0..7 {
            format = (format << 1) | code.cell(8, code.size - 1 - i) as u16;
        }
        for i in 0..8 {
            format = (format << 1) | code.cell(code.size - 8 + i, 8) as u16;
        }
    } else {
        const XS: [usize; 15] = [8, 8, 8, 8, 8, 8, 8, 8, 7, 5, 4, 3, 2, 1, 0];
        const YS: [usize; 15] = [0, 1, 2, 3, 4, 5, 7, 8, 8, 8, 8, 8, 8, 8, 8];
        for i in (0..15).rev() {
            format = (format << 1) | code.cell(XS[i], YS[i]) as u16;
        }
    }

    format ^= FORMAT_MASK;

    let corrected = correct_format(format)?;
    let fdata = (corrected >> 10) as u8;
    Ok((ECLevel::from_format_bits(fdata >> 3), fdata & 7))
}

/// Correct up to 3 bit errors in a 15-bit format codeword.
pub(crate) fn correct_format(word: u16) -> Result<u16, DecodeError> {
    let mut u = word;
    let mut s = [0u8; MAX_POLY];

    // A zero syndrome vector means the codeword is already clean.
    if !format_syndromes(u, &mut s) {
        return Ok(u);
    }

    let mut sigma = [0u8; MAX_POLY];
    berlekamp_massey(&s, FORMAT_SYNDROMES, &GF16, &mut sigma);

    // Each root of sigma locates one bad bit.
    for i in 0..15 {
        if poly_eval(&sigma, GF16.exp[15 - i], &GF16) == 0 {
            u ^= 1 << i;
        }
    }

    if format_syndromes(u, &mut s) {
        return Err(DecodeError::FormatEcc);
    }

    Ok(u)
}

/// Evaluate the codeword at alpha^1..alpha^6. Returns true if any syndrome
/// is nonzero (errors present).
fn format_syndromes(u: u16, s: &mut [u8; MAX_POLY]) -> bool {
    let mut nonzero = false;
    s.fill(0);

    for i in 0..FORMAT_SYNDROMES {
        for j in 0..15 {
            if u & (1 << j) != 0 {
                s[i] ^= GF16.exp[((i + 1) * j) % 15];
            }
        }
        if s[i] != 0 {
            nonzero = true;
        }
    }

    nonzero
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode the 5 format data bits into a clean 15-bit BCH codeword
    /// (before the XOR mask), by polynomial division with g = 0x537.
    fn encode_format(data5: u16) -> u16 {
        let mut v = data5 << 10;
        for shift in (10..=14).rev() {
            if (v >> shift) & 1 == 1 {
                v ^= 0x537 << (shift - 10);
            }
        }
        (data5 << 10) | (v & 0x3ff)
    }

    #[test]
    fn test_clean_word_passes() {
        let w = encode_format(0b01000);
        assert_eq!(correct_format(w).unwrap(), w);
    }

    #[test]
    fn test_corrects_up_to_three_errors() {
        let w = encode_format(0b10101);
        for flips in [[0usize, 14, 14], [3, 7, 12], [0, 1, 2]] {
            let mut bad = w;
            for &b in &flips {
                bad ^= 1 << b;
            }
            // Duplicate flips cancel, so these cases cover 1..=3 errors.
            assert_eq!(correct_format(bad).unwrap(), w, "flips {:?}", flips);
        }
    }

    #[test]
    fn test_four_errors_rejected() {
        let w = encode_format(0b00110);
        let bad = w ^ 0b1111;
        // Four flipped bits are beyond the corrector. Either it reports
        // failure, or it "corrects" into some other valid codeword; what it
        // must never do is return the original.
        if let Ok(fixed) = correct_format(bad) {
            assert_ne!(fixed, w);
        }
    }
}
