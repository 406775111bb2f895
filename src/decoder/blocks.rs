//! Reed-Solomon block correction over GF(256) and codeword de-interleaving.

use crate::error::DecodeError;
use crate::models::ECLevel;

use super::datastream::Datastream;
use super::galois::{GF256, MAX_POLY, berlekamp_massey, poly_eval};
use super::tables::{self, RsParams};

/// Syndromes S0..S(npar-1) of one block, evaluated at alpha^0 upward.
/// Codewords are stored most-significant-coefficient first. Returns true if
/// any syndrome is nonzero.
fn block_syndromes(data: &[u8], bs: usize, npar: usize, s: &mut [u8; MAX_POLY]) -> bool {
    let mut nonzero = false;
    s.fill(0);

    for i in 0..npar {
        for j in 0..bs {
            let c = data[bs - j - 1];
            if c != 0 {
                s[i] ^= GF256.exp[(GF256.log[c as usize] as usize + i * j) % 255];
            }
        }
        if s[i] != 0 {
            nonzero = true;
        }
    }

    nonzero
}

/// Error-evaluator polynomial: omega = s * sigma mod x^npar.
fn eloc_poly(omega: &mut [u8; MAX_POLY], s: &[u8; MAX_POLY], sigma: &[u8; MAX_POLY], npar: usize) {
    omega.fill(0);

    for i in 0..npar {
        let a = sigma[i];
        if a == 0 {
            continue;
        }
        let log_a = GF256.log[a as usize] as usize;
        for j in 0..MAX_POLY - 1 {
            if i + j >= npar {
                break;
            }
            let b = s[j + 1];
            if b != 0 {
                omega[i + j] ^= GF256.exp[(log_a + GF256.log[b as usize] as usize) % 255];
            }
        }
    }
}

/// Correct one Reed-Solomon block in place. `ecc.bs`/`ecc.dw` describe this
/// block's actual geometry (already adjusted for large blocks).
pub(crate) fn correct_block(data: &mut [u8], ecc: &RsParams) -> Result<(), DecodeError> {
    let npar = ecc.bs - ecc.dw;
    let mut s = [0u8; MAX_POLY];

    if !block_syndromes(data, ecc.bs, npar, &mut s) {
        return Ok(());
    }

    let mut sigma = [0u8; MAX_POLY];
    berlekamp_massey(&s, npar, &GF256, &mut sigma);

    // Formal derivative of sigma: odd-power coefficients shift down one.
    let mut sigma_deriv = [0u8; MAX_POLY];
    let mut i = 0;
    while i + 1 < MAX_POLY {
        sigma_deriv[i] = sigma[i + 1];
        i += 2;
    }

    let mut omega = [0u8; MAX_POLY];
    eloc_poly(&mut omega, &s, &sigma, npar - 1);

    // Every codeword index is a candidate error position; a root of sigma at
    // the matching inverse locates an actual error.
    for i in 0..ecc.bs {
        let xinv = GF256.exp[255 - i % 255];
        if poly_eval(&sigma, xinv, &GF256) == 0 {
            let sd_x = poly_eval(&sigma_deriv, xinv, &GF256);
            if sd_x == 0 {
                return Err(DecodeError::DataEcc);
            }
            let omega_x = poly_eval(&omega, xinv, &GF256);
            let error = GF256.div(omega_x, sd_x);
            data[ecc.bs - i - 1] ^= error;
        }
    }

    if block_syndromes(data, ecc.bs, npar, &mut s) {
        return Err(DecodeError::DataEcc);
    }

    Ok(())
}

/// De-interleave the raw codeword stream into per-block runs, correct each
/// block, and concatenate the corrected data words back into the stream
/// buffer the segment decoders read.
pub(crate) fn codestream_ecc(
    version: u8,
    level: ECLevel,
    ds: &mut Datastream,
) -> Result<(), DecodeError> {
    let sb = tables::rs_params(version, level);
    let lb = RsParams {
        bs: sb.bs + 1,
        dw: sb.dw + 1,
        ns: 0,
    };

    let total = tables::total_codewords(version);
    let lb_count = (total - sb.bs * sb.ns) / (sb.bs + 1);
    let bc = lb_count + sb.ns;
    let ecc_offset = sb.dw * bc + lb_count;

    let mut dst_offset = 0usize;
    let mut block = [0u8; 256];

    for i in 0..bc {
        let ecc = if i < sb.ns { &sb } else { &lb };
        let num_ec = ecc.bs - ecc.dw;

        for j in 0..ecc.dw {
            block[j] = ds.raw[j * bc + i];
        }
        for j in 0..num_ec {
            block[ecc.dw + j] = ds.raw[ecc_offset + j * bc + i];
        }

        correct_block(&mut block[..ecc.bs], ecc)?;

        ds.data[dst_offset..dst_offset + ecc.dw].copy_from_slice(&block[..ecc.dw]);
        dst_offset += ecc.dw;
    }

    ds.data_bits = dst_offset * 8;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encoder counterpart used only by tests: append `num_ecc` parity bytes
    /// generated from roots alpha^0..alpha^(num_ecc-1), matching the
    /// decoder's syndrome convention.
    pub(crate) fn rs_encode(data: &[u8], num_ecc: usize) -> Vec<u8> {
        // Build the generator polynomial, low-order coefficient first.
        let mut gpoly = vec![0u8; num_ecc + 1];
        gpoly[0] = 1;
        for i in 0..num_ecc {
            let root = GF256.exp[i];
            for j in (1..=i + 1).rev() {
                gpoly[j] = gpoly[j - 1] ^ GF256.mul(gpoly[j], root);
            }
            gpoly[0] = GF256.mul(gpoly[0], root);
        }

        // Reverse the non-leading coefficients for descending-order division.
        let mut gpoly_div: Vec<u8> = gpoly[0..num_ecc].to_vec();
        gpoly_div.reverse();

        let mut remainder = vec![0u8; num_ecc];
        for &d in data {
            let factor = d ^ remainder[0];
            for j in 0..num_ecc - 1 {
                remainder[j] = remainder[j + 1];
            }
            remainder[num_ecc - 1] = 0;
            for j in 0..num_ecc {
                remainder[j] ^= GF256.mul(gpoly_div[j], factor);
            }
        }

        let mut codeword = data.to_vec();
        codeword.extend_from_slice(&remainder);
        codeword
    }

    fn params(bs: usize, dw: usize) -> RsParams {
        RsParams { bs, dw, ns: 1 }
    }

    #[test]
    fn test_clean_block_passes() {
        let data = [0x10, 0x20, 0x30, 0x40, 0x55, 0x01];
        let mut codeword = rs_encode(&data, 10);
        assert!(correct_block(&mut codeword, &params(16, 6)).is_ok());
        assert_eq!(&codeword[..6], &data);
    }

    #[test]
    fn test_corrects_at_the_bound() {
        // bs=26, dw=19: 7 parity bytes correct floor(7/2) = 3 errors.
        let data: Vec<u8> = (0..19).map(|i| (i * 7 + 3) as u8).collect();
        let mut codeword = rs_encode(&data, 7);

        codeword[0] ^= 0xff;
        codeword[10] ^= 0x42;
        codeword[25] ^= 0x13;

        assert!(correct_block(&mut codeword, &params(26, 19)).is_ok());
        assert_eq!(&codeword[..19], &data[..]);
    }

    #[test]
    fn test_one_past_the_bound_fails() {
        let data: Vec<u8> = (0..19).map(|i| (i * 11 + 1) as u8).collect();
        let mut codeword = rs_encode(&data, 7);

        for &pos in &[1usize, 5, 12, 20] {
            codeword[pos] ^= 0xa5;
        }

        assert_eq!(
            correct_block(&mut codeword, &params(26, 19)),
            Err(DecodeError::DataEcc)
        );
    }

    #[test]
    fn test_interleaved_two_blocks() {
        // Version 3 Q: two blocks of 35 codewords, 17 data words each.
        let block_a: Vec<u8> = (0..17u8).collect();
        let block_b: Vec<u8> = (100..117u8).collect();
        let cw_a = rs_encode(&block_a, 18);
        let cw_b = rs_encode(&block_b, 18);

        let mut ds = Box::new(Datastream::new());
        let mut k = 0;
        for j in 0..35 {
            ds.raw[k] = cw_a[j];
            ds.raw[k + 1] = cw_b[j];
            k += 2;
        }

        // A couple of errors spread across both blocks.
        ds.raw[4] ^= 0x80;
        ds.raw[11] ^= 0x07;

        assert!(codestream_ecc(3, ECLevel::Q, &mut ds).is_ok());
        assert_eq!(&ds.data[..17], &block_a[..]);
        assert_eq!(&ds.data[17..34], &block_b[..]);
        assert_eq!(ds.data_bits, 34 * 8);
    }
}
