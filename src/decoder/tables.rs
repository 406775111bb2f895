use crate::models::ECLevel;

/// Reed-Solomon geometry for the *small* blocks of one (version, level)
/// pairing. When the codewords don't divide evenly, the remaining blocks are
/// one byte larger in both block size and data-word count.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RsParams {
    /// Small-block size in codewords.
    pub bs: usize,
    /// Data codewords per small block.
    pub dw: usize,
    /// Number of small blocks.
    pub ns: usize,
}

// Tables from the QR Code specification (Model 2) via Nayuki QR Code generator.
// Index: [ec_level][version]
const ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

const NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Total codewords (data + ECC) per version.
const TOTAL_CODEWORDS: [u16; 41] = [
    0, 26, 44, 70, 100, 134, 172, 196, 242, 292, 346, 404, 466, 532, 581, 655, 733, 815, 901, 991,
    1085, 1156, 1258, 1364, 1474, 1588, 1706, 1828, 1921, 2051, 2185, 2323, 2465, 2611, 2761, 2876,
    3034, 3196, 3362, 3532, 3706,
];

/// Total codewords (data + ECC) carried by a symbol of this version.
pub(crate) fn total_codewords(version: u8) -> usize {
    TOTAL_CODEWORDS[version as usize] as usize
}

/// Small-block Reed-Solomon parameters for a (version, level) pairing.
pub(crate) fn rs_params(version: u8, level: ECLevel) -> RsParams {
    let idx = level as usize;
    let v = version as usize;
    let total = TOTAL_CODEWORDS[v] as usize;
    let ecc = ECC_CODEWORDS_PER_BLOCK[idx][v] as usize;
    let bc = NUM_ERROR_CORRECTION_BLOCKS[idx][v] as usize;
    let bs = total / bc;
    RsParams {
        bs,
        dw: bs - ecc,
        ns: bc - total % bc,
    }
}

/// Alignment pattern center coordinates for a version, returned as a fixed
/// buffer plus the number of valid entries (at most 7, for version 40).
pub(crate) fn alignment_positions(version: u8) -> ([usize; 7], usize) {
    let mut apat = [0usize; 7];
    if version < 2 {
        return (apat, 0);
    }
    let v = version as usize;
    let num = v / 7 + 2;
    let size = v * 4 + 17;
    let step = (v * 8 + num * 3 + 5) / (num * 4 - 4) * 2;
    apat[0] = 6;
    let mut pos = size - 7;
    for i in (1..num).rev() {
        apat[i] = pos;
        pos -= step;
    }
    (apat, num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rs_params_version1() {
        let p = rs_params(1, ECLevel::L);
        assert_eq!((p.bs, p.dw, p.ns), (26, 19, 1));
        let p = rs_params(1, ECLevel::H);
        assert_eq!((p.bs, p.dw, p.ns), (26, 9, 1));
    }

    #[test]
    fn test_rs_params_split_blocks() {
        // Version 5 Q: blocks of 33 codewords, two small with 15 data words,
        // two large with 16.
        let p = rs_params(5, ECLevel::Q);
        assert_eq!((p.bs, p.dw, p.ns), (33, 15, 2));
        // Total must still add up once the large blocks are counted.
        let large = 4 - p.ns;
        assert_eq!(p.bs * p.ns + (p.bs + 1) * large, total_codewords(5));
    }

    #[test]
    fn test_rs_params_totals_consistent() {
        for version in 1..=40u8 {
            for level in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
                let p = rs_params(version, level);
                let bc = NUM_ERROR_CORRECTION_BLOCKS[level as usize][version as usize] as usize;
                let large = bc - p.ns;
                assert_eq!(
                    p.bs * p.ns + (p.bs + 1) * large,
                    total_codewords(version),
                    "v{} {:?}",
                    version,
                    level
                );
                assert!(p.dw > 0, "v{} {:?}", version, level);
            }
        }
    }

    #[test]
    fn test_alignment_positions() {
        assert_eq!(alignment_positions(1).1, 0);

        let (apat, n) = alignment_positions(2);
        assert_eq!(&apat[..n], &[6, 18]);

        let (apat, n) = alignment_positions(7);
        assert_eq!(&apat[..n], &[6, 22, 38]);

        // Version 32 has the one irregular spacing in the standard table.
        let (apat, n) = alignment_positions(32);
        assert_eq!(&apat[..n], &[6, 34, 60, 86, 112, 138]);

        let (apat, n) = alignment_positions(40);
        assert_eq!(&apat[..n], &[6, 30, 58, 86, 114, 142, 170]);
    }
}
