//! Raw bit extraction from the sampled cell grid: zigzag traversal, data
//! mask removal, and the reserved-cell map that keeps function patterns out
//! of the codeword stream.

use crate::models::ExtractedCode;

use super::datastream::Datastream;
use super::tables;

/// The eight standard data mask formulas, selected by format info.
/// `i` is the row (y), `j` the column (x).
pub(crate) fn mask_bit(mask: u8, i: usize, j: usize) -> bool {
    match mask {
        0 => (i + j) % 2 == 0,
        1 => i % 2 == 0,
        2 => j % 3 == 0,
        3 => (i + j) % 3 == 0,
        4 => (i / 2 + j / 3) % 2 == 0,
        5 => (i * j) % 2 + (i * j) % 3 == 0,
        6 => ((i * j) % 2 + (i * j) % 3) % 2 == 0,
        7 => ((i * j) % 3 + (i + j) % 2) % 2 == 0,
        _ => false,
    }
}

/// True if module (row i, column j) belongs to a function pattern (finder,
/// separator, format, timing, alignment, or version info) and therefore
/// carries no data.
pub(crate) fn reserved_cell(version: u8, i: usize, j: usize) -> bool {
    let size = version as usize * 4 + 17;

    // Finder + format areas in three corners
    if i < 9 && j < 9 {
        return true;
    }
    if i + 8 >= size && j < 9 {
        return true;
    }
    if i < 9 && j + 8 >= size {
        return true;
    }

    // Timing lines
    if i == 6 || j == 6 {
        return true;
    }

    // Version info blocks sit next to the top-right and bottom-left finders
    if version >= 7 {
        if i < 6 && j + 11 >= size {
            return true;
        }
        if i + 11 >= size && j < 6 {
            return true;
        }
    }

    // Alignment patterns: a 5x5 block around each center, except the three
    // positions that would collide with finders.
    let (apat, count) = tables::alignment_positions(version);
    let mut ai = None;
    let mut aj = None;
    for (a, &p) in apat[..count].iter().enumerate() {
        if p.abs_diff(i) < 3 {
            ai = Some(a);
        }
        if p.abs_diff(j) < 3 {
            aj = Some(a);
        }
    }

    if let (Some(ai), Some(aj)) = (ai, aj) {
        let last = count - 1;
        if ai > 0 && ai < last {
            return true;
        }
        if aj > 0 && aj < last {
            return true;
        }
        if ai == last && aj == last {
            return true;
        }
    }

    false
}

/// Walk the standard two-column zigzag over all data modules, strip the data
/// mask, and append each bit to the datastream's raw codeword buffer.
pub(crate) fn read_data(code: &ExtractedCode, version: u8, mask: u8, ds: &mut Datastream) {
    let size = code.size as i32;
    let mut y = size - 1;
    let mut x = size - 1;
    let mut dir = -1i32;

    while x > 0 {
        if x == 6 {
            x -= 1;
        }

        if !reserved_cell(version, y as usize, x as usize) {
            read_bit(code, mask, ds, y as usize, x as usize);
        }
        if !reserved_cell(version, y as usize, x as usize - 1) {
            read_bit(code, mask, ds, y as usize, x as usize - 1);
        }

        y += dir;
        if y < 0 || y >= size {
            dir = -dir;
            x -= 2;
            y += dir;
        }
    }
}

fn read_bit(code: &ExtractedCode, mask: u8, ds: &mut Datastream, i: usize, j: usize) {
    let mut v = code.cell(j, i);
    if mask_bit(mask, i, j) {
        v = !v;
    }
    ds.push_raw_bit(v);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_formulas() {
        // Checkerboard
        assert!(mask_bit(0, 0, 0));
        assert!(!mask_bit(0, 0, 1));
        assert!(mask_bit(0, 1, 1));
        // Row stripes
        assert!(mask_bit(1, 0, 5));
        assert!(!mask_bit(1, 1, 5));
        // Column thirds
        assert!(mask_bit(2, 4, 0));
        assert!(mask_bit(2, 4, 3));
        assert!(!mask_bit(2, 4, 4));
        assert!(mask_bit(7, 0, 0));
    }

    #[test]
    fn test_reserved_corners_and_timing() {
        // Version 1: finder/format corners and the timing lines
        assert!(reserved_cell(1, 0, 0));
        assert!(reserved_cell(1, 8, 8));
        assert!(reserved_cell(1, 0, 13));
        assert!(reserved_cell(1, 13, 0));
        assert!(reserved_cell(1, 6, 10));
        assert!(reserved_cell(1, 10, 6));
        assert!(!reserved_cell(1, 9, 9));
        assert!(!reserved_cell(1, 20, 9));
    }

    #[test]
    fn test_reserved_alignment_and_version() {
        // Version 2: alignment pattern centered at (18, 18)
        assert!(reserved_cell(2, 18, 18));
        assert!(reserved_cell(2, 16, 16));
        assert!(reserved_cell(2, 20, 20));
        assert!(!reserved_cell(2, 15, 15));
        // Version 7 adds version-info blocks
        assert!(reserved_cell(7, 0, 34));
        assert!(reserved_cell(7, 34, 0));
        assert!(!reserved_cell(6, 0, 30));
    }

    #[test]
    fn test_version1_data_bit_count() {
        // A version 1 symbol carries exactly 26 codewords of data+ECC.
        let mut count = 0;
        for i in 0..21 {
            for j in 0..21 {
                if !reserved_cell(1, i, j) {
                    count += 1;
                }
            }
        }
        assert_eq!(count, 26 * 8);
    }
}
