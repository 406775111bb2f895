//! Finder-pattern ("capstone") detection using 1:1:3:1:1 run-length scanning.

use crate::Scanner;
use crate::models::{MAX_CAPSTONES, Point};
use crate::utils::perspective::Perspective;

use super::region::{PIXEL_BLACK, flood_fill, region_code};

/// One detected finder pattern: the black ring region, the black stone
/// region inside it, the ring's four corners, and a local 7x7 perspective
/// frame with its mapped center.
#[derive(Debug, Clone)]
pub(crate) struct Capstone {
    /// Region code of the outer black ring.
    pub ring: usize,
    /// Region code of the center stone.
    pub stone: usize,
    /// Ring corners, in rotational order. Index 0 is rotated to the
    /// grid-relative top-left once the capstone joins a grid.
    pub corners: [Point; 4],
    /// Image point of local (3.5, 3.5).
    pub center: Point,
    /// Maps local (u, v) in [0, 7]^2 onto the image.
    pub c: Perspective,
    /// Grid this capstone has been claimed by, if any.
    pub qr_grid: Option<usize>,
}

/// Scan one row for the dark/light run signature of a finder pattern. Keeps
/// a sliding window of the last 5 run lengths; each black-to-white
/// transition with enough history triggers the ratio test.
pub(crate) fn finder_scan(scanner: &mut Scanner, y: usize) {
    let width = scanner.width;
    let row_base = y * width;

    let mut last_color = false;
    let mut run_length = 0usize;
    let mut run_count = 0usize;
    let mut pace = [0usize; 5];

    for x in 0..width {
        let color = scanner.pixels[row_base + x] != 0;

        if x > 0 && color != last_color {
            pace.rotate_left(1);
            pace[4] = run_length;
            run_length = 0;
            run_count += 1;

            if !color && run_count >= 5 && ratio_test(&pace) {
                test_capstone(scanner, x, y, &pace);
            }
        }

        run_length += 1;
        last_color = color;
    }
}

/// 1:1:3:1:1 within a +/-75% band around the average outer run length. The
/// center run is excluded from the average it is compared against.
fn ratio_test(pace: &[usize; 5]) -> bool {
    const CHECK: [usize; 5] = [1, 1, 3, 1, 1];

    let avg = (pace[0] + pace[1] + pace[3] + pace[4]) / 4;
    let err = avg * 3 / 4;

    for i in 0..5 {
        if pace[i] + err < CHECK[i] * avg || pace[i] > CHECK[i] * avg + err {
            return false;
        }
    }

    true
}

/// Area plausibility: the stone should ideally be 37.5% of the ring's pixel
/// count; accept anywhere in [10%, 70%].
pub(crate) fn stone_ring_ratio_ok(stone_count: u32, ring_count: u32) -> bool {
    let ratio = stone_count as u64 * 100 / ring_count as u64;
    (10..=70).contains(&ratio)
}

/// Probe the candidate run pattern ending at white pixel `x`: both ring
/// edges must resolve to one region, the stone to another, neither already
/// claimed, and their areas must be plausible.
fn test_capstone(scanner: &mut Scanner, x: usize, y: usize, pace: &[usize; 5]) {
    let x = x as i32;
    let y = y as i32;
    let p = [
        pace[0] as i32,
        pace[1] as i32,
        pace[2] as i32,
        pace[3] as i32,
        pace[4] as i32,
    ];

    let ring_right = region_code(scanner, x - p[4], y);
    let stone = region_code(scanner, x - p[4] - p[3] - p[2] / 2, y);
    let ring_left = region_code(scanner, x - p[4] - p[3] - p[2] - p[1] - p[0] / 2, y);

    let (Some(ring_left), Some(ring_right), Some(stone)) = (ring_left, ring_right, stone) else {
        return;
    };

    // The ring must be one connected component sampled from both sides, and
    // the stone must be a separate component inside it.
    if ring_left != ring_right || ring_left == stone {
        return;
    }

    if scanner.region(stone).capstone.is_some() || scanner.region(ring_left).capstone.is_some() {
        return;
    }

    if !stone_ring_ratio_ok(scanner.region(stone).count, scanner.region(ring_left).count) {
        return;
    }

    record_capstone(scanner, ring_left, stone);
}

fn record_capstone(scanner: &mut Scanner, ring: usize, stone: usize) {
    if scanner.capstones.len() >= MAX_CAPSTONES {
        return;
    }
    let cs_index = scanner.capstones.len();

    let stone_seed = scanner.region(stone).seed;
    let corners = find_region_corners(scanner, ring, &stone_seed);

    scanner.region_mut(stone).capstone = Some(cs_index);
    scanner.region_mut(ring).capstone = Some(cs_index);

    let c = Perspective::from_quad(&corners, 7.0, 7.0);
    let center = c.map(3.5, 3.5);

    scanner.capstones.push(Capstone {
        ring,
        stone,
        corners,
        center,
        c,
        qr_grid: None,
    });

    if crate::debug::debug_enabled() {
        let cap = &scanner.capstones[cs_index];
        eprintln!(
            "CAPSTONE: {} ring={} stone={} center=({}, {})",
            cs_index, cap.ring, cap.stone, cap.center.x, cap.center.y
        );
    }
}

/// Find the four corners of a ring region with two flood-fill scoring
/// passes: first the point farthest from `reference`, then four-directional
/// extremal scoring along that diagonal and its perpendicular.
fn find_region_corners(scanner: &mut Scanner, rcode: usize, reference: &Point) -> [Point; 4] {
    let seed = scanner.region(rcode).seed;
    let (w, h) = (scanner.width, scanner.height);

    let mut far = seed;
    let mut far_score = -1i64;
    flood_fill(
        &mut scanner.pixels,
        w,
        h,
        seed.x,
        seed.y,
        rcode as u8,
        PIXEL_BLACK,
        Some(&mut |y, left, right| {
            for x in [left, right] {
                let dx = (x - reference.x) as i64;
                let dy = (y - reference.y) as i64;
                let d = dx * dx + dy * dy;
                if d > far_score {
                    far_score = d;
                    far = Point::new(x, y);
                }
            }
        }),
    );

    // Diagonal from the reference through the farthest corner; score the
    // region's extremes along it and its perpendicular.
    let ref_x = (far.x - reference.x) as i64;
    let ref_y = (far.y - reference.y) as i64;

    let mut corners = [seed; 4];
    let d0 = seed.x as i64 * ref_x + seed.y as i64 * ref_y;
    let d1 = seed.x as i64 * -ref_y + seed.y as i64 * ref_x;
    let mut scores = [d0, d1, -d0, -d1];

    flood_fill(
        &mut scanner.pixels,
        w,
        h,
        seed.x,
        seed.y,
        PIXEL_BLACK,
        rcode as u8,
        Some(&mut |y, left, right| {
            for x in [left, right] {
                let up = x as i64 * ref_x + y as i64 * ref_y;
                let right_s = x as i64 * -ref_y + y as i64 * ref_x;
                let candidates = [up, right_s, -up, -right_s];
                for (j, &s) in candidates.iter().enumerate() {
                    if s > scores[j] {
                        scores[j] = s;
                        corners[j] = Point::new(x, y);
                    }
                }
            }
        }),
    );

    corners
}
