//! Grid assembly: grouping three consistent capstones into a candidate
//! symbol, locating the alignment pattern, and refining the symbol's
//! perspective transform by local hill climbing.

use crate::Scanner;
use crate::decoder::tables;
use crate::models::{MAX_CAPSTONES, MAX_GRIDS, MAX_VERSION, Point};
use crate::utils::perspective::Perspective;

use super::finder::Capstone;
use super::region::{PIXEL_BLACK, flood_fill, region_code};

/// One candidate symbol under assembly.
#[derive(Debug, Clone)]
pub(crate) struct Grid {
    /// Capstone indices: bottom-left, top-left, top-right after ordering.
    pub caps: [usize; 3],
    /// Region of the located alignment pattern, for symbols that have one.
    pub align_region: Option<usize>,
    /// Alignment point: the pattern corner nearest the symbol's top-left,
    /// or the line-intersection estimate when no region was found.
    pub align: Point,
    /// Modules per side.
    pub grid_size: usize,
    /// Maps module coordinates onto the image. Distinct from any single
    /// capstone's local transform.
    pub c: Perspective,
}

struct Neighbour {
    index: usize,
    distance: f64,
}

/// Try to complete a grid around capstone `i` by finding neighbors along
/// its two local axes.
pub(crate) fn test_grouping(scanner: &mut Scanner, i: usize) {
    if scanner.capstones[i].qr_grid.is_some() {
        return;
    }

    let mut hlist: Vec<Neighbour> = Vec::with_capacity(MAX_CAPSTONES);
    let mut vlist: Vec<Neighbour> = Vec::with_capacity(MAX_CAPSTONES);

    // Look for potential neighbors by examining the relative gradients from
    // this capstone to others.
    for j in 0..scanner.capstones.len() {
        if i == j || scanner.capstones[j].qr_grid.is_some() {
            continue;
        }

        let center = scanner.capstones[j].center;
        let (u, v) = scanner.capstones[i].c.unmap(&center);
        let u = (u - 3.5).abs();
        let v = (v - 3.5).abs();

        if u < 0.2 * v {
            hlist.push(Neighbour {
                index: j,
                distance: v,
            });
        }
        if v < 0.2 * u {
            vlist.push(Neighbour {
                index: j,
                distance: u,
            });
        }
    }

    if hlist.is_empty() || vlist.is_empty() {
        return;
    }

    for hn in &hlist {
        for vn in &vlist {
            // Squareness: the two half-diagonals must be near-equal.
            if (1.0 - hn.distance / vn.distance).abs() > 0.2 {
                continue;
            }
            if scanner.capstones[i].qr_grid.is_some()
                || scanner.capstones[hn.index].qr_grid.is_some()
                || scanner.capstones[vn.index].qr_grid.is_some()
            {
                continue;
            }
            record_qr_grid(scanner, hn.index, i, vn.index);
        }
    }
}

/// Rotate the capstone's corner ordering so index 0 is the clockwise
/// leftmost corner relative to the grid's hypotenuse, then refit its local
/// transform.
fn rotate_capstone(cap: &mut Capstone, h0: &Point, hd: &Point) {
    let mut best = 0usize;
    let mut best_score = i64::MAX;

    for (j, p) in cap.corners.iter().enumerate() {
        let score = (p.x - h0.x) as i64 * -(hd.y as i64) + (p.y - h0.y) as i64 * hd.x as i64;
        if score < best_score {
            best = j;
            best_score = score;
        }
    }

    let copy = cap.corners;
    for j in 0..4 {
        cap.corners[j] = copy[(j + best) % 4];
    }

    cap.c = Perspective::from_quad(&cap.corners, 7.0, 7.0);
    cap.center = cap.c.map(3.5, 3.5);
}

/// Estimate modules-per-side from the two capstone-to-capstone distances,
/// each normalized by the adjoining capstones' own widths.
fn measure_grid_size(scanner: &mut Scanner, index: usize) {
    let qr = &scanner.grids[index];
    let a = &scanner.capstones[qr.caps[0]];
    let b = &scanner.capstones[qr.caps[1]];
    let c = &scanner.capstones[qr.caps[2]];

    let ab = b.corners[0].distance(&a.corners[3]);
    let capstone_ab = (b.corners[0].distance(&b.corners[3]) + a.corners[0].distance(&a.corners[3])) / 2.0;
    let ver_grid = 7.0 * ab / capstone_ab;

    let bc = b.corners[0].distance(&c.corners[1]);
    let capstone_bc = (b.corners[0].distance(&b.corners[1]) + c.corners[0].distance(&c.corners[1])) / 2.0;
    let hor_grid = 7.0 * bc / capstone_bc;

    let estimate = (ver_grid + hor_grid) / 2.0;
    let version = (((estimate - 15.0) / 4.0) as i32).clamp(1, MAX_VERSION as i32);

    scanner.grids[index].grid_size = version as usize * 4 + 17;
}

fn line_intersect(p0: &Point, p1: &Point, q0: &Point, q1: &Point) -> Option<Point> {
    // (a, b) is perpendicular to the p line, (c, d) to the q line.
    let a = -(p1.y - p0.y) as i64;
    let b = (p1.x - p0.x) as i64;
    let c = -(q1.y - q0.y) as i64;
    let d = (q1.x - q0.x) as i64;

    // Dot products of each normal with a point on its line.
    let e = a * p1.x as i64 + b * p1.y as i64;
    let f = c * q1.x as i64 + d * q1.y as i64;

    let det = a * d - b * c;
    if det == 0 {
        return None;
    }

    Some(Point::new(
        ((d * e - b * f) / det) as i32,
        ((-c * e + a * f) / det) as i32,
    ))
}

/// Spiral outward from the estimated alignment point looking for a region
/// whose pixel count is plausible for an alignment pattern.
fn find_alignment_pattern(scanner: &mut Scanner, index: usize) {
    let (c0, c2, mut b) = {
        let qr = &scanner.grids[index];
        (qr.caps[0], qr.caps[2], qr.align)
    };

    // Guess two more corners of the pattern to estimate its pixel area.
    let (u, v) = scanner.capstones[c0].c.unmap(&b);
    let a = scanner.capstones[c0].c.map(u, v + 1.0);
    let (u, v) = scanner.capstones[c2].c.unmap(&b);
    let c = scanner.capstones[c2].c.map(u + 1.0, v);

    let size_estimate = ((a.x - b.x) as i64 * -((c.y - b.y) as i64)
        + (a.y - b.y) as i64 * (c.x - b.x) as i64)
        .abs();

    const DX_MAP: [i32; 4] = [1, 0, -1, 0];
    const DY_MAP: [i32; 4] = [0, -1, 0, 1];
    let mut step_size = 1i64;
    let mut dir = 0usize;

    // Don't wander too far from the estimate.
    while step_size * step_size < size_estimate * 100 {
        for _ in 0..step_size {
            if let Some(code) = region_code(scanner, b.x, b.y) {
                let count = scanner.region(code).count as i64;
                if count >= size_estimate / 2 && count <= size_estimate * 2 {
                    scanner.grids[index].align_region = Some(code);
                    return;
                }
            }
            b.x += DX_MAP[dir];
            b.y += DY_MAP[dir];
        }

        dir = (dir + 1) % 4;
        if dir & 1 == 0 {
            step_size += 1;
        }
    }
}

/// Record a grid from capstones (a, b, c) with b at the right angle.
fn record_qr_grid(scanner: &mut Scanner, mut a: usize, b: usize, mut c: usize) {
    if scanner.grids.len() >= MAX_GRIDS {
        return;
    }

    // Hypotenuse from A to C; B must sit left of it, so A-B-C is clockwise.
    let h0 = scanner.capstones[a].center;
    let mut hd = Point::new(
        scanner.capstones[c].center.x - h0.x,
        scanner.capstones[c].center.y - h0.y,
    );
    let b_center = scanner.capstones[b].center;
    if (b_center.x - h0.x) as i64 * -(hd.y as i64) + (b_center.y - h0.y) as i64 * hd.x as i64 > 0 {
        std::mem::swap(&mut a, &mut c);
        hd = Point::new(-hd.x, -hd.y);
    }

    let qr_index = scanner.grids.len();
    scanner.grids.push(Grid {
        caps: [a, b, c],
        align_region: None,
        align: Point::default(),
        grid_size: 0,
        c: Perspective::default(),
    });

    for idx in [a, b, c] {
        rotate_capstone(&mut scanner.capstones[idx], &h0, &hd);
        scanner.capstones[idx].qr_grid = Some(qr_index);
    }

    measure_grid_size(scanner, qr_index);

    // First alignment estimate: extend the bottom-left capstone's top edge
    // and the top-right capstone's left edge to their intersection.
    let align = line_intersect(
        &scanner.capstones[a].corners[0],
        &scanner.capstones[a].corners[1],
        &scanner.capstones[c].corners[0],
        &scanner.capstones[c].corners[3],
    );
    let Some(align) = align else {
        // Unable to complete this grid; unwind as if it never happened.
        for idx in [a, b, c] {
            scanner.capstones[idx].qr_grid = None;
        }
        scanner.grids.pop();
        return;
    };
    scanner.grids[qr_index].align = align;

    // Symbols above the smallest version carry a real alignment pattern;
    // find it and walk to its corner nearest the top-left.
    if scanner.grids[qr_index].grid_size > 21 {
        find_alignment_pattern(scanner, qr_index);

        if let Some(reg) = scanner.grids[qr_index].align_region {
            let seed = scanner.region(reg).seed;
            scanner.grids[qr_index].align = seed;

            let mut best = seed;
            let mut best_score = -(hd.y as i64) * seed.x as i64 + hd.x as i64 * seed.y as i64;
            let (w, h) = (scanner.width, scanner.height);

            flood_fill(
                &mut scanner.pixels,
                w,
                h,
                seed.x,
                seed.y,
                reg as u8,
                PIXEL_BLACK,
                None,
            );
            flood_fill(
                &mut scanner.pixels,
                w,
                h,
                seed.x,
                seed.y,
                PIXEL_BLACK,
                reg as u8,
                Some(&mut |y, left, right| {
                    for x in [left, right] {
                        let d = -(hd.y as i64) * x as i64 + hd.x as i64 * y as i64;
                        if d < best_score {
                            best_score = d;
                            best = Point::new(x, y);
                        }
                    }
                }),
            );

            scanner.grids[qr_index].align = best;
        }
    }

    setup_qr_perspective(scanner, qr_index);

    if crate::debug::debug_enabled() {
        let qr = &scanner.grids[qr_index];
        eprintln!(
            "GRID: recorded candidate {} size={} caps={:?} align=({}, {})",
            qr_index, qr.grid_size, qr.caps, qr.align.x, qr.align.y
        );
    }
}

/// Fit the symbol transform from the three outer capstone corners plus the
/// alignment point, then refine it.
fn setup_qr_perspective(scanner: &mut Scanner, index: usize) {
    let qr = &scanner.grids[index];
    let rect = [
        scanner.capstones[qr.caps[1]].corners[0],
        scanner.capstones[qr.caps[2]].corners[0],
        qr.align,
        scanner.capstones[qr.caps[0]].corners[0],
    ];
    let span = qr.grid_size as f64 - 7.0;
    scanner.grids[index].c = Perspective::from_quad(&rect, span, span);

    jiggle_perspective(scanner, index);
}

/// Coordinate-wise hill climbing on the 8 transform coefficients: 5 passes,
/// perturbing each coefficient by +/-2% of its value with the step halving
/// every pass, keeping a perturbation only on strict fitness improvement.
fn jiggle_perspective(scanner: &mut Scanner, index: usize) {
    let mut best = fitness_all(scanner, index);
    let mut adjustments = [0.0f64; 8];
    for (adj, &coeff) in adjustments.iter_mut().zip(&scanner.grids[index].c.c) {
        *adj = coeff * 0.02;
    }

    for _pass in 0..5 {
        for i in 0..16 {
            let j = i >> 1;
            let old = scanner.grids[index].c.c[j];
            let step = adjustments[j];
            let new = if i & 1 != 0 { old + step } else { old - step };

            scanner.grids[index].c.c[j] = new;
            let test = fitness_all(scanner, index);
            if test > best {
                best = test;
            } else {
                scanner.grids[index].c.c[j] = old;
            }
        }

        for adj in &mut adjustments {
            *adj *= 0.5;
        }
    }
}

/// Vote a single cell by sampling a 3x3 subgrid of its interior: +1 per
/// black sample, -1 per white sample.
fn fitness_cell(scanner: &Scanner, index: usize, x: i32, y: i32) -> i32 {
    const OFFSETS: [f64; 3] = [0.3, 0.5, 0.7];
    let qr = &scanner.grids[index];
    let mut score = 0;

    for v in 0..3 {
        for u in 0..3 {
            let p = qr.c.map(x as f64 + OFFSETS[u], y as f64 + OFFSETS[v]);
            if p.y < 0 || p.y >= scanner.height as i32 || p.x < 0 || p.x >= scanner.width as i32 {
                continue;
            }
            if scanner.pixels[p.y as usize * scanner.width + p.x as usize] != 0 {
                score += 1;
            } else {
                score -= 1;
            }
        }
    }

    score
}

fn fitness_ring(scanner: &Scanner, index: usize, cx: i32, cy: i32, radius: i32) -> i32 {
    let mut score = 0;
    for i in 0..radius * 2 {
        score += fitness_cell(scanner, index, cx - radius + i, cy - radius);
        score += fitness_cell(scanner, index, cx + radius, cy - radius + i);
        score += fitness_cell(scanner, index, cx + radius - i, cy + radius);
        score += fitness_cell(scanner, index, cx - radius, cy + radius - i);
    }
    score
}

fn fitness_apat(scanner: &Scanner, index: usize, cx: i32, cy: i32) -> i32 {
    fitness_cell(scanner, index, cx, cy) - fitness_ring(scanner, index, cx, cy, 1)
        + fitness_ring(scanner, index, cx, cy, 2)
}

fn fitness_capstone(scanner: &Scanner, index: usize, x: i32, y: i32) -> i32 {
    let x = x + 3;
    let y = y + 3;
    fitness_cell(scanner, index, x, y) + fitness_ring(scanner, index, x, y, 1)
        - fitness_ring(scanner, index, x, y, 2)
        + fitness_ring(scanner, index, x, y, 3)
}

/// Score the whole fitted grid: timing pattern, the three capstones'
/// expected ring polarity, and every alignment-pattern site of the version.
fn fitness_all(scanner: &Scanner, index: usize) -> i32 {
    let grid_size = scanner.grids[index].grid_size as i32;
    let version = (grid_size - 17) / 4;
    let mut score = 0;

    // Check the timing pattern
    for i in 0..grid_size - 14 {
        let expect = if i & 1 != 0 { 1 } else { -1 };
        score += fitness_cell(scanner, index, i + 7, 6) * expect;
        score += fitness_cell(scanner, index, 6, i + 7) * expect;
    }

    // Check capstones
    score += fitness_capstone(scanner, index, 0, 0);
    score += fitness_capstone(scanner, index, grid_size - 7, 0);
    score += fitness_capstone(scanner, index, 0, grid_size - 7);

    if version < 1 || version > MAX_VERSION as i32 {
        return score;
    }

    // Check alignment patterns
    let (apat, ap_count) = tables::alignment_positions(version as u8);
    for i in 1..ap_count.saturating_sub(1) {
        score += fitness_apat(scanner, index, 6, apat[i] as i32);
        score += fitness_apat(scanner, index, apat[i] as i32, 6);
    }
    for i in 1..ap_count {
        for j in 1..ap_count {
            score += fitness_apat(scanner, index, apat[i] as i32, apat[j] as i32);
        }
    }

    score
}

/// Sample one module of a fitted grid straight off the label buffer.
/// Positive means black, negative white, zero out of bounds.
pub(crate) fn read_cell(scanner: &Scanner, index: usize, x: usize, y: usize) -> i32 {
    let qr = &scanner.grids[index];
    let p = qr.c.map(x as f64 + 0.5, y as f64 + 0.5);
    if p.y < 0 || p.y >= scanner.height as i32 || p.x < 0 || p.x >= scanner.width as i32 {
        return 0;
    }
    if scanner.pixels[p.y as usize * scanner.width + p.x as usize] != 0 {
        1
    } else {
        -1
    }
}
