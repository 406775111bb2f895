//! Connected-component labeling via span flood fill.
//!
//! The label buffer doubles as the region map: 0 is white, 1 is unclaimed
//! black, and values from [`PIXEL_REGION`] up are region codes. A region is
//! only materialized the first time one of its pixels is probed.

use crate::Scanner;
use crate::models::{MAX_REGIONS, Point};

/// Label for white pixels.
pub(crate) const PIXEL_WHITE: u8 = 0;
/// Label for black pixels not yet claimed by a region.
pub(crate) const PIXEL_BLACK: u8 = 1;
/// First region code; codes run up to 255 in the one-byte label buffer.
pub(crate) const PIXEL_REGION: u8 = 2;

/// One connected component of same-colored pixels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Region {
    /// First pixel the fill was seeded from.
    pub seed: Point,
    /// Total pixels in the component.
    pub count: u32,
    /// Owning capstone index, once claimed by one.
    pub capstone: Option<usize>,
}

/// Per-span callback: receives (y, left, right) for each filled row extent.
pub(crate) type SpanFn<'a> = &'a mut dyn FnMut(i32, i32, i32);

/// One entry of the explicit fill stack. `left_up`/`left_down` track how far
/// the scans of the adjacent rows have advanced, so a frame can be resumed
/// after a child fill returns.
#[derive(Clone, Copy)]
struct FillFrame {
    y: i32,
    right: i32,
    left_up: i32,
    left_down: i32,
}

fn fill_line(
    pixels: &mut [u8],
    width: i32,
    x: i32,
    y: i32,
    from: u8,
    to: u8,
    span: &mut Option<SpanFn>,
) -> (i32, i32) {
    let row = &mut pixels[(y * width) as usize..((y + 1) * width) as usize];
    let mut left = x;
    let mut right = x;

    while left > 0 && row[(left - 1) as usize] == from {
        left -= 1;
    }
    while right < width - 1 && row[(right + 1) as usize] == from {
        right += 1;
    }

    for px in &mut row[left as usize..=right as usize] {
        *px = to;
    }

    if let Some(func) = span {
        func(y, left, right);
    }

    (left, right)
}

/// Iterative flood fill over 4-connected pixels equal to `from`, relabeling
/// them `to`. Recursion is replaced by an explicit stack of span records so
/// worst-case memory stays fixed; exhausting the stack budget silently stops
/// expanding rather than failing.
pub(crate) fn flood_fill(
    pixels: &mut [u8],
    width: usize,
    height: usize,
    x: i32,
    y: i32,
    from: u8,
    to: u8,
    mut span: Option<SpanFn>,
) {
    debug_assert_ne!(from, to);
    debug_assert_eq!(pixels[y as usize * width + x as usize], from);

    let w = width as i32;
    let h = height as i32;
    let budget = width * height / 4 + 1;
    let mut stack: Vec<FillFrame> = Vec::with_capacity(budget);

    let (left, right) = fill_line(pixels, w, x, y, from, to, &mut span);
    stack.push(FillFrame {
        y,
        right,
        left_up: left,
        left_down: left,
    });

    'outer: loop {
        if stack.len() >= budget {
            break;
        }
        let top = stack.len() - 1;
        let vars = stack[top];

        // Resume the scan of the row above where it left off; descend into
        // the first unfilled run found there.
        if vars.y > 0 {
            let ny = vars.y - 1;
            let mut lx = vars.left_up;
            while lx <= vars.right {
                if pixels[(ny * w + lx) as usize] == from {
                    stack[top].left_up = lx;
                    let (nl, nr) = fill_line(pixels, w, lx, ny, from, to, &mut span);
                    stack.push(FillFrame {
                        y: ny,
                        right: nr,
                        left_up: nl,
                        left_down: nl,
                    });
                    continue 'outer;
                }
                lx += 1;
            }
            stack[top].left_up = lx;
        }

        // Same for the row below.
        if vars.y < h - 1 {
            let ny = vars.y + 1;
            let mut lx = stack[top].left_down;
            while lx <= vars.right {
                if pixels[(ny * w + lx) as usize] == from {
                    stack[top].left_down = lx;
                    let (nl, nr) = fill_line(pixels, w, lx, ny, from, to, &mut span);
                    stack.push(FillFrame {
                        y: ny,
                        right: nr,
                        left_up: nl,
                        left_down: nl,
                    });
                    continue 'outer;
                }
                lx += 1;
            }
            stack[top].left_down = lx;
        }

        stack.pop();
        if stack.is_empty() {
            break;
        }
    }
}

/// Resolve the pixel at (x, y) to a region code, lazily labeling the
/// component on first touch. Returns None for white or out-of-bounds pixels,
/// and when the region table is full.
pub(crate) fn region_code(scanner: &mut Scanner, x: i32, y: i32) -> Option<usize> {
    if x < 0 || y < 0 || x >= scanner.width as i32 || y >= scanner.height as i32 {
        return None;
    }

    let pixel = scanner.pixels[y as usize * scanner.width + x as usize];
    if pixel == PIXEL_WHITE {
        return None;
    }
    if pixel >= PIXEL_REGION {
        return Some(pixel as usize);
    }

    if scanner.regions.len() >= MAX_REGIONS {
        return None;
    }

    let code = PIXEL_REGION as usize + scanner.regions.len();
    let mut count = 0u32;
    flood_fill(
        &mut scanner.pixels,
        scanner.width,
        scanner.height,
        x,
        y,
        PIXEL_BLACK,
        code as u8,
        Some(&mut |_, left, right| count += (right - left + 1) as u32),
    );

    scanner.regions.push(Region {
        seed: Point::new(x, y),
        count,
        capstone: None,
    });

    Some(code)
}
