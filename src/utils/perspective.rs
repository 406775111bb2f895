/// Projective transforms between local grid coordinates and image pixels
use crate::models::Point;

/// An 8-coefficient perspective transform mapping local (u, v) coordinates
/// onto image pixels:
///
/// ```text
/// x = (c0*u + c1*v + c2) / (c6*u + c7*v + 1)
/// y = (c3*u + c4*v + c5) / (c6*u + c7*v + 1)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Perspective {
    pub(crate) c: [f64; 8],
}

impl Perspective {
    /// Fit the transform that carries the axis-aligned rectangle
    /// (0,0)-(w,0)-(w,h)-(0,h) onto the quadrilateral `rect` (given
    /// clockwise from the rectangle's origin corner).
    pub fn from_quad(rect: &[Point; 4], w: f64, h: f64) -> Self {
        let x0 = rect[0].x as f64;
        let y0 = rect[0].y as f64;
        let x1 = rect[1].x as f64;
        let y1 = rect[1].y as f64;
        let x2 = rect[2].x as f64;
        let y2 = rect[2].y as f64;
        let x3 = rect[3].x as f64;
        let y3 = rect[3].y as f64;

        // Square-to-quad solution over the unit square, then rescaled so
        // (u, v) run in grid units rather than [0, 1].
        let dx1 = x1 - x2;
        let dy1 = y1 - y2;
        let dx2 = x3 - x2;
        let dy2 = y3 - y2;
        let sx = x0 - x1 + x2 - x3;
        let sy = y0 - y1 + y2 - y3;
        let den = dx1 * dy2 - dy1 * dx2;

        let g = (sx * dy2 - sy * dx2) / den;
        let hc = (dx1 * sy - dy1 * sx) / den;

        Perspective {
            c: [
                (x1 - x0 + g * x1) / w,
                (x3 - x0 + hc * x3) / h,
                x0,
                (y1 - y0 + g * y1) / w,
                (y3 - y0 + hc * y3) / h,
                y0,
                g / w,
                hc / h,
            ],
        }
    }

    /// Map local (u, v) to the nearest image pixel.
    pub fn map(&self, u: f64, v: f64) -> Point {
        let c = &self.c;
        let den = c[6] * u + c[7] * v + 1.0;
        let x = (c[0] * u + c[1] * v + c[2]) / den;
        let y = (c[3] * u + c[4] * v + c[5]) / den;
        Point::new(x.round() as i32, y.round() as i32)
    }

    /// Invert the transform for one image point, recovering local (u, v).
    pub fn unmap(&self, p: &Point) -> (f64, f64) {
        let c = &self.c;
        let x = p.x as f64;
        let y = p.y as f64;
        let den = -c[0] * c[7] * y + c[1] * c[6] * y + (c[3] * c[7] - c[4] * c[6]) * x + c[0] * c[4]
            - c[1] * c[3];
        let u = -(c[1] * (y - c[5]) - c[2] * c[7] * y + (c[5] * c[7] - c[4]) * x + c[2] * c[4])
            / den;
        let v =
            (c[0] * (y - c[5]) - c[2] * c[6] * y + (c[5] * c[6] - c[3]) * x + c[2] * c[3]) / den;
        (u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_scale() {
        let rect = [
            Point::new(0, 0),
            Point::new(70, 0),
            Point::new(70, 70),
            Point::new(0, 70),
        ];
        let p = Perspective::from_quad(&rect, 7.0, 7.0);
        assert_eq!(p.map(0.0, 0.0), Point::new(0, 0));
        assert_eq!(p.map(7.0, 7.0), Point::new(70, 70));
        assert_eq!(p.map(3.5, 3.5), Point::new(35, 35));
    }

    #[test]
    fn test_map_unmap_roundtrip() {
        // A genuinely projective quad (not affine).
        let rect = [
            Point::new(10, 12),
            Point::new(90, 5),
            Point::new(100, 103),
            Point::new(4, 95),
        ];
        let p = Perspective::from_quad(&rect, 7.0, 7.0);
        for &(u, v) in &[(0.0, 0.0), (7.0, 0.0), (3.5, 3.5), (1.2, 6.3)] {
            let mapped = p.map(u, v);
            let (ru, rv) = p.unmap(&mapped);
            // Mapping rounds to integer pixels, so allow a coarse tolerance.
            assert!((ru - u).abs() < 0.1, "u {} -> {}", u, ru);
            assert!((rv - v).abs() < 0.1, "v {} -> {}", v, rv);
        }
    }

    #[test]
    fn test_corners_land_on_quad() {
        let rect = [
            Point::new(10, 12),
            Point::new(90, 5),
            Point::new(100, 103),
            Point::new(4, 95),
        ];
        let p = Perspective::from_quad(&rect, 7.0, 7.0);
        assert_eq!(p.map(0.0, 0.0), rect[0]);
        assert_eq!(p.map(7.0, 0.0), rect[1]);
        assert_eq!(p.map(7.0, 7.0), rect[2]);
        assert_eq!(p.map(0.0, 7.0), rect[3]);
    }
}
