use geo_types::Coord;

use crate::errors::{self, GeoDataError};

/// An affine transform.
///
/// A six-element array storing the coefficients of an [affine transform]
/// used in mapping coordinates between pixel/line `(P, L)` (raster) space,
/// and `(Xp,Yp)` (projection/[`crate::SpatialRef`]) space.
///
/// # Interpretation
///
/// A `GeoTransform`'s components have the following meanings:
///
///   * `GeoTransform[0]`: x-coordinate of the upper-left corner of the upper-left pixel.
///   * `GeoTransform[1]`: W-E pixel resolution (pixel width).
///   * `GeoTransform[2]`: row rotation (typically zero).
///   * `GeoTransform[3]`: y-coordinate of the upper-left corner of the upper-left pixel.
///   * `GeoTransform[4]`: column rotation (typically zero).
///   * `GeoTransform[5]`: N-S pixel resolution (pixel height), negative value for a North-up image.
///
/// so that
///
/// ```text
/// Xp = gt[0] + P * gt[1] + L * gt[2]
/// Yp = gt[3] + P * gt[4] + L * gt[5]
/// ```
///
/// Datasets without georeferencing report [`DEFAULT_GEO_TRANSFORM`].
///
/// ## Note
///
/// Care with coefficient ordering is required when constructing an [affine transform matrix] from
/// a `GeoTransform`. If a 3x3 transform matrix is defined as:
///
/// ```text
/// | a b c |
/// | d e f |
/// | 0 0 1 |
/// ```
///
/// The corresponding `GeoTransform` ordering is:
///
/// ```text
/// [c, a, b, f, d, e]
/// ```
///
/// # Example
///
/// ```rust
/// # fn main() -> geodata::errors::Result<()> {
/// use geodata::GeoTransformEx;
/// let transform = [768269.0, 1.0, 0.0, 4057292.0, 0.0, -1.0];
/// let (x, y) = transform.apply(0.0, 0.0);
/// assert_eq!((x, y), (768269.0, 4057292.0));
/// let inverse = transform.invert()?;
/// let (p, l) = inverse.apply(x, y);
/// assert_eq!((p, l), (0.0, 0.0));
/// # Ok(())
/// # }
/// ```
///
/// [affine transform]: https://en.wikipedia.org/wiki/Affine_transformation
/// [affine transform matrix]: https://en.wikipedia.org/wiki/Transformation_matrix#Affine_transformations
pub type GeoTransform = [f64; 6];

/// The transform reported for datasets with no georeferencing.
pub const DEFAULT_GEO_TRANSFORM: GeoTransform = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Extension methods on [`GeoTransform`]
pub trait GeoTransformEx {
    /// Apply GeoTransform to x/y coordinate.
    fn apply(&self, pixel: f64, line: f64) -> (f64, f64);

    /// Apply GeoTransform to a pixel/line coordinate.
    fn apply_coord(&self, pixel_line: Coord<f64>) -> Coord<f64> {
        let (x, y) = self.apply(pixel_line.x, pixel_line.y);
        Coord { x, y }
    }

    /// Invert a [`GeoTransform`].
    ///
    /// Fails with [`GeoDataError::BadArgument`] when the transform is degenerate.
    fn invert(&self) -> errors::Result<GeoTransform>;

    /// `true` when the transform has no rotation terms and square pixels.
    fn is_north_up_square(&self) -> bool;
}

impl GeoTransformEx for GeoTransform {
    fn apply(&self, pixel: f64, line: f64) -> (f64, f64) {
        let geo_x = self[0] + pixel * self[1] + line * self[2];
        let geo_y = self[3] + pixel * self[4] + line * self[5];
        (geo_x, geo_y)
    }

    fn invert(&self) -> errors::Result<GeoTransform> {
        // fast path without rotation
        if self[2] == 0.0 && self[4] == 0.0 && self[1] != 0.0 && self[5] != 0.0 {
            return Ok([
                -self[0] / self[1],
                1.0 / self[1],
                0.0,
                -self[3] / self[5],
                0.0,
                1.0 / self[5],
            ]);
        }

        let det = self[1] * self[5] - self[2] * self[4];
        let magnitude = self[1]
            .abs()
            .max(self[2].abs())
            .max(self[4].abs().max(self[5].abs()));
        if det.abs() <= 1e-10 * magnitude * magnitude {
            return Err(GeoDataError::BadArgument(
                "Geo transform is uninvertible".to_string(),
            ));
        }

        let inv_det = 1.0 / det;
        Ok([
            (self[2] * self[3] - self[0] * self[5]) * inv_det,
            self[5] * inv_det,
            -self[2] * inv_det,
            (-self[1] * self[3] + self[0] * self[4]) * inv_det,
            -self[4] * inv_det,
            self[1] * inv_det,
        ])
    }

    fn is_north_up_square(&self) -> bool {
        self[2] == 0.0 && self[4] == 0.0 && (self[1].abs() - self[5].abs()).abs() <= 1e-10 * self[1].abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_near;

    #[test]
    fn test_apply_identity() {
        let (x, y) = DEFAULT_GEO_TRANSFORM.apply(3.0, 4.0);
        assert_eq!((x, y), (3.0, 4.0));
    }

    #[test]
    fn test_invert_rotated() {
        let gt: GeoTransform = [100.0, 2.0, 0.5, 200.0, 0.25, -3.0];
        let inv = gt.invert().unwrap();
        let (x, y) = gt.apply(7.0, 11.0);
        let (p, l) = inv.apply(x, y);
        assert_near!(p, 7.0, epsilon = 1e-9);
        assert_near!(l, 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invert_degenerate() {
        let gt: GeoTransform = [0.0, 1.0, 2.0, 0.0, 2.0, 4.0];
        assert!(gt.invert().is_err());
    }

    #[test]
    fn test_apply_coord() {
        let gt: GeoTransform = [10.0, 0.5, 0.0, 20.0, 0.0, -0.5];
        let c = gt.apply_coord(Coord { x: 2.0, y: 4.0 });
        assert_eq!(c, Coord { x: 11.0, y: 18.0 });
    }

    #[test]
    fn test_north_up_square() {
        assert!([0.0, 30.0, 0.0, 0.0, 0.0, -30.0].is_north_up_square());
        assert!(![0.0, 30.0, 0.0, 0.0, 0.0, -20.0].is_north_up_square());
        assert!(![0.0, 30.0, 1.0, 0.0, 0.0, -30.0].is_north_up_square());
    }
}
