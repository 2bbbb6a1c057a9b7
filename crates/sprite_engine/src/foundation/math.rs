//! Math utilities and types
//!
//! 2D affine transforms are represented as homogeneous 3x3 matrices. Storage is
//! column-major, which is exactly the layout the instanced `model`/`uv`
//! attributes expect on the device:
//!
//! ```text
//!   [ xx  xy  0 ]   column 0 -> floats 0..3
//!   [ yx  yy  0 ]   column 1 -> floats 3..6
//!   [  x   y  1 ]   column 2 -> floats 6..9
//! ```

pub use nalgebra::{Matrix3, Vector2, Vector3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type (homogeneous 2D coordinates)
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type used for 2D affine transforms
pub type Mat3 = Matrix3<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Number of floats in a packed affine matrix
pub const MAT3_FLOATS: usize = 9;

/// Extension trait for Mat3 with 2D affine helpers
pub trait Mat3Ext {
    /// Translation by `offset`
    fn translation_2d(offset: Vec2) -> Mat3;

    /// Counter-clockwise rotation by `angle` radians
    fn rotation_2d(angle: f32) -> Mat3;

    /// Non-uniform scaling
    fn scaling_2d(x: f32, y: f32) -> Mat3;

    /// The all-zero matrix. Maps every point to the origin, so geometry drawn
    /// with it collapses to a single point.
    fn degenerate() -> Mat3;

    /// Rebuild a matrix from 9 column-major floats
    fn from_packed(packed: &[f32; MAT3_FLOATS]) -> Mat3;

    /// Column-major packing, ready for upload
    fn to_packed(&self) -> [f32; MAT3_FLOATS];

    /// Apply the affine part of the matrix to a point (`(M * [x, y, 1]).xy`)
    fn transform_point_2d(&self, point: Point2) -> Point2;
}

impl Mat3Ext for Mat3 {
    fn translation_2d(offset: Vec2) -> Mat3 {
        Mat3::new_translation(&offset)
    }

    fn rotation_2d(angle: f32) -> Mat3 {
        Mat3::new_rotation(angle)
    }

    fn scaling_2d(x: f32, y: f32) -> Mat3 {
        Mat3::new_nonuniform_scaling(&Vec2::new(x, y))
    }

    fn degenerate() -> Mat3 {
        Mat3::zeros()
    }

    fn from_packed(packed: &[f32; MAT3_FLOATS]) -> Mat3 {
        Mat3::from_column_slice(packed)
    }

    fn to_packed(&self) -> [f32; MAT3_FLOATS] {
        let mut packed = [0.0; MAT3_FLOATS];
        packed.copy_from_slice(self.as_slice());
        packed
    }

    fn transform_point_2d(&self, point: Point2) -> Point2 {
        // No perspective divide: the sprite shader only reads `.xy`
        let h = self * Vec3::new(point.x, point.y, 1.0);
        Point2::new(h.x, h.y)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;
}
