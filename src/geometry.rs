use derive_more::{Display, Error};
use nalgebra as na;
use na::{vector, Matrix4, Vector2, Vector3, Vector4};

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[display("matrix is singular (zero determinant) and has no inverse")]
    SingularMatrix,
}

/// Transformation of a point to homogenous coordinates.
pub fn to_hom_point(v: Vector3<f32>) -> Vector4<f32> {
    return vector![v.x, v.y, v.z, 1.0];
}

/// Transformation of a vector to homogenous coordinates.
pub fn to_hom_vector(v: Vector3<f32>) -> Vector4<f32> {
    return vector![v.x, v.y, v.z, 0.0];
}

/// Transformation of a point from homogenous coordinates.
/// A point at infinity (w == 0) keeps its xyz part instead of being divided by zero.
pub fn from_hom_point(v: Vector4<f32>) -> Vector3<f32> {
    if v.w == 0.0 {
        return v.xyz();
    }
    return vector![v.x / v.w, v.y / v.w, v.z / v.w];
}

/// Transformation of a vector from homogenous coordinates.
pub fn from_hom_vector(v: Vector4<f32>) -> Vector3<f32> {
    return v.xyz();
}

/// Nearest integer, halves going up: 2.5 -> 3, -2.5 -> -2.
fn round_half_up(x: f32) -> i32 {
    return (x + 0.5).floor() as i32;
}

pub fn round_vec2(v: Vector2<f32>) -> Vector2<i32> {
    return v.map(round_half_up);
}

pub fn round_vec3(v: Vector3<f32>) -> Vector3<i32> {
    return v.map(round_half_up);
}

/// Unit vector in the direction of `v`, or `v` itself when it has zero length.
pub fn normalize_or_keep(v: Vector3<f32>) -> Vector3<f32> {
    return v.try_normalize(0.0).unwrap_or(v);
}

pub fn invert(m: Matrix4<f32>) -> Result<Matrix4<f32>, GeometryError> {
    return m.try_inverse().ok_or(GeometryError::SingularMatrix);
}

/// Inverse transpose, the matrix normals go through when points go through `m`.
pub fn invert_transpose(m: Matrix4<f32>) -> Result<Matrix4<f32>, GeometryError> {
    return Ok(invert(m)?.transpose());
}
