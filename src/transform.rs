//! Camera, projection and viewport matrices.
//!
//! A model-space point reaches the screen as
//! `perspective_divide(viewport * projection * view * (x, y, z, 1))`.
//! The order is fixed and the divide happens only in [`perspective_divide`].

use derive_more::{Display, Error};
use nalgebra as na;
use na::{matrix, Matrix4, Vector3, Vector4};

use crate::geometry::{from_hom_point, to_hom_point};

#[derive(Debug, Display, Error, Clone, Copy, PartialEq)]
pub enum TransformError {
    #[display("camera eye and target coincide, view direction is undefined")]
    CoincidentEyeAndTarget,
    #[display("up vector is parallel to the view direction")]
    UpParallelToForward,
    #[display("camera distance must be positive, got {distance}")]
    InvalidCameraDistance { distance: f32 },
}

/// Camera matrix placing `eye` on the positive z axis of a basis centered at `target`.
///
/// Rows of the rotation are right, true up and forward, where forward points
/// from the target back to the eye.
pub fn look_at(
    eye: Vector3<f32>,
    target: Vector3<f32>,
    up: Vector3<f32>,
) -> Result<Matrix4<f32>, TransformError> {
    let forward = (eye - target)
        .try_normalize(0.0)
        .ok_or(TransformError::CoincidentEyeAndTarget)?;
    let right = up
        .cross(&forward)
        .try_normalize(f32::EPSILON)
        .ok_or(TransformError::UpParallelToForward)?;
    let true_up = forward.cross(&right);

    let rotation = matrix![right.x,   right.y,   right.z,   0.0;
                           true_up.x, true_up.y, true_up.z, 0.0;
                           forward.x, forward.y, forward.z, 0.0;
                           0.0,       0.0,       0.0,       1.0];
    let translation = matrix![1.0, 0.0, 0.0, -target.x;
                              0.0, 1.0, 0.0, -target.y;
                              0.0, 0.0, 1.0, -target.z;
                              0.0, 0.0, 0.0, 1.0];
    return Ok(rotation * translation);
}

/// Simple perspective keyed on the eye-target distance: identity with `[3][2] = -1/distance`.
/// An infinite distance degenerates to the orthographic identity.
pub fn projection(camera_distance: f32) -> Result<Matrix4<f32>, TransformError> {
    if camera_distance.is_nan() || camera_distance <= 0.0 {
        return Err(TransformError::InvalidCameraDistance { distance: camera_distance });
    }
    let mut m = Matrix4::identity();
    m[(3, 2)] = -1.0 / camera_distance;
    return Ok(m);
}

pub fn orthographic() -> Matrix4<f32> {
    return Matrix4::identity();
}

/// Maps the [-1, 1] cube onto the pixel rectangle at `(x, y)` of size `w` x `h`,
/// and depth onto [0, depth_range].
pub fn viewport(x: f32, y: f32, w: f32, h: f32, depth_range: f32) -> Matrix4<f32> {
    let d = depth_range;
    return matrix![w / 2.0, 0.0,     0.0,     x + w / 2.0;
                   0.0,     h / 2.0, 0.0,     y + h / 2.0;
                   0.0,     0.0,     d / 2.0, d / 2.0;
                   0.0,     0.0,     0.0,     1.0];
}

/// The one homogeneous divide of the pipeline.
pub fn perspective_divide(clip: Vector4<f32>) -> Vector3<f32> {
    return from_hom_point(clip);
}

/// View, projection and viewport of a frame, with their product kept in sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    viewport: Matrix4<f32>,
    composed: Matrix4<f32>, // viewport * projection * view
}

impl Transform {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>, viewport: Matrix4<f32>) -> Self {
        return Self {
            view,
            projection,
            viewport,
            composed: viewport * projection * view,
        };
    }

    pub fn view(&self) -> Matrix4<f32> {
        return self.view;
    }

    pub fn projection(&self) -> Matrix4<f32> {
        return self.projection;
    }

    pub fn viewport(&self) -> Matrix4<f32> {
        return self.viewport;
    }

    pub fn composed(&self) -> Matrix4<f32> {
        return self.composed;
    }

    pub fn with_view(self, view: Matrix4<f32>) -> Self {
        return Self::new(view, self.projection, self.viewport);
    }

    pub fn with_projection(self, projection: Matrix4<f32>) -> Self {
        return Self::new(self.view, projection, self.viewport);
    }

    pub fn with_viewport(self, viewport: Matrix4<f32>) -> Self {
        return Self::new(self.view, self.projection, viewport);
    }

    /// Homogeneous screen-space position, before the divide.
    pub fn to_clip(&self, point: Vector3<f32>) -> Vector4<f32> {
        return self.composed * to_hom_point(point);
    }

    pub fn to_screen(&self, point: Vector3<f32>) -> Vector3<f32> {
        return perspective_divide(self.to_clip(point));
    }
}
