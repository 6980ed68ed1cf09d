//! Triangle rasterization with a depth test.

use std::fmt;
use std::str::FromStr;

use derive_more::{Display, Error};
use nalgebra as na;
use na::{vector, Vector2, Vector3};

use crate::frame::{DepthBuffer, Image};
use crate::scene::shader::Shader;

/// Triangles whose doubled screen area is below this cover no pixels.
pub const DEGENERATE_EPSILON: f32 = 1e-2;

/// When the depth of a fragment is committed relative to the discard decision of the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthPolicy {
    /// Depth is written only for fragments the shader kept.
    /// A discarded fragment leaves the pixel open for anything behind it.
    #[default]
    CommitOnShade,
    /// Depth is written as soon as the test passes, before the shader runs.
    /// A discarded fragment is invisible but still occludes what comes after it.
    CommitBeforeShade,
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("unknown depth policy {name:?}, expected commit-on-shade or commit-before-shade")]
pub struct UnknownDepthPolicy {
    pub name: String,
}

impl FromStr for DepthPolicy {
    type Err = UnknownDepthPolicy;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        return match name.to_ascii_lowercase().as_str() {
            "commit-on-shade" | "on-shade" => Ok(DepthPolicy::CommitOnShade),
            "commit-before-shade" | "before-shade" => Ok(DepthPolicy::CommitBeforeShade),
            _ => Err(UnknownDepthPolicy { name: name.to_string() }),
        };
    }
}

impl fmt::Display for DepthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DepthPolicy::CommitOnShade => "commit-on-shade",
            DepthPolicy::CommitBeforeShade => "commit-before-shade",
        };
        return f.write_str(name);
    }
}

/// Pixel rectangle, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: Vector2<u32>, // lower left corner
    pub max: Vector2<u32>, // upper right corner
}

impl BoundingBox {
    /// Pixels a triangle may touch, clamped to a `width` x `height` image.
    /// None when the triangle lies entirely off the image.
    pub fn of_triangle(pts: &[Vector3<f32>; 3], width: u32, height: u32) -> Option<BoundingBox> {
        if width == 0 || height == 0 {
            return None;
        }
        let x_lo = pts.iter().map(|p| p.x).fold(f32::MAX, f32::min).floor();
        let y_lo = pts.iter().map(|p| p.y).fold(f32::MAX, f32::min).floor();
        let x_hi = pts.iter().map(|p| p.x).fold(f32::MIN, f32::max).ceil();
        let y_hi = pts.iter().map(|p| p.y).fold(f32::MIN, f32::max).ceil();

        let x_max = (width - 1) as f32;
        let y_max = (height - 1) as f32;
        if x_hi < 0.0 || y_hi < 0.0 || x_lo > x_max || y_lo > y_max {
            return None;
        }
        return Some(BoundingBox {
            min: vector![x_lo.max(0.0) as u32, y_lo.max(0.0) as u32],
            max: vector![x_hi.min(x_max) as u32, y_hi.min(y_max) as u32],
        });
    }
}

/// Barycentric coordinates of `p` with respect to the triangle `a, b, c`, using only x and y.
///
/// Solves u * (b - a) + v * (c - a) + (a - p) = 0 as the cross product of the x components
/// and the y components. None for a degenerate triangle, or when a coordinate is not finite.
pub fn barycentric(
    a: Vector2<f32>,
    b: Vector2<f32>,
    c: Vector2<f32>,
    p: Vector2<f32>,
) -> Option<Vector3<f32>> {
    let raw_cross = Vector3::new(c.x - a.x, b.x - a.x, a.x - p.x)
        .cross(&Vector3::new(c.y - a.y, b.y - a.y, a.y - p.y));
    if !raw_cross.z.is_finite() || raw_cross.z.abs() < DEGENERATE_EPSILON {
        return None;
    }
    return Some(vector![
        1.0 - (raw_cross.x + raw_cross.y) / raw_cross.z,
        raw_cross.y / raw_cross.z,
        raw_cross.x / raw_cross.z
    ]);
}

/// What happened to a triangle handed to [`rasterize_triangle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterOutcome {
    /// Zero-area on screen, nothing was touched.
    Degenerate,
    /// `written` pixels received a color, `discarded` fragments passed the depth test
    /// but were dropped by the shader.
    Rasterized { written: usize, discarded: usize },
}

/// Fills the pixels covered by a screen-space triangle.
///
/// `pts` are already divided by w: x and y in pixels, z the depth compared against
/// `depth`, larger is closer. Each covered pixel center that is strictly nearer than
/// what the depth buffer holds is handed to the fragment stage of `shader`.
pub fn rasterize_triangle(
    pts: &[Vector3<f32>; 3],
    shader: &dyn Shader,
    depth: &mut DepthBuffer,
    image: &mut Image,
    policy: DepthPolicy,
) -> RasterOutcome {
    let [a, b, c] = pts.map(|p| p.xy());
    // The area term does not depend on the sample, test it once for the whole triangle.
    if barycentric(a, b, c, a).is_none() || pts.iter().any(|p| !p.z.is_finite()) {
        log::trace!("skipping degenerate triangle {:?}", pts);
        return RasterOutcome::Degenerate;
    }

    let width = image.width().min(depth.width());
    let height = image.height().min(depth.height());
    let mut written = 0;
    let mut discarded = 0;
    let bbox = match BoundingBox::of_triangle(pts, width, height) {
        Some(bbox) => bbox,
        None => return RasterOutcome::Rasterized { written, discarded },
    };

    let z_values = vector![pts[0].z, pts[1].z, pts[2].z];
    for x in bbox.min.x..=bbox.max.x {
        for y in bbox.min.y..=bbox.max.y {
            let center = vector![x as f32 + 0.5, y as f32 + 0.5];
            let bar_coord = match barycentric(a, b, c, center) {
                Some(bar_coord) => bar_coord,
                None => continue,
            };
            if !(bar_coord.x >= 0.0 && bar_coord.y >= 0.0 && bar_coord.z >= 0.0) {
                // Negative or NaN coordinates, point is not in the triangle.
                continue;
            }

            let z_value = bar_coord.dot(&z_values);
            let stored = depth.get(x, y).unwrap_or(DepthBuffer::FAR);
            if !(z_value > stored) {
                continue;
            }
            if policy == DepthPolicy::CommitBeforeShade {
                depth.set(x, y, z_value);
            }
            match shader.fragment(bar_coord) {
                Some(color) => {
                    if policy == DepthPolicy::CommitOnShade {
                        depth.set(x, y, z_value);
                    }
                    image.set_pixel(x as i32, y as i32, color);
                    written += 1;
                }
                None => discarded += 1,
            }
        }
    }
    return RasterOutcome::Rasterized { written, discarded };
}
