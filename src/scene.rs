//! Per-frame scene setup and the face loop driving vertex stage, divide and rasterizer.

pub mod model;
pub mod shader;

use derive_more::{Display, Error, From};
use nalgebra as na;
use na::{vector, Matrix4, Vector3};

use crate::frame::{Color, DepthBuffer, Image};
use crate::geometry::{invert_transpose, normalize_or_keep, GeometryError};
use crate::raster::{rasterize_triangle, DepthPolicy, RasterOutcome};
use crate::transform::{look_at, perspective_divide, projection, viewport, Transform, TransformError};

use model::Model;
use shader::Shader;

#[derive(Debug, Display, Error, From)]
pub enum SceneError {
    #[display("invalid camera: {_0}")]
    #[from]
    Camera(TransformError),
    #[display("cannot transform normals: {_0}")]
    #[from]
    Normals(GeometryError),
    #[display("frame must be at least 1x1, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vector3<f32>,
    pub center: Vector3<f32>,
    pub up: Vector3<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        return Camera {
            eye: vector![1.0, 1.0, 3.0],
            center: Vector3::zeros(),
            up: vector![0.0, 1.0, 0.0],
        };
    }
}

/// Pixel rectangle the [-1, 1] cube is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl ViewportRect {
    /// Centered rectangle leaving an eighth of the frame free on every side.
    pub fn inset(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        return ViewportRect {
            x: w / 8.0,
            y: h / 8.0,
            w: w * 3.0 / 4.0,
            h: h * 3.0 / 4.0,
        };
    }
}

/// Everything a frame is set up from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    pub width: u32,
    pub height: u32,
    pub camera: Camera,
    /// Direction towards the light, need not be normalized.
    pub light_direction: Vector3<f32>,
    pub depth_range: f32,
    /// None picks [`ViewportRect::inset`] for the frame size.
    pub viewport: Option<ViewportRect>,
    pub depth_policy: DepthPolicy,
}

impl Default for SceneSettings {
    fn default() -> Self {
        return SceneSettings {
            width: 800,
            height: 800,
            camera: Camera::default(),
            light_direction: vector![1.0, 1.0, 1.0],
            depth_range: 255.0,
            viewport: None,
            depth_policy: DepthPolicy::default(),
        };
    }
}

/// Frame constants shared by the shaders and the rasterizer. Built once per frame,
/// read-only while the frame is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContext {
    width: u32,
    height: u32,
    camera: Camera,
    light_direction: Vector3<f32>, // Unit length, world space.
    transform: Transform,
    normal_matrix: Matrix4<f32>, // Inverse transpose of the view, applied to normals.
    depth_policy: DepthPolicy,
}

impl FrameContext {
    pub fn new(settings: &SceneSettings) -> Result<Self, SceneError> {
        if settings.width == 0 || settings.height == 0 {
            return Err(SceneError::EmptyFrame {
                width: settings.width,
                height: settings.height,
            });
        }
        let camera = settings.camera;
        let view = look_at(camera.eye, camera.center, camera.up)?;
        let proj = projection((camera.eye - camera.center).norm())?;
        let rect = settings
            .viewport
            .unwrap_or_else(|| ViewportRect::inset(settings.width, settings.height));
        let vp = viewport(rect.x, rect.y, rect.w, rect.h, settings.depth_range);

        return Ok(FrameContext {
            width: settings.width,
            height: settings.height,
            camera,
            light_direction: normalize_or_keep(settings.light_direction),
            transform: Transform::new(view, proj, vp),
            normal_matrix: invert_transpose(view)?,
            depth_policy: settings.depth_policy,
        });
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    pub fn camera(&self) -> &Camera {
        return &self.camera;
    }

    pub fn light_direction(&self) -> Vector3<f32> {
        return self.light_direction;
    }

    pub fn transform(&self) -> &Transform {
        return &self.transform;
    }

    pub fn normal_matrix(&self) -> Matrix4<f32> {
        return self.normal_matrix;
    }

    pub fn depth_policy(&self) -> DepthPolicy {
        return self.depth_policy;
    }
}

/// Color and depth targets of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub image: Image,
    pub depth: DepthBuffer,
}

impl Frame {
    pub fn new(ctx: &FrameContext, clear_color: Color) -> Self {
        return Frame {
            image: Image::filled(ctx.width(), ctx.height(), clear_color),
            depth: DepthBuffer::new(ctx.width(), ctx.height()),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub faces: usize,
    pub degenerate: usize,
    pub pixels_written: usize,
    pub fragments_discarded: usize,
}

/// Draws every face of `model` in order: three vertex-stage calls, the homogeneous divide,
/// then rasterization against the shared depth buffer.
pub fn render(model: &Model, shader: &mut dyn Shader, ctx: &FrameContext, frame: &mut Frame) -> FrameStats {
    let mut stats = FrameStats::default();
    for face in 0..model.face_count() {
        let mut screen_coords = [Vector3::zeros(); 3];
        for nth in 0..3 {
            screen_coords[nth] = perspective_divide(shader.vertex(face, nth));
        }
        let outcome = rasterize_triangle(
            &screen_coords,
            &*shader,
            &mut frame.depth,
            &mut frame.image,
            ctx.depth_policy(),
        );
        stats.faces += 1;
        match outcome {
            RasterOutcome::Degenerate => stats.degenerate += 1,
            RasterOutcome::Rasterized { written, discarded } => {
                stats.pixels_written += written;
                stats.fragments_discarded += discarded;
            }
        }
    }
    log::debug!(
        "rendered {} faces ({} degenerate), {} pixels written, {} fragments discarded",
        stats.faces,
        stats.degenerate,
        stats.pixels_written,
        stats.fragments_discarded
    );
    return stats;
}
