//! Programmable shading: a vertex stage run three times per triangle, then a fragment stage
//! run for every covered pixel that passes the depth test.
//!
//! Each lighting model is a leaf implementer of [`Shader`]. What differs between them is what
//! they stash as varyings in `vertex` and how `fragment` combines the interpolated values.

use std::fmt;
use std::str::FromStr;

use derive_more::{Display, Error};
use nalgebra as na;
use na::{Matrix2x3, Matrix3, Vector3, Vector4};

use super::model::Model;
use super::FrameContext;
use crate::frame::Color;
use crate::geometry::{from_hom_point, from_hom_vector, normalize_or_keep, to_hom_point, to_hom_vector};

pub trait Shader {
    /// Transforms corner `nth` of `face` and records its varyings in slot `nth`.
    /// Returns the homogeneous screen-space position; the caller does the divide.
    fn vertex(&mut self, face: usize, nth: usize) -> Vector4<f32>;

    /// Color of the fragment at barycentric coordinates `bar_coord` of the current triangle,
    /// or None to discard it.
    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Color>;
}

/// Diffuse coefficient of a surface with unit normal `normal` under unit light `light`.
fn diffuse_coef(normal: Vector3<f32>, light: Vector3<f32>) -> f32 {
    return normal.dot(&light).max(0.0);
}

/// One intensity for the whole face, from its geometric normal.
pub struct FlatShader<'a> {
    model: &'a Model,
    ctx: &'a FrameContext,
    pub color: Color,
    varying_positions: Matrix3<f32>, // World positions as columns.
    varying_intensity: f32,          // Set once the last corner is known.
}

impl<'a> FlatShader<'a> {
    pub fn new(model: &'a Model, ctx: &'a FrameContext) -> Self {
        return Self {
            model,
            ctx,
            color: Color::WHITE,
            varying_positions: Matrix3::zeros(),
            varying_intensity: 0.0,
        };
    }
}

impl Shader for FlatShader<'_> {
    fn vertex(&mut self, face: usize, nth: usize) -> Vector4<f32> {
        let position = self.model.face_vertex(face, nth);
        self.varying_positions.set_column(nth, &position);
        if nth == 2 {
            let p = &self.varying_positions;
            let face_normal = normalize_or_keep((p.column(1) - p.column(0)).cross(&(p.column(2) - p.column(0))));
            self.varying_intensity = diffuse_coef(face_normal, self.ctx.light_direction());
        }
        return self.ctx.transform().to_clip(position);
    }

    fn fragment(&self, _bar_coord: Vector3<f32>) -> Option<Color> {
        return Some(self.color.scale(self.varying_intensity));
    }
}

/// Intensity computed at the vertices from their normals and interpolated across the face.
pub struct GouraudShader<'a> {
    model: &'a Model,
    ctx: &'a FrameContext,
    pub color: Color,
    varying_intensity: Vector3<f32>, // Light intensity in each vertex of a polygon.
}

impl<'a> GouraudShader<'a> {
    pub fn new(model: &'a Model, ctx: &'a FrameContext) -> Self {
        return Self {
            model,
            ctx,
            color: Color::WHITE,
            varying_intensity: Vector3::zeros(),
        };
    }
}

impl Shader for GouraudShader<'_> {
    fn vertex(&mut self, face: usize, nth: usize) -> Vector4<f32> {
        let normal = self.model.normal(face, nth);
        self.varying_intensity[nth] = diffuse_coef(normal, self.ctx.light_direction());
        return self.ctx.transform().to_clip(self.model.face_vertex(face, nth));
    }

    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Color> {
        let intensity = self.varying_intensity.dot(&bar_coord);
        return Some(self.color.scale(intensity));
    }
}

/// Diffuse map sampled at the interpolated uv, darkened by Gouraud intensity.
pub struct TexturedShader<'a> {
    model: &'a Model,
    ctx: &'a FrameContext,
    varying_uv: Matrix2x3<f32>,      // UV coordinates of each vertex as columns.
    varying_intensity: Vector3<f32>,
}

impl<'a> TexturedShader<'a> {
    pub fn new(model: &'a Model, ctx: &'a FrameContext) -> Self {
        return Self {
            model,
            ctx,
            varying_uv: Matrix2x3::zeros(),
            varying_intensity: Vector3::zeros(),
        };
    }
}

impl Shader for TexturedShader<'_> {
    fn vertex(&mut self, face: usize, nth: usize) -> Vector4<f32> {
        self.varying_uv.set_column(nth, &self.model.uv(face, nth));
        let normal = self.model.normal(face, nth);
        self.varying_intensity[nth] = diffuse_coef(normal, self.ctx.light_direction());
        return self.ctx.transform().to_clip(self.model.face_vertex(face, nth));
    }

    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Color> {
        let uv = self.varying_uv * bar_coord;
        let intensity = self.varying_intensity.dot(&bar_coord);
        return Some(self.model.diffuse(uv).scale(intensity));
    }
}

/// Blinn-Phong: ambient, diffuse and a half-vector specular highlight, evaluated per pixel
/// in camera space from the interpolated normal and position.
pub struct BlinnPhongShader<'a> {
    model: &'a Model,
    ctx: &'a FrameContext,
    pub ambient: f32,
    pub specular_weight: f32,
    varying_uv: Matrix2x3<f32>,
    varying_normals: Matrix3<f32>,   // Camera-space normals at each vertex as columns.
    varying_positions: Matrix3<f32>, // Camera-space positions as columns.
    light: Vector3<f32>,             // Camera-space light direction.
    eye: Vector3<f32>,               // Camera-space eye position.
}

impl<'a> BlinnPhongShader<'a> {
    pub const DEFAULT_SHININESS: f32 = 32.0;

    pub fn new(model: &'a Model, ctx: &'a FrameContext) -> Self {
        let view = ctx.transform().view();
        return Self {
            model,
            ctx,
            ambient: 5.0,
            specular_weight: 0.6,
            varying_uv: Matrix2x3::zeros(),
            varying_normals: Matrix3::zeros(),
            varying_positions: Matrix3::zeros(),
            light: normalize_or_keep(from_hom_vector(view * to_hom_vector(ctx.light_direction()))),
            eye: from_hom_point(view * to_hom_point(ctx.camera().eye)),
        };
    }
}

impl Shader for BlinnPhongShader<'_> {
    fn vertex(&mut self, face: usize, nth: usize) -> Vector4<f32> {
        let position = self.model.face_vertex(face, nth);
        let normal = from_hom_vector(self.ctx.normal_matrix() * to_hom_vector(self.model.normal(face, nth)));
        let view_position = from_hom_point(self.ctx.transform().view() * to_hom_point(position));

        self.varying_uv.set_column(nth, &self.model.uv(face, nth));
        self.varying_normals.set_column(nth, &normalize_or_keep(normal));
        self.varying_positions.set_column(nth, &view_position);
        return self.ctx.transform().to_clip(position);
    }

    fn fragment(&self, bar_coord: Vector3<f32>) -> Option<Color> {
        let uv = self.varying_uv * bar_coord;
        let normal = normalize_or_keep(self.varying_normals * bar_coord);
        let position = self.varying_positions * bar_coord;
        let to_eye = normalize_or_keep(self.eye - position);
        let half = normalize_or_keep(self.light + to_eye);

        let diffuse = diffuse_coef(normal, self.light);
        let shininess = self.model.specular(uv).unwrap_or(Self::DEFAULT_SHININESS).max(1.0);
        let specular = if diffuse > 0.0 {
            normal.dot(&half).max(0.0).powf(shininess)
        } else {
            0.0
        };

        let base = self.model.diffuse(uv);
        let channel = |c: u8| (self.ambient + c as f32 * (diffuse + self.specular_weight * specular)).min(255.0) as u8;
        return Some(Color::new(channel(base.r), channel(base.g), channel(base.b)));
    }
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("unknown shader {name:?}, expected one of flat, gouraud, textured, phong")]
pub struct UnknownShader {
    pub name: String,
}

/// Lighting model picked by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderKind {
    Flat,
    #[default]
    Gouraud,
    Textured,
    Phong,
}

impl ShaderKind {
    pub fn build<'a>(self, model: &'a Model, ctx: &'a FrameContext) -> Box<dyn Shader + 'a> {
        return match self {
            ShaderKind::Flat => Box::new(FlatShader::new(model, ctx)),
            ShaderKind::Gouraud => Box::new(GouraudShader::new(model, ctx)),
            ShaderKind::Textured => Box::new(TexturedShader::new(model, ctx)),
            ShaderKind::Phong => Box::new(BlinnPhongShader::new(model, ctx)),
        };
    }
}

impl FromStr for ShaderKind {
    type Err = UnknownShader;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        return match name.to_ascii_lowercase().as_str() {
            "flat" => Ok(ShaderKind::Flat),
            "gouraud" | "default" => Ok(ShaderKind::Gouraud),
            "textured" | "texture" => Ok(ShaderKind::Textured),
            "phong" | "blinn-phong" => Ok(ShaderKind::Phong),
            _ => Err(UnknownShader { name: name.to_string() }),
        };
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderKind::Flat => "flat",
            ShaderKind::Gouraud => "gouraud",
            ShaderKind::Textured => "textured",
            ShaderKind::Phong => "phong",
        };
        return f.write_str(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Image;
    use crate::scene::model::FaceVertex;
    use crate::scene::{Camera, SceneSettings};
    use na::vector;

    /// Triangle in the z = 0 plane facing +z, with a normal per vertex.
    fn facing_triangle() -> Model {
        let positions = vec![vector![-0.5, -0.5, 0.0], vector![0.5, -0.5, 0.0], vector![0.0, 0.5, 0.0]];
        let uvs = vec![vector![0.0, 0.0], vector![1.0, 0.0], vector![0.5, 1.0]];
        let normals = vec![vector![0.0, 0.0, 1.0], vector![1.0, 0.0, 0.0], vector![0.0, 0.0, 1.0]];
        let faces = vec![[0, 1, 2].map(|i| FaceVertex::new(i, Some(i), Some(i)))];
        return Model::new(positions, uvs, normals, faces).unwrap();
    }

    fn head_on_context() -> FrameContext {
        let settings = SceneSettings {
            width: 64,
            height: 64,
            camera: Camera {
                eye: vector![0.0, 0.0, 3.0],
                center: Vector3::zeros(),
                up: vector![0.0, 1.0, 0.0],
            },
            light_direction: vector![0.0, 0.0, 1.0],
            ..Default::default()
        };
        return FrameContext::new(&settings).unwrap();
    }

    fn run_vertices(shader: &mut dyn Shader) -> [Vector4<f32>; 3] {
        return [0, 1, 2].map(|nth| shader.vertex(0, nth));
    }

    #[test]
    fn vertex_stage_applies_frame_transform() {
        let model = facing_triangle();
        let ctx = head_on_context();
        let mut shader = GouraudShader::new(&model, &ctx);
        let clip = run_vertices(&mut shader);
        for nth in 0..3 {
            let expected = ctx.transform().to_clip(model.face_vertex(0, nth));
            assert_eq!(clip[nth], expected);
        }
    }

    #[test]
    fn gouraud_interpolates_vertex_intensities() {
        let model = facing_triangle();
        let ctx = head_on_context();
        let mut shader = GouraudShader::new(&model, &ctx);
        run_vertices(&mut shader);
        // Second vertex normal is perpendicular to the light.
        assert_eq!(shader.fragment(vector![1.0, 0.0, 0.0]), Some(Color::WHITE));
        assert_eq!(shader.fragment(vector![0.0, 1.0, 0.0]), Some(Color::BLACK));
        assert_eq!(shader.fragment(vector![0.5, 0.5, 0.0]), Some(Color::gray(127)));
    }

    #[test]
    fn flat_uses_face_normal() {
        let model = facing_triangle();
        let ctx = head_on_context();
        let mut shader = FlatShader::new(&model, &ctx);
        run_vertices(&mut shader);
        for bar_coord in [vector![1.0, 0.0, 0.0], vector![0.0, 1.0, 0.0], vector![0.2, 0.3, 0.5]] {
            assert_eq!(shader.fragment(bar_coord), Some(Color::WHITE));
        }
    }

    #[test]
    fn flat_intensity_follows_current_face() {
        let positions = vec![
            vector![-0.5, -0.5, 0.0],
            vector![0.5, -0.5, 0.0],
            vector![0.0, 0.5, 0.0],
            // Lies in the x = 0 plane, edge-on to the light.
            vector![0.0, -0.5, -0.5],
            vector![0.0, 0.5, -0.5],
            vector![0.0, 0.0, 0.5],
        ];
        let faces = vec![
            [0, 1, 2].map(|i| FaceVertex::new(i, None, None)),
            [3, 4, 5].map(|i| FaceVertex::new(i, None, None)),
        ];
        let model = Model::new(positions, Vec::new(), Vec::new(), faces).unwrap();
        let ctx = head_on_context();
        let mut shader = FlatShader::new(&model, &ctx);
        for (face, expected) in [(1, Color::BLACK), (0, Color::WHITE)] {
            for nth in 0..3 {
                shader.vertex(face, nth);
            }
            assert_eq!(shader.fragment(vector![0.3, 0.3, 0.4]), Some(expected), "face {face}");
        }
    }

    #[test]
    fn textured_modulates_diffuse_map() {
        let model = facing_triangle().with_diffuse_map(Image::filled(4, 4, Color::new(200, 100, 50)));
        let ctx = head_on_context();
        let mut shader = TexturedShader::new(&model, &ctx);
        run_vertices(&mut shader);
        assert_eq!(shader.fragment(vector![1.0, 0.0, 0.0]), Some(Color::new(200, 100, 50)));
        assert_eq!(shader.fragment(vector![0.0, 1.0, 0.0]), Some(Color::BLACK));
    }

    #[test]
    fn blinn_phong_highlight_is_brighter_than_grazing_light() {
        let model = facing_triangle().with_diffuse_map(Image::filled(4, 4, Color::gray(100)));
        let ctx = head_on_context();
        let mut shader = BlinnPhongShader::new(&model, &ctx);
        run_vertices(&mut shader);
        let head_on = shader.fragment(vector![1.0, 0.0, 0.0]).unwrap();
        let grazing = shader.fragment(vector![0.0, 1.0, 0.0]).unwrap();
        // Ambient 5 plus full diffuse is 105, the highlight adds up to 60 more.
        assert!(head_on.r > 105 && head_on.r <= 165);
        assert_eq!(head_on, Color::gray(head_on.r));
        assert_eq!(grazing, Color::gray(5));
    }

    #[test]
    fn blinn_phong_clamps_channels() {
        let model = facing_triangle();
        let ctx = head_on_context();
        let mut shader = BlinnPhongShader::new(&model, &ctx);
        run_vertices(&mut shader);
        assert_eq!(shader.fragment(vector![1.0, 0.0, 0.0]), Some(Color::WHITE));
    }

    #[test]
    fn shader_kind_parses_names() {
        assert_eq!("phong".parse::<ShaderKind>(), Ok(ShaderKind::Phong));
        assert_eq!("Flat".parse::<ShaderKind>(), Ok(ShaderKind::Flat));
        assert_eq!("default".parse::<ShaderKind>(), Ok(ShaderKind::Gouraud));
        assert!("toon".parse::<ShaderKind>().is_err());
        for kind in [ShaderKind::Flat, ShaderKind::Gouraud, ShaderKind::Textured, ShaderKind::Phong] {
            assert_eq!(kind.to_string().parse::<ShaderKind>(), Ok(kind));
        }
    }
}
