use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};
use nalgebra as na;
use na::{vector, Vector2, Vector3};
use obj::raw::object::Polygon;
use obj::raw::{parse_obj, RawObj};
use obj::ObjError;

use crate::frame::{Color, Image};
use crate::geometry::normalize_or_keep;

#[derive(Debug, Display, Error, From)]
pub enum ModelError {
    #[display("cannot open model at {}: {error}", path.display())]
    Io { path: PathBuf, error: io::Error },
    #[display("malformed obj data: {_0}")]
    #[from]
    Parse(ObjError),
    #[display("face {face} refers to {kind} #{index}, but only {len} are defined")]
    IndexOutOfRange {
        face: usize,
        kind: &'static str,
        index: usize,
        len: usize,
    },
}

/// One corner of a face: indices into the position, texture coordinate and normal lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceVertex {
    pub fn new(position: usize, uv: Option<usize>, normal: Option<usize>) -> Self {
        return Self { position, uv, normal };
    }
}

/// Triangle mesh with optional texture maps, read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Model {
    positions: Vec<Vector3<f32>>,
    uvs: Vec<Vector2<f32>>,
    normals: Vec<Vector3<f32>>,
    faces: Vec<[FaceVertex; 3]>,
    diffuse_map: Option<Image>,
    specular_map: Option<Image>,
}

impl Model {
    /// In-memory mesh. Fails if a face refers past the end of one of the lists.
    pub fn new(
        positions: Vec<Vector3<f32>>,
        uvs: Vec<Vector2<f32>>,
        normals: Vec<Vector3<f32>>,
        faces: Vec<[FaceVertex; 3]>,
    ) -> Result<Model, ModelError> {
        let model = Model {
            positions,
            uvs,
            normals,
            faces,
            diffuse_map: None,
            specular_map: None,
        };
        model.validate()?;
        return Ok(model);
    }

    /// Reads a Wavefront obj file, picking up `<name>_diffuse.tga` and `<name>_spec.tga`
    /// next to it when they exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Model, ModelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| ModelError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let mut model = Model::from_reader(BufReader::new(file))?;
        model.diffuse_map = load_texture(path, "_diffuse.tga");
        model.specular_map = load_texture(path, "_spec.tga");
        return Ok(model);
    }

    /// Parses obj data, polygons with more than three corners are split into a triangle fan.
    pub fn from_reader(reader: impl BufRead) -> Result<Model, ModelError> {
        let raw = parse_obj(reader)?;
        let model = Model::from_raw(raw)?;
        log::info!(
            "# v# {} f# {} vt# {} vn# {}",
            model.positions.len(),
            model.faces.len(),
            model.uvs.len(),
            model.normals.len()
        );
        return Ok(model);
    }

    fn from_raw(raw: RawObj) -> Result<Model, ModelError> {
        let positions = raw.positions.iter().map(|p| vector![p.0, p.1, p.2]).collect();
        let uvs = raw.tex_coords.iter().map(|t| vector![t.0, t.1]).collect();
        let normals = raw.normals.iter().map(|n| vector![n.0, n.1, n.2]).collect();

        let mut faces = Vec::with_capacity(raw.polygons.len());
        for polygon in &raw.polygons {
            let corners: Vec<FaceVertex> = match polygon {
                Polygon::P(v) => v.iter().map(|&p| FaceVertex::new(p, None, None)).collect(),
                Polygon::PT(v) => v.iter().map(|&(p, t)| FaceVertex::new(p, Some(t), None)).collect(),
                Polygon::PN(v) => v.iter().map(|&(p, n)| FaceVertex::new(p, None, Some(n))).collect(),
                Polygon::PTN(v) => v
                    .iter()
                    .map(|&(p, t, n)| FaceVertex::new(p, Some(t), Some(n)))
                    .collect(),
            };
            if corners.len() < 3 {
                log::warn!("skipping polygon with {} corners", corners.len());
                continue;
            }
            for i in 1..corners.len() - 1 {
                faces.push([corners[0], corners[i], corners[i + 1]]);
            }
        }

        return Model::new(positions, uvs, normals, faces);
    }

    fn validate(&self) -> Result<(), ModelError> {
        let check = |face: usize, kind: &'static str, index: usize, len: usize| {
            if index < len {
                Ok(())
            } else {
                Err(ModelError::IndexOutOfRange { face, kind, index, len })
            }
        };
        for (i, face) in self.faces.iter().enumerate() {
            for corner in face {
                check(i, "position", corner.position, self.positions.len())?;
                if let Some(uv) = corner.uv {
                    check(i, "texture coordinate", uv, self.uvs.len())?;
                }
                if let Some(normal) = corner.normal {
                    check(i, "normal", normal, self.normals.len())?;
                }
            }
        }
        return Ok(());
    }

    pub fn with_diffuse_map(mut self, map: Image) -> Model {
        self.diffuse_map = Some(map);
        return self;
    }

    pub fn with_specular_map(mut self, map: Image) -> Model {
        self.specular_map = Some(map);
        return self;
    }

    pub fn vertex_count(&self) -> usize {
        return self.positions.len();
    }

    pub fn face_count(&self) -> usize {
        return self.faces.len();
    }

    pub fn vertex(&self, i: usize) -> Vector3<f32> {
        return self.positions[i];
    }

    pub fn face(&self, i: usize) -> [FaceVertex; 3] {
        return self.faces[i];
    }

    /// Position of corner `nth` of `face`.
    pub fn face_vertex(&self, face: usize, nth: usize) -> Vector3<f32> {
        return self.positions[self.faces[face][nth].position];
    }

    /// Unit normal from the counter-clockwise winding of `face`.
    pub fn face_normal(&self, face: usize) -> Vector3<f32> {
        let [a, b, c] = [0, 1, 2].map(|nth| self.face_vertex(face, nth));
        return normalize_or_keep((b - a).cross(&(c - a)));
    }

    /// Unit normal at corner `nth` of `face`, the face normal when the face carries none.
    pub fn normal(&self, face: usize, nth: usize) -> Vector3<f32> {
        return match self.faces[face][nth].normal {
            Some(index) => normalize_or_keep(self.normals[index]),
            None => self.face_normal(face),
        };
    }

    /// Texture coordinate at corner `nth` of `face`, the origin when the face carries none.
    pub fn uv(&self, face: usize, nth: usize) -> Vector2<f32> {
        return match self.faces[face][nth].uv {
            Some(index) => self.uvs[index],
            None => Vector2::zeros(),
        };
    }

    /// Diffuse color at `uv`, white without a diffuse map.
    pub fn diffuse(&self, uv: Vector2<f32>) -> Color {
        return match &self.diffuse_map {
            Some(map) => sample(map, uv),
            None => Color::WHITE,
        };
    }

    /// Specular exponent at `uv`, read from the first channel of the specular map.
    pub fn specular(&self, uv: Vector2<f32>) -> Option<f32> {
        return self.specular_map.as_ref().map(|map| sample(map, uv).r as f32);
    }
}

/// Nearest texel, uv clamped to [0, 1].
fn sample(map: &Image, uv: Vector2<f32>) -> Color {
    let texel = |t: f32, size: u32| ((t.clamp(0.0, 1.0) * size as f32) as u32).min(size.saturating_sub(1));
    let x = texel(uv.x, map.width());
    let y = texel(uv.y, map.height());
    return map.get_pixel(x, y).unwrap_or(Color::WHITE);
}

/// Texture next to the model file. Missing or unreadable textures are reported and skipped.
fn load_texture(model_path: &Path, suffix: &str) -> Option<Image> {
    let stem = model_path.file_stem()?.to_string_lossy();
    let texture_path = model_path.with_file_name(format!("{stem}{suffix}"));
    match Image::read_file(&texture_path) {
        Ok(mut texture) => {
            log::info!("texture file {} loading ok", texture_path.display());
            texture.flip_vertically();
            return Some(texture);
        }
        Err(error) => {
            log::warn!("texture file {} loading failed: {error}", texture_path.display());
            return None;
        }
    }
}
