//! Software rendering of triangle meshes: camera transforms, a barycentric rasterizer
//! with a depth buffer, and programmable vertex/fragment shading, all on the CPU.

pub mod app;
pub mod frame;
pub mod geometry;
pub mod line;
pub mod raster;
pub mod scene;
pub mod transform;
