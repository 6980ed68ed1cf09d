use std::path::PathBuf;
use std::process::exit;

use clap::Parser as _;
use nalgebra::{vector, Vector3};

use tiny_rasterizer::app::{self, Params};
use tiny_rasterizer::raster::DepthPolicy;
use tiny_rasterizer::scene::shader::ShaderKind;
use tiny_rasterizer::scene::{Camera, SceneSettings};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 800;

#[derive(Debug, Clone, clap::Parser)]
#[command(about = "Renders a Wavefront obj model to an image file in software")]
struct ProgramArgs {
    /// The obj model to render. Textures named `<model>_diffuse.tga` and `<model>_spec.tga`
    /// are picked up from the same directory.
    #[clap(short = 'p', long = "model", default_value = "assets/african_head.obj")]
    model: PathBuf,
    /// Output image, format chosen from the extension.
    #[clap(short = 'o', long = "output", default_value = "output.png")]
    output: PathBuf,
    /// Also write the depth buffer as a grayscale image.
    #[clap(short = 'z', long = "depth-output")]
    depth_output: Option<PathBuf>,
    /// Lighting model: flat, gouraud, textured or phong.
    #[clap(short = 's', long = "shader", default_value_t = ShaderKind::Gouraud)]
    shader: ShaderKind,
    /// Draw face edges only.
    #[clap(short = 'w', long = "wireframe")]
    wireframe: bool,
    #[clap(short = 'W', long = "width", default_value_t = WIDTH)]
    width: u32,
    #[clap(short = 'H', long = "height", default_value_t = HEIGHT)]
    height: u32,
    /// Camera position as `x,y,z`.
    #[clap(long = "eye", value_parser = parse_vec3, default_value = "1,1,3")]
    eye: Vector3<f32>,
    /// Point the camera looks at as `x,y,z`.
    #[clap(long = "center", value_parser = parse_vec3, default_value = "0,0,0")]
    center: Vector3<f32>,
    #[clap(long = "up", value_parser = parse_vec3, default_value = "0,1,0")]
    up: Vector3<f32>,
    /// Direction towards the light as `x,y,z`.
    #[clap(long = "light", value_parser = parse_vec3, default_value = "1,1,1")]
    light: Vector3<f32>,
    /// When depth is written: commit-on-shade keeps discarded fragments from occluding,
    /// commit-before-shade lets them occlude what is drawn after them.
    #[clap(long = "depth-policy", default_value_t = DepthPolicy::CommitOnShade)]
    depth_policy: DepthPolicy,
}

fn parse_vec3(s: &str) -> Result<Vector3<f32>, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected three comma separated numbers, got {s:?}"));
    }
    let mut v = vector![0.0, 0.0, 0.0];
    for (i, part) in parts.iter().enumerate() {
        v[i] = part.parse::<f32>().map_err(|error| format!("{part:?}: {error}"))?;
    }
    return Ok(v);
}

impl ProgramArgs {
    fn into_params(self) -> Params {
        return Params {
            model_path: self.model,
            output_path: self.output,
            depth_output_path: self.depth_output,
            shader: self.shader,
            wireframe: self.wireframe,
            scene: SceneSettings {
                width: self.width,
                height: self.height,
                camera: Camera {
                    eye: self.eye,
                    center: self.center,
                    up: self.up,
                },
                light_direction: self.light,
                depth_policy: self.depth_policy,
                ..SceneSettings::default()
            },
            ..Params::default()
        };
    }
}

fn main() {
    env_logger::init();

    let params = ProgramArgs::parse().into_params();
    if let Err(error) = app::run(&params) {
        log::error!("render failed: {error}");
        exit(1);
    }
}
