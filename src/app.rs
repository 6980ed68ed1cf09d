use std::path::PathBuf;

use derive_more::{Display, Error, From};

use crate::frame::{Color, FrameError};
use crate::line::draw_wireframe;
use crate::scene::model::{Model, ModelError};
use crate::scene::shader::ShaderKind;
use crate::scene::{render, Frame, FrameContext, FrameStats, SceneError, SceneSettings};

#[derive(Debug, Display, Error, From)]
pub enum RenderError {
    #[display("{_0}")]
    Model(ModelError),
    #[display("{_0}")]
    Scene(SceneError),
    #[display("{_0}")]
    Frame(FrameError),
}

/// Everything needed to render one image of one model.
#[derive(Debug, Clone)]
pub struct Params {
    pub model_path: PathBuf,
    pub output_path: PathBuf,
    /// Where to write a grayscale picture of the depth buffer, if anywhere.
    pub depth_output_path: Option<PathBuf>,
    pub shader: ShaderKind,
    /// Draw face edges instead of shaded faces.
    pub wireframe: bool,
    pub clear_color: Color,
    pub wire_color: Color,
    pub scene: SceneSettings,
}

impl Default for Params {
    fn default() -> Self {
        return Params {
            model_path: PathBuf::from("assets/african_head.obj"),
            output_path: PathBuf::from("output.png"),
            depth_output_path: None,
            shader: ShaderKind::default(),
            wireframe: false,
            clear_color: Color::BLACK,
            wire_color: Color::WHITE,
            scene: SceneSettings::default(),
        };
    }
}

/// Loads the model, renders one frame and writes it out.
pub fn run(params: &Params) -> Result<FrameStats, RenderError> {
    let model = Model::load(&params.model_path)?;
    let ctx = FrameContext::new(&params.scene)?;
    let mut frame = Frame::new(&ctx, params.clear_color);

    let stats = if params.wireframe {
        draw_wireframe(&model, &ctx, &mut frame.image, params.wire_color);
        FrameStats {
            faces: model.face_count(),
            ..FrameStats::default()
        }
    } else {
        let mut shader = params.shader.build(&model, &ctx);
        render(&model, shader.as_mut(), &ctx, &mut frame)
    };
    log::info!(
        "{} faces drawn with {} into {}x{}",
        stats.faces,
        if params.wireframe { "wireframe".to_string() } else { params.shader.to_string() },
        ctx.width(),
        ctx.height()
    );

    // Origin is in the bottom left while rendering, image files expect it in the top left.
    frame.image.flip_vertically();
    frame.image.write_file(&params.output_path)?;
    log::info!("wrote {}", params.output_path.display());

    if let Some(depth_path) = &params.depth_output_path {
        let mut depth_image = frame.depth.to_image();
        depth_image.flip_vertically();
        depth_image.write_file(depth_path)?;
        log::info!("wrote depth buffer to {}", depth_path.display());
    }

    return Ok(stats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Image;

    const TRIANGLE: &str = "\
v -0.5 -0.5 0
v 0.5 -0.5 0
v 0 0.5 0
vn 0 0 1
f 1//1 2//1 3//1
";

    fn scratch(name: &str) -> PathBuf {
        return std::env::temp_dir().join(format!("tiny_rasterizer_app_{name}"));
    }

    fn params_for(name: &str) -> Params {
        let model_path = scratch(&format!("{name}.obj"));
        std::fs::write(&model_path, TRIANGLE).unwrap();
        let mut params = Params {
            model_path,
            output_path: scratch(&format!("{name}.png")),
            ..Params::default()
        };
        params.scene.width = 32;
        params.scene.height = 32;
        params.scene.light_direction = nalgebra::vector![0.0, 0.0, 1.0];
        params.scene.camera.eye = nalgebra::vector![0.0, 0.0, 3.0];
        return params;
    }

    #[test]
    fn run_writes_image_and_depth() {
        let mut params = params_for("shaded");
        params.depth_output_path = Some(scratch("shaded_depth.png"));
        let stats = run(&params).unwrap();
        assert_eq!(stats.faces, 1);
        assert!(stats.pixels_written > 0);

        let image = Image::read_file(&params.output_path).unwrap();
        assert_eq!((image.width(), image.height()), (32, 32));
        // Flipped on write, so row 16 from the top is row 15 from the bottom.
        assert_ne!(image.get_pixel(16, 16), Some(Color::BLACK));
        assert_eq!(image.get_pixel(0, 0), Some(Color::BLACK));
        assert!(Image::read_file(scratch("shaded_depth.png")).is_ok());
    }

    #[test]
    fn run_draws_wireframe() {
        let mut params = params_for("wire");
        params.wireframe = true;
        let stats = run(&params).unwrap();
        assert_eq!(stats.pixels_written, 0);
        let image = Image::read_file(&params.output_path).unwrap();
        assert!(image.as_raw().iter().any(|c| *c == 255));
    }

    #[test]
    fn missing_model_is_reported() {
        let params = Params {
            model_path: scratch("absent.obj"),
            ..Params::default()
        };
        assert!(matches!(run(&params), Err(RenderError::Model(ModelError::Io { .. }))));
    }
}
