use std::path::{Path, PathBuf};

use derive_more::{Display, Error};
use image::{imageops, Rgb, RgbImage};

/// Struct, representing raw rgb8 pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        return Self { r, g, b };
    }

    pub const fn gray(value: u8) -> Self {
        return Self { r: value, g: value, b: value };
    }

    /// Every channel multiplied by `intensity`, clamped to the displayable range.
    pub fn scale(self, intensity: f32) -> Color {
        return Color {
            r: to_channel(self.r as f32 * intensity),
            g: to_channel(self.g as f32 * intensity),
            b: to_channel(self.b as f32 * intensity),
        };
    }
}

fn to_channel(value: f32) -> u8 {
    // NaN saturates to 0 through the cast.
    return value.clamp(0.0, 255.0) as u8;
}

impl From<Rgb<u8>> for Color {
    fn from(pixel: Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        return Color { r, g, b };
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        return Rgb([color.r, color.g, color.b]);
    }
}

#[derive(Debug, Display, Error)]
pub enum FrameError {
    #[display("cannot read image at {}: {error}", path.display())]
    Read { path: PathBuf, error: image::ImageError },
    #[display("cannot write image to {}: {error}", path.display())]
    Write { path: PathBuf, error: image::ImageError },
}

/// Image, holding rgb8 pixel data.
/// While rendering, (0, 0) is the bottom left pixel; flip before writing to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pixels: RgbImage,
}

impl Image {
    /// New black image.
    pub fn new(width: u32, height: u32) -> Image {
        return Image {
            pixels: RgbImage::new(width, height),
        };
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Image {
        return Image {
            pixels: RgbImage::from_pixel(width, height, color.into()),
        };
    }

    pub fn width(&self) -> u32 {
        return self.pixels.width();
    }

    pub fn height(&self) -> u32 {
        return self.pixels.height();
    }

    /// Checking if coordinate is in image bounds.
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        return x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height();
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color> {
        return self.pixels.get_pixel_checked(x, y).map(|pixel| Color::from(*pixel));
    }

    /// Sets image pixel to a color at specified coordinate.
    /// Coordinates outside of the image are ignored, returns whether the pixel was written.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.pixels.put_pixel(x as u32, y as u32, color.into());
        return true;
    }

    pub fn flip_vertically(&mut self) {
        imageops::flip_vertical_in_place(&mut self.pixels);
    }

    /// Reads any format the `image` crate recognizes, converted to rgb8.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Image, FrameError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|error| FrameError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        return Ok(Image {
            pixels: decoded.to_rgb8(),
        });
    }

    /// Output format is picked from the file extension.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), FrameError> {
        let path = path.as_ref();
        return self.pixels.save(path).map_err(|error| FrameError::Write {
            path: path.to_path_buf(),
            error,
        });
    }

    pub fn as_raw(&self) -> &[u8] {
        return self.pixels.as_raw();
    }
}

/// Per-pixel depth record, larger values are closer to the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    depths: Vec<f32>,
}

impl DepthBuffer {
    /// Value of a pixel nothing was drawn to.
    pub const FAR: f32 = f32::MIN;

    pub fn new(width: u32, height: u32) -> DepthBuffer {
        return DepthBuffer {
            width,
            height,
            depths: vec![Self::FAR; width as usize * height as usize],
        };
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        return Some(x as usize + y as usize * self.width as usize);
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        return self.index(x, y).map(|index| self.depths[index]);
    }

    pub(crate) fn set(&mut self, x: u32, y: u32, depth: f32) {
        if let Some(index) = self.index(x, y) {
            self.depths[index] = depth;
        }
    }

    /// Grayscale picture of the buffer: the nearest written depth is white,
    /// the farthest written depth is black, as are pixels nothing was drawn to.
    pub fn to_image(&self) -> Image {
        let written = self.depths.iter().copied().filter(|z| *z != Self::FAR);
        let (z_min, z_max) = written.fold((f32::MAX, f32::MIN), |(lo, hi), z| (lo.min(z), hi.max(z)));
        let scale = z_max - z_min;

        let mut image = Image::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let z = self.depths[x as usize + y as usize * self.width as usize];
                if z == Self::FAR {
                    continue;
                }
                let level = if scale > 0.0 { (z - z_min) / scale * 255.0 } else { 255.0 };
                image.set_pixel(x as i32, y as i32, Color::gray(to_channel(level)));
            }
        }
        return image;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_clamps_to_display_range() {
        assert_eq!(Color::new(200, 100, 0).scale(2.0), Color::new(255, 200, 0));
        assert_eq!(Color::WHITE.scale(-0.5), Color::BLACK);
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut image = Image::new(4, 3);
        assert!(!image.set_pixel(-1, 0, Color::WHITE));
        assert!(!image.set_pixel(4, 0, Color::WHITE));
        assert!(!image.set_pixel(0, 3, Color::WHITE));
        assert!(image.set_pixel(3, 2, Color::WHITE));
        assert_eq!(image.get_pixel(3, 2), Some(Color::WHITE));
        assert_eq!(image.get_pixel(4, 2), None);
    }

    #[test]
    fn flip_swaps_rows() {
        let mut image = Image::new(2, 3);
        image.set_pixel(1, 0, Color::RED);
        image.flip_vertically();
        assert_eq!(image.get_pixel(1, 2), Some(Color::RED));
        assert_eq!(image.get_pixel(1, 0), Some(Color::BLACK));
    }

    #[test]
    fn image_file_round_trip() {
        let path = std::env::temp_dir().join("tiny_rasterizer_frame_round_trip.png");
        let mut image = Image::filled(3, 2, Color::new(10, 20, 30));
        image.set_pixel(2, 1, Color::RED);
        image.write_file(&path).unwrap();
        let loaded = Image::read_file(&path).unwrap();
        assert_eq!(loaded, image);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = Image::read_file("/definitely/not/here.tga");
        assert!(matches!(result, Err(FrameError::Read { .. })));
    }

    #[test]
    fn depth_buffer_starts_far() {
        let depth = DepthBuffer::new(2, 2);
        assert_eq!(depth.get(1, 1), Some(DepthBuffer::FAR));
        assert_eq!(depth.get(2, 0), None);
    }

    #[test]
    fn depth_image_normalizes_written_values() {
        let mut depth = DepthBuffer::new(3, 1);
        depth.set(0, 0, 10.0);
        depth.set(1, 0, 20.0);
        let image = depth.to_image();
        assert_eq!(image.get_pixel(0, 0), Some(Color::BLACK));
        assert_eq!(image.get_pixel(1, 0), Some(Color::WHITE));
        assert_eq!(image.get_pixel(2, 0), Some(Color::BLACK));
    }
}
