//! Integer line drawing, independent of the triangle path.

use crate::frame::{Color, Image};
use crate::geometry::round_vec2;
use crate::scene::model::Model;
use crate::scene::FrameContext;

/// Walks the pixels of the segment (x0, y0) - (x1, y1) via Bresenham's algorithm,
/// calling `plot` once per pixel.
///
/// The long axis advances one pixel per step, the short one when the doubled error
/// term passes dx. Endpoints are ordered before walking, so both directions of a
/// segment visit the same pixels.
pub fn bresenham(x0: i32, y0: i32, x1: i32, y1: i32, plot: impl FnMut(i32, i32)) {
    walk(x0, y0, x1, y1, None, plot);
}

/// Bresenham walk, optionally restricted to the steps whose long-axis coordinate lies
/// in a `width` x `height` window. Deltas and error terms are kept in i64, so any pair
/// of i32 endpoints is fine.
fn walk(x0: i32, y0: i32, x1: i32, y1: i32, window: Option<(u32, u32)>, mut plot: impl FnMut(i32, i32)) {
    let (mut x0, mut y0, mut x1, mut y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
    let steep = (x0 - x1).abs() < (y0 - y1).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }
    let dx = x1 - x0;
    let dy = y1 - y0;
    let derror2 = dy.abs() * 2;
    let sy = if y1 > y0 { 1 } else { -1 };

    let (mut first, mut last) = (x0, x1);
    if let Some((width, height)) = window {
        let extent = i64::from(if steep { height } else { width });
        first = first.max(0);
        last = last.min(extent - 1);
        if first > last {
            return;
        }
    }

    // Jump straight to `first`: after k steps the error is 2|dy|k - 2dx*m with m the
    // number of short-axis moves so far, and it always lies in (-dx, dx].
    let k = (first - x0) as i128;
    let dx_wide = dx as i128;
    let moves = if dx == 0 {
        0
    } else {
        -(dx_wide - derror2 as i128 * k).div_euclid(2 * dx_wide)
    };
    let mut y = y0 + sy * moves as i64;
    let mut error2 = (derror2 as i128 * k - 2 * dx_wide * moves) as i64;

    for x in first..=last {
        // Every coordinate lies between the original endpoints, so it fits in i32.
        if steep {
            plot(y as i32, x as i32);
        } else {
            plot(x as i32, y as i32);
        }
        error2 += derror2;
        if error2 > dx {
            y += sy;
            error2 -= dx * 2;
        }
    }
}

/// Draws a line over anything, ignoring the depth buffer. Pixels off the image are skipped.
pub fn draw_line(image: &mut Image, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
    let window = (image.width(), image.height());
    walk(x0, y0, x1, y1, Some(window), |x, y| {
        image.set_pixel(x, y, color);
    });
}

/// Edges of every face of `model`, projected with the frame transform.
pub fn draw_wireframe(model: &Model, ctx: &FrameContext, image: &mut Image, color: Color) {
    for face in 0..model.face_count() {
        let corners = [0, 1, 2].map(|nth| round_vec2(ctx.transform().to_screen(model.face_vertex(face, nth)).xy()));
        for nth in 0..3 {
            let a = corners[nth];
            let b = corners[(nth + 1) % 3];
            draw_line(image, a.x, a.y, b.x, b.y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn pixels(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        bresenham(x0, y0, x1, y1, |x, y| out.push((x, y)));
        return out;
    }

    #[test]
    fn horizontal_line() {
        let expected: Vec<_> = (0..=10).map(|x| (x, 0)).collect();
        assert_eq!(pixels(0, 0, 10, 0), expected);
    }

    #[test]
    fn vertical_line() {
        let expected: Vec<_> = (0..=10).map(|y| (0, y)).collect();
        assert_eq!(pixels(0, 0, 0, 10), expected);
    }

    #[test]
    fn diagonal_line() {
        let expected: Vec<_> = (0..=5).map(|i| (i, i)).collect();
        assert_eq!(pixels(0, 0, 5, 5), expected);
    }

    #[test]
    fn single_point() {
        assert_eq!(pixels(3, -2, 3, -2), vec![(3, -2)]);
    }

    #[test]
    fn every_octant_is_connected_and_symmetric() {
        let ends = [(13, 4), (4, 13), (-4, 13), (-13, 4), (-13, -4), (-4, -13), (4, -13), (13, -4), (7, 7), (-7, 7)];
        for (x1, y1) in ends {
            let forward = pixels(0, 0, x1, y1);
            let backward = pixels(x1, y1, 0, 0);
            assert_eq!(
                forward.iter().collect::<BTreeSet<_>>(),
                backward.iter().collect::<BTreeSet<_>>(),
                "asymmetric line to ({x1}, {y1})"
            );
            assert!(forward.contains(&(0, 0)) && forward.contains(&(x1, y1)));
            assert_eq!(forward.len() as i32, x1.abs().max(y1.abs()) + 1);
            for pair in forward.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                assert!((a.0 - b.0).abs() <= 1 && (a.1 - b.1).abs() <= 1, "gap between {a:?} and {b:?}");
            }
        }
    }

    #[test]
    fn draw_line_clips_to_image() {
        let mut image = Image::new(4, 4);
        draw_line(&mut image, -3, 1, 10, 1, Color::RED);
        for x in 0..4 {
            assert_eq!(image.get_pixel(x, 1), Some(Color::RED));
            assert_eq!(image.get_pixel(x, 0), Some(Color::BLACK));
        }
    }

    #[test]
    fn extreme_endpoints_draw_only_the_visible_part() {
        let mut image = Image::new(4, 4);
        draw_line(&mut image, -2_000_000_000, 0, 2_000_000_000, 0, Color::RED);
        for x in 0..4 {
            assert_eq!(image.get_pixel(x, 0), Some(Color::RED));
            assert_eq!(image.get_pixel(x, 1), Some(Color::BLACK));
        }

        let mut image = Image::new(4, 4);
        draw_line(&mut image, i32::MIN, i32::MIN, i32::MAX, i32::MAX, Color::RED);
        for i in 0..4 {
            assert_eq!(image.get_pixel(i, i), Some(Color::RED));
        }
    }

    #[test]
    fn clipped_walk_matches_full_walk() {
        let segments = [(-50, -37, 80, 61), (70, -9, -30, 20), (5, -40, 9, 90), (-3, 25, 30, -12)];
        for (x0, y0, x1, y1) in segments {
            let mut image = Image::new(16, 16);
            draw_line(&mut image, x0, y0, x1, y1, Color::RED);

            let mut expected = Image::new(16, 16);
            for (x, y) in pixels(x0, y0, x1, y1) {
                expected.set_pixel(x, y, Color::RED);
            }
            assert_eq!(image, expected, "({x0}, {y0}) - ({x1}, {y1})");
        }
    }
}
