//! Detection overlays drawn onto an RGB copy of the input image.

use houghlab::{Circle, LineSegment};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

const CENTER_DOT_RADIUS: i32 = 2;

/// Draw each segment as a 3 px green stroke.
pub fn draw_segments(canvas: &mut RgbImage, segments: &[LineSegment]) {
    for s in segments {
        let (x1, y1, x2, y2) = (s.x1 as f32, s.y1 as f32, s.x2 as f32, s.y2 as f32);
        let len = s.length();
        let (nx, ny) = if len > 0.0 {
            (-(y2 - y1) / len, (x2 - x1) / len)
        } else {
            (0.0, 0.0)
        };
        for o in [-1.0f32, 0.0, 1.0] {
            draw_line_segment_mut(
                canvas,
                (x1 + o * nx, y1 + o * ny),
                (x2 + o * nx, y2 + o * ny),
                GREEN,
            );
        }
    }
}

/// Draw each circle as a 2 px green outline with a red center dot.
pub fn draw_circles(canvas: &mut RgbImage, circles: &[Circle]) {
    for c in circles {
        let center = (c.cx as i32, c.cy as i32);
        let r = c.radius as i32;
        draw_hollow_circle_mut(canvas, center, r, GREEN);
        draw_hollow_circle_mut(canvas, center, r + 1, GREEN);
        draw_filled_circle_mut(canvas, center, CENTER_DOT_RADIUS, RED);
    }
}
