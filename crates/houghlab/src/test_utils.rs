//! Synthetic images shared by the unit tests.

use image::{GrayImage, Luma};

/// Filled disks of intensity `fg` on a `bg` background.
///
/// A pixel belongs to a disk when its distance to the disk center is at most
/// the radius.
pub(crate) fn draw_disk_image(
    w: u32,
    h: u32,
    disks: &[((u32, u32), f32)],
    fg: u8,
    bg: u8,
) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let inside = disks.iter().any(|&((cx, cy), r)| {
            let dx = x as f32 - cx as f32;
            let dy = y as f32 - cy as f32;
            dx * dx + dy * dy <= r * r
        });
        Luma([if inside { fg } else { bg }])
    })
}

/// A straight stroke of width `thickness` from `a` to `b`, `fg` on `bg`.
pub(crate) fn draw_line_image(
    w: u32,
    h: u32,
    a: (f32, f32),
    b: (f32, f32),
    thickness: f32,
    fg: u8,
    bg: u8,
) -> GrayImage {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = (dx * dx + dy * dy).max(f32::EPSILON);
    let half = thickness * 0.5;
    GrayImage::from_fn(w, h, |x, y| {
        let (px, py) = (x as f32 - a.0, y as f32 - a.1);
        let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);
        let (ex, ey) = (px - t * dx, py - t * dy);
        Luma([if ex * ex + ey * ey <= half * half { fg } else { bg }])
    })
}
