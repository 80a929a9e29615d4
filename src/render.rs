//! Diagnostic mesh overlay.

use crate::image::{GrayImage, ImageAccess};
use crate::types::Triangle;

/// Intensity used for mesh edges, matching the traditional black overlay.
const EDGE_INTENSITY: u8 = 0;

/// Draw the three edges of every triangle over a copy of the image.
///
/// No transform is applied; this is a purely diagnostic aid for inspecting a
/// triangulation stored on a record.
pub fn draw_mesh<I: ImageAccess>(image: &I, triangles: &[Triangle]) -> GrayImage {
    let mut out = GrayImage::copy_from(image);
    for t in triangles {
        let [a, b, c] = *t.vertices();
        draw_line(&mut out, a.x, a.y, b.x, b.y);
        draw_line(&mut out, b.x, b.y, c.x, c.y);
        draw_line(&mut out, c.x, c.y, a.x, a.y);
    }
    out
}

/// 1-px Bresenham line segment.
fn draw_line(image: &mut GrayImage, x0: f32, y0: f32, x1: f32, y1: f32) {
    let mut x = x0.round() as i32;
    let mut y = y0.round() as i32;
    let xe = x1.round() as i32;
    let ye = y1.round() as i32;

    let dx = (xe - x).abs();
    let dy = -(ye - y).abs();
    let sx = if x < xe { 1 } else { -1 };
    let sy = if y < ye { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        image.set_pixel(x, y, EDGE_INTENSITY);
        if x == xe && y == ye {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
