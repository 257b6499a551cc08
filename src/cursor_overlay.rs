//! Cursor overlay module
//!
//! Composites a simple arrow marker onto captured frames, since capture
//! providers return the desktop without the pointer.

use crate::capture::ScreenCapture;
use crate::geometry::Point;

/// Arrow height in pixels
const ARROW_HEIGHT: i32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shade {
    Outline,
    Fill,
}

/// Shade of arrow pixel (dx, dy), or `None` outside the arrow.
///
/// Row `dy` spans columns `0..=dy`; the left column and the diagonal edge
/// are outlined, the bottom row is outlined too.
fn arrow_shade(dx: i32, dy: i32) -> Option<Shade> {
    if dy < 0 || dy >= ARROW_HEIGHT || dx < 0 || dx > dy {
        return None;
    }
    if dx == 0 || dx == dy || dy == ARROW_HEIGHT - 1 {
        Some(Shade::Outline)
    } else {
        Some(Shade::Fill)
    }
}

/// Draw the arrow with its tip at `cursor` (desktop coordinates).
///
/// Returns false when the cursor is outside the frame or the frame is not
/// 32 bpp.
pub fn draw_cursor_on_frame(frame: &mut ScreenCapture, cursor: Point) -> bool {
    if frame.bits_per_pixel != 32 || !frame.area.contains(cursor) {
        return false;
    }

    let origin = cursor - frame.area.top_left();
    let width = frame.width as i32;
    let height = frame.height as i32;

    for dy in 0..ARROW_HEIGHT {
        for dx in 0..=dy {
            let Some(shade) = arrow_shade(dx, dy) else {
                continue;
            };
            let px = origin.x + dx;
            let py = origin.y + dy;
            if px >= width || py >= height {
                continue;
            }

            let offset = ((py * width + px) * 4) as usize;
            let Some(pixel) = frame.data.get_mut(offset..offset + 4) else {
                continue;
            };
            let value = match shade {
                Shade::Outline => 255,
                Shade::Fill => 0,
            };
            // BGRA
            pixel.copy_from_slice(&[value, value, value, 255]);
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;
    use std::time::Instant;

    fn gray_frame() -> ScreenCapture {
        ScreenCapture {
            area: Rectangle::new(10, 10, 20, 20),
            width: 20,
            height: 20,
            bits_per_pixel: 32,
            data: vec![128; 20 * 20 * 4],
            timestamp: Instant::now(),
            sequence: 0,
        }
    }

    fn pixel(frame: &ScreenCapture, x: i32, y: i32) -> &[u8] {
        let offset = ((y * frame.width as i32 + x) * 4) as usize;
        &frame.data[offset..offset + 4]
    }

    #[test]
    fn tip_is_outlined_and_body_filled() {
        let mut frame = gray_frame();
        assert!(draw_cursor_on_frame(&mut frame, Point::new(12, 12)));

        assert_eq!(pixel(&frame, 2, 2), &[255, 255, 255, 255]);
        assert_eq!(pixel(&frame, 3, 6), &[0, 0, 0, 255]);
        // right of the diagonal is untouched
        assert_eq!(pixel(&frame, 8, 4), &[128, 128, 128, 128]);
    }

    #[test]
    fn cursor_outside_frame_is_ignored() {
        let mut frame = gray_frame();
        let before = frame.data.clone();
        assert!(!draw_cursor_on_frame(&mut frame, Point::new(0, 0)));
        assert_eq!(frame.data, before);
    }

    #[test]
    fn arrow_clips_at_frame_edge() {
        let mut frame = gray_frame();
        assert!(draw_cursor_on_frame(&mut frame, Point::new(29, 29)));
        assert_eq!(pixel(&frame, 19, 19), &[255, 255, 255, 255]);
    }
}
