//! Frame overlays: selection rectangles, face boxes, and their labels.
//!
//! Labels are rasterized from a built-in 5x7 glyph table instead of a
//! bundled font file; the overlay vocabulary is digits, `x`, and `FACE`.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::FaceBox;
use crate::roi::RoiSelector;

const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// Draws the live or committed selection rectangle, with a `WxH` dimension
/// label above the top-left corner while the rectangle is visible.
pub fn draw_selection(frame: &mut RgbImage, selector: &RoiSelector) {
    let Some((x1, y1, x2, y2)) = selector.display_rect() else {
        return;
    };
    let w = x2 - x1;
    let h = y2 - y1;
    // The drag endpoints are inclusive corners.
    draw_box(frame, x1, y1, w + 1, h + 1);

    let label = format!("{}x{}", w, h);
    let ly = y1.saturating_sub(GLYPH_H + 2);
    draw_label(frame, x1, ly, &label);
}

/// Draws a rectangle and `FACE` tag over each detection.
pub fn draw_face_boxes(frame: &mut RgbImage, boxes: &[FaceBox]) {
    for b in boxes {
        draw_box(frame, b.x, b.y, b.width, b.height);
        let ly = b.y.saturating_sub(GLYPH_H + 2);
        draw_label(frame, b.x, ly, "FACE");
    }
}

// 2px hollow rectangle, clipped by imageproc.
fn draw_box(frame: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
    draw_hollow_rect_mut(
        frame,
        Rect::at(x as i32, y as i32).of_size(w.max(1), h.max(1)),
        OVERLAY_COLOR,
    );
    if w > 2 && h > 2 {
        draw_hollow_rect_mut(
            frame,
            Rect::at(x as i32 + 1, y as i32 + 1).of_size(w - 2, h - 2),
            OVERLAY_COLOR,
        );
    }
}

fn draw_label(frame: &mut RgbImage, x: u32, y: u32, text: &str) {
    let mut cursor = x;
    for ch in text.chars() {
        let Some(rows) = glyph(ch) else {
            cursor += GLYPH_W + 1;
            continue;
        };
        for (dy, row) in rows.iter().enumerate() {
            for dx in 0..GLYPH_W {
                if row & (0b10000 >> dx) != 0 {
                    let px = cursor + dx;
                    let py = y + dy as u32;
                    if px < frame.width() && py < frame.height() {
                        frame.put_pixel(px, py, OVERLAY_COLOR);
                    }
                }
            }
        }
        cursor += GLYPH_W + 1;
    }
}

// 5x7 glyphs, one u8 per row, high bit of the low five = leftmost column.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'x' => [0b00000, 0b00000, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        _ => return None,
    };
    Some(rows)
}
