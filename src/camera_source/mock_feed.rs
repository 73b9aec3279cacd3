//! Synthetic surveillance frame generator
//!
//! Produces a deterministic-content-varying 640x480 frame so motion
//! detection and visual verification stay meaningful without hardware:
//! gradient background, wall-clock timestamp, a labeled sweep disc whose
//! position follows the current second, a fixed overlay grid, and a status
//! box.

use super::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
use chrono::{DateTime, Timelike, Utc};
use image::{Rgb, RgbImage};

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([40, 40, 40]);
const BOX_FILL: Rgb<u8> = Rgb([0, 100, 0]);

/// Synthetic feed state
pub struct SyntheticFeed;

impl SyntheticFeed {
    pub fn new() -> Self {
        Self
    }

    /// Generate the next frame from the current wall clock
    pub fn next_frame(&mut self) -> Frame {
        let now = Utc::now();
        Frame {
            image: render_frame(now),
            captured_at: now,
        }
    }
}

impl Default for SyntheticFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one synthetic frame for the given instant
pub fn render_frame(now: DateTime<Utc>) -> RgbImage {
    let mut img = RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT);

    // Background gradient
    for y in 0..FRAME_HEIGHT {
        let v = (30 + (y * 50) / FRAME_HEIGHT) as u8;
        for x in 0..FRAME_WIDTH {
            img.put_pixel(x, y, Rgb([v, v, v.saturating_add(10)]));
        }
    }

    // Timestamp and channel label
    let stamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    draw_text(&mut img, &stamp, 10, 16, 2, GREEN);
    draw_text(&mut img, "RAILWAY VSS - LIVE", 10, 46, 2, YELLOW);

    // Sweep disc, position a function of the current second
    let second = now.second();
    let x_pos = (second * 600) / 60 + 20;
    fill_circle(&mut img, x_pos as i32, 200, 20, RED);
    draw_text(&mut img, "MOTION", x_pos.saturating_sub(30), 170, 1, WHITE);

    // Overlay grid
    for x in (0..FRAME_WIDTH).step_by(80) {
        for y in 0..FRAME_HEIGHT {
            img.put_pixel(x, y, GRID);
        }
    }
    for y in (0..FRAME_HEIGHT).step_by(60) {
        for x in 0..FRAME_WIDTH {
            img.put_pixel(x, y, GRID);
        }
    }

    // Status indicators
    fill_rect(&mut img, 500, 400, 620, 460, BOX_FILL);
    draw_text(&mut img, "RECORDING", 510, 415, 1, WHITE);
    draw_text(&mut img, "AI ACTIVE", 510, 435, 1, WHITE);

    img
}

fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1.min(FRAME_HEIGHT) {
        for x in x0..x1.min(FRAME_WIDTH) {
            img.put_pixel(x, y, color);
        }
    }
}

fn fill_circle(img: &mut RgbImage, cx: i32, cy: i32, r: i32, color: Rgb<u8>) {
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if x >= 0 && y >= 0 && (x as u32) < FRAME_WIDTH && (y as u32) < FRAME_HEIGHT {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Draw text with the built-in 5x7 glyph table. Unknown characters render
/// as blanks.
fn draw_text(img: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let mut cursor = x;
    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..5u32 {
                    if bits & (0x10 >> col) == 0 {
                        continue;
                    }
                    for sy in 0..scale {
                        for sx in 0..scale {
                            let px = cursor + col * scale + sx;
                            let py = y + row as u32 * scale + sy;
                            if px < FRAME_WIDTH && py < FRAME_HEIGHT {
                                img.put_pixel(px, py, color);
                            }
                        }
                    }
                }
            }
        }
        cursor += 6 * scale;
    }
}

/// 5x7 bitmap glyphs, one row per byte, bit 4 is the left column
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ':' => [0x00, 0x04, 0x04, 0x00, 0x04, 0x04, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        _ => return None,
    };
    Some(rows)
}
