//! MotionDetector - Per-Camera Background Model
//!
//! ## Responsibilities
//!
//! - Maintain an exponentially updated per-pixel mean/variance model
//! - Classify each frame against the model and count foreground pixels
//!
//! The count is the motion magnitude handed to the event trigger. The very
//! first frame only seeds the model, so no magnitude is emitted for it.
//! Given the same running state and frame, `observe` is deterministic.

use crate::camera_source::Frame;

/// Background update rate
const ALPHA: f32 = 0.05;
/// Foreground threshold in standard deviations
const K: f32 = 2.5;
/// Initial and minimum per-pixel variance (guards divide-by-near-zero on
/// static scenes)
const VAR_INIT: f32 = 400.0;
const VAR_FLOOR: f32 = 50.0;

/// Per-camera motion detector state
pub struct MotionDetector {
    width: u32,
    height: u32,
    mean: Vec<f32>,
    var: Vec<f32>,
}

impl MotionDetector {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            mean: Vec::new(),
            var: Vec::new(),
        }
    }

    /// Feed one frame. Returns the motion magnitude (foreground pixel
    /// count), or None when this frame only seeded the model.
    pub fn observe(&mut self, frame: &Frame) -> Option<u32> {
        let (w, h) = (frame.image.width(), frame.image.height());
        let gray = grayscale(frame);

        if self.mean.is_empty() || self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.mean = gray;
            self.var = vec![VAR_INIT; (w * h) as usize];
            return None;
        }

        let k2 = K * K;
        let mut foreground: u32 = 0;
        for i in 0..gray.len() {
            let d = gray[i] - self.mean[i];
            let v = self.var[i].max(VAR_FLOOR);
            if d * d > k2 * v {
                foreground += 1;
            }
            self.mean[i] += ALPHA * d;
            self.var[i] = ((1.0 - ALPHA) * self.var[i] + ALPHA * d * d).max(VAR_FLOOR);
        }

        Some(foreground)
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn grayscale(frame: &Frame) -> Vec<f32> {
    frame
        .image
        .pixels()
        .map(|p| 0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::{Rgb, RgbImage};

    fn solid_frame(w: u32, h: u32, v: u8) -> Frame {
        Frame {
            image: RgbImage::from_pixel(w, h, Rgb([v, v, v])),
            captured_at: Utc::now(),
        }
    }

    fn frame_with_block(w: u32, h: u32, bg: u8, block: u8) -> Frame {
        let mut image = RgbImage::from_pixel(w, h, Rgb([bg, bg, bg]));
        for y in 10..40 {
            for x in 10..40 {
                image.put_pixel(x, y, Rgb([block, block, block]));
            }
        }
        Frame {
            image,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn first_frame_seeds_without_magnitude() {
        let mut det = MotionDetector::new();
        assert_eq!(det.observe(&solid_frame(64, 48, 100)), None);
    }

    #[test]
    fn static_scene_reports_zero_magnitude() {
        let mut det = MotionDetector::new();
        det.observe(&solid_frame(64, 48, 100));
        assert_eq!(det.observe(&solid_frame(64, 48, 100)), Some(0));
    }

    #[test]
    fn moving_block_reports_its_area() {
        let mut det = MotionDetector::new();
        det.observe(&solid_frame(64, 48, 50));
        let magnitude = det.observe(&frame_with_block(64, 48, 50, 250)).unwrap();
        assert_eq!(magnitude, 30 * 30);
    }

    #[test]
    fn identical_sequences_give_identical_magnitudes() {
        let mut a = MotionDetector::new();
        let mut b = MotionDetector::new();
        for det in [&mut a, &mut b] {
            det.observe(&solid_frame(64, 48, 50));
        }
        let ma = a.observe(&frame_with_block(64, 48, 50, 200));
        let mb = b.observe(&frame_with_block(64, 48, 50, 200));
        assert_eq!(ma, mb);
        assert!(ma.unwrap() > 0);
    }

    #[test]
    fn geometry_change_reseeds_the_model() {
        let mut det = MotionDetector::new();
        det.observe(&solid_frame(64, 48, 50));
        assert_eq!(det.observe(&solid_frame(32, 24, 50)), None);
    }
}
