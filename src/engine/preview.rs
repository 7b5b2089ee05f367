//! Throttled PNG preview capture.
//!
//! Capturing and encoding a frame on every tick would be wasted work for
//! anything consuming the preview (a status page polled a few times a
//! second, at most). [`PreviewStore`] captures at most once per configured
//! interval and keeps only the latest encoded frame.

use std::io::Cursor;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use image::{imageops, ImageFormat, RgbImage};

/// The integer upscale factor applied before PNG encoding, so a preview
/// image is comfortably visible even though the underlying matrix is tiny.
const PREVIEW_SCALE: u32 = 4;

pub struct PreviewStore {
    latest: Mutex<Option<Vec<u8>>>,
    last_capture: Mutex<Option<Instant>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self { latest: Mutex::new(None), last_capture: Mutex::new(None) }
    }

    /// Captures `frame` and replaces the stored preview if `interval` has
    /// elapsed since the last capture (or none has happened yet). Returns
    /// whether a capture occurred.
    pub fn capture_if_due(&self, frame: &RgbImage, now: Instant, interval: Duration) -> bool {
        {
            let mut last = self.last_capture.lock().expect("preview mutex poisoned");
            if let Some(prev) = *last {
                if now.duration_since(prev) < interval {
                    return false;
                }
            }
            *last = Some(now);
        }

        let upscaled = imageops::resize(
            frame,
            frame.width() * PREVIEW_SCALE,
            frame.height() * PREVIEW_SCALE,
            imageops::FilterType::Nearest,
        );

        let mut buf = Vec::new();
        if let Err(e) = upscaled.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png) {
            log::warn!("failed to encode preview PNG: {e}");
            return false;
        }

        *self.latest.lock().expect("preview mutex poisoned") = Some(buf);
        true
    }

    /// The most recently captured preview frame, PNG-encoded, if any
    /// capture has happened yet.
    pub fn latest(&self) -> Option<Vec<u8>> {
        self.latest.lock().expect("preview mutex poisoned").clone()
    }
}

impl Default for PreviewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_capture_always_happens() {
        let store = PreviewStore::new();
        let frame = RgbImage::new(4, 4);
        assert!(store.capture_if_due(&frame, Instant::now(), Duration::from_millis(200)));
        assert!(store.latest().is_some());
    }

    #[test]
    fn second_capture_within_interval_is_skipped() {
        let store = PreviewStore::new();
        let frame = RgbImage::new(4, 4);
        let t0 = Instant::now();
        assert!(store.capture_if_due(&frame, t0, Duration::from_millis(200)));
        assert!(!store.capture_if_due(&frame, t0 + Duration::from_millis(50), Duration::from_millis(200)));
    }

    #[test]
    fn capture_after_interval_elapses_succeeds() {
        let store = PreviewStore::new();
        let frame = RgbImage::new(4, 4);
        let t0 = Instant::now();
        store.capture_if_due(&frame, t0, Duration::from_millis(200));
        assert!(store.capture_if_due(&frame, t0 + Duration::from_millis(250), Duration::from_millis(200)));
    }
}
