//! GIF playback as a scene.
//!
//! `ClipSource` loads a single animated GIF from disk, composites its
//! frames onto a persistent canvas (GIFs describe successive frames as
//! partial-region updates, not full repaints), resizes each composited
//! frame once to the target matrix resolution, and then plays them back
//! at their authored timing. A frame whose authored delay decodes to zero
//! — common in GIFs exported by tools that assume a 100ms default — is
//! rewritten to 100ms so playback doesn't spin through zero-duration
//! frames instantly.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{imageops, AnimationDecoder, DynamicImage, RgbImage};
use thiserror::Error;

use crate::scene::{Scene, SceneError};
use crate::state::State;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode GIF {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("GIF {0} has no frames")]
    Empty(String),
}

pub struct ClipSource {
    path: PathBuf,
    frames: Vec<(RgbImage, Duration)>,
    current: usize,
    accumulated: Duration,
}

impl ClipSource {
    /// Decodes `path` and resizes every composited frame to `width` x
    /// `height` using a high-quality filter, since this happens once at
    /// load time rather than per tick.
    pub fn load(path: &Path, width: u32, height: u32) -> Result<Self, ClipError> {
        let file = File::open(path).map_err(|e| ClipError::Io { path: path.display().to_string(), source: e })?;
        let decoder = image::codecs::gif::GifDecoder::new(file)
            .map_err(|e| ClipError::Decode { path: path.display().to_string(), source: e })?;
        let gif_frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| ClipError::Decode { path: path.display().to_string(), source: e })?;

        if gif_frames.is_empty() {
            return Err(ClipError::Empty(path.display().to_string()));
        }

        let (canvas_w, canvas_h) = gif_frames.iter().fold((1u32, 1u32), |(mw, mh), f| {
            let buf = f.buffer();
            (mw.max(f.left() + buf.width()), mh.max(f.top() + buf.height()))
        });

        let mut canvas = image::RgbaImage::new(canvas_w, canvas_h);
        let mut frames = Vec::with_capacity(gif_frames.len());

        for frame in gif_frames {
            imageops::overlay(&mut canvas, frame.buffer(), frame.left() as i64, frame.top() as i64);

            let (numer, denom) = frame.delay().numer_denom_ms();
            let ms = if denom == 0 { 0 } else { numer / denom };
            let delay = if ms == 0 { Duration::from_millis(100) } else { Duration::from_millis(ms as u64) };

            let resized = DynamicImage::ImageRgba8(canvas.clone())
                .resize_exact(width, height, imageops::FilterType::Lanczos3)
                .to_rgb8();
            frames.push((resized, delay));
        }

        Ok(Self { path: path.to_path_buf(), frames, current: 0, accumulated: Duration::ZERO })
    }
}

impl Scene for ClipSource {
    fn enter(&mut self, _state: &State) -> Result<(), SceneError> {
        self.current = 0;
        self.accumulated = Duration::ZERO;
        Ok(())
    }

    fn update(&mut self, _state: &State, dt: Duration) -> Result<(), SceneError> {
        if self.frames.is_empty() {
            return Ok(());
        }
        self.accumulated += dt;
        loop {
            let delay = self.frames[self.current].1;
            if self.accumulated < delay {
                break;
            }
            self.accumulated -= delay;
            self.current = (self.current + 1) % self.frames.len();
        }
        Ok(())
    }

    fn draw(&mut self, _state: &State, surface: &mut crate::device::Surface) -> Result<(), SceneError> {
        if let Some((frame, _)) = self.frames.get(self.current) {
            surface.set_image(&DynamicImage::ImageRgb8(frame.clone()));
        }
        Ok(())
    }

    fn filename(&self) -> Option<&str> {
        self.path.to_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, GenericImageView};
    use tempfile::tempdir;

    fn write_test_gif(path: &Path, delays_ms: &[u32]) {
        let file = File::create(path).unwrap();
        let mut encoder = GifEncoder::new(file);
        for (i, &ms) in delays_ms.iter().enumerate() {
            let shade = (i as u8 + 1) * 50;
            let buf = image::RgbaImage::from_pixel(4, 4, image::Rgba([shade, shade, shade, 255]));
            let frame = image::Frame::from_parts(buf, 0, 0, Delay::from_numer_denom_ms(ms, 1));
            encoder.encode_frame(frame).unwrap();
        }
    }

    #[test]
    fn loads_frames_and_resizes_to_target_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        write_test_gif(&path, &[100, 100]);

        let clip = ClipSource::load(&path, 8, 8).unwrap();
        assert_eq!(clip.frames.len(), 2);
        assert_eq!(clip.frames[0].0.dimensions(), (8, 8));
    }

    #[test]
    fn zero_delay_frames_are_rewritten_to_100ms() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        write_test_gif(&path, &[0]);

        let clip = ClipSource::load(&path, 4, 4).unwrap();
        assert_eq!(clip.frames[0].1, Duration::from_millis(100));
    }

    #[test]
    fn update_advances_and_wraps_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        write_test_gif(&path, &[10, 10]);

        let mut clip = ClipSource::load(&path, 4, 4).unwrap();
        let state = State::load(dir.path());
        clip.update(&state, Duration::from_millis(25)).unwrap();
        assert_eq!(clip.current, 0);
    }

    #[test]
    fn missing_file_errors() {
        let dir = tempdir().unwrap();
        let err = ClipSource::load(&dir.path().join("nope.gif"), 4, 4).unwrap_err();
        assert!(matches!(err, ClipError::Io { .. }));
    }
}
