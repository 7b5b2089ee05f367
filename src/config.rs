//! Engine configuration.
//!
//! [`EngineConfig`] controls the render loop's timing and fault-containment
//! constants, the matrix dimensions, and the on-disk data root. Use
//! [`EngineConfig::default`] for sensible out-of-the-box values, or
//! [`EngineConfig::builder`] to override individual fields.
//!
//! # Examples
//!
//! ```
//! use ledmatrix_engine::EngineConfig;
//!
//! let cfg = EngineConfig::default();
//! assert_eq!(cfg.target_fps, 60);
//! assert_eq!(cfg.max_consec_errors, 10);
//! ```
//!
//! ```
//! use std::time::Duration;
//! use ledmatrix_engine::EngineConfig;
//!
//! let cfg = EngineConfig::builder()
//!     .dimensions(32, 32)
//!     .target_fps(30)
//!     .preview_interval(Duration::from_millis(500))
//!     .build()
//!     .unwrap();
//! assert_eq!(cfg.width, 32);
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error returned by [`EngineConfigBuilder::build`] when fields are nonsensical.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineConfigError {
    #[error("target_fps must be non-zero")]
    ZeroFps,
    #[error("matrix dimensions must be non-zero (got {width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },
}

/// Global, process-wide engine configuration.
///
/// Fields cover the render loop's timing: frame pacing, preview throttling,
/// FPS monitoring, and the fault-containment threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Matrix width in pixels.
    pub width: u32,
    /// Matrix height in pixels.
    pub height: u32,
    /// Initial brightness, 0..=100.
    pub initial_brightness: u8,
    /// Target render-loop frame rate.
    pub target_fps: u32,
    /// How often a preview frame is captured and PNG-encoded.
    pub preview_interval: Duration,
    /// Consecutive scene-fault count that trips the "clear active scene" branch.
    pub max_consec_errors: u32,
    /// Width of the sliding window used to compute the reported FPS.
    pub fps_window: Duration,
    /// Below this FPS, a throttled warning is logged.
    pub fps_warn_threshold: f64,
    /// Minimum time between FPS warnings.
    pub fps_log_throttle: Duration,
    /// Maximum `dt` passed to `Scene::update`, regardless of actual elapsed time.
    pub dt_cap: Duration,
    /// Root directory for `data/*.json` persistence.
    pub data_root: PathBuf,
    /// Root directory for `scenes/{scripts,clips,thumbnails}`.
    pub assets_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            initial_brightness: 100,
            target_fps: 60,
            preview_interval: Duration::from_millis(200),
            max_consec_errors: 10,
            fps_window: Duration::from_secs(2),
            fps_warn_threshold: 40.0,
            fps_log_throttle: Duration::from_secs(5),
            dt_cap: Duration::from_secs(1),
            data_root: PathBuf::from("data"),
            assets_root: PathBuf::from("scenes"),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// `1 / target_fps` as a [`Duration`].
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps as f64)
    }
}

/// Fluent builder for [`EngineConfig`], validated on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    cfg: PartialConfig,
}

#[derive(Debug, Default)]
struct PartialConfig {
    width: Option<u32>,
    height: Option<u32>,
    initial_brightness: Option<u8>,
    target_fps: Option<u32>,
    preview_interval: Option<Duration>,
    max_consec_errors: Option<u32>,
    fps_window: Option<Duration>,
    fps_warn_threshold: Option<f64>,
    fps_log_throttle: Option<Duration>,
    dt_cap: Option<Duration>,
    data_root: Option<PathBuf>,
    assets_root: Option<PathBuf>,
}

impl EngineConfigBuilder {
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.cfg.width = Some(width);
        self.cfg.height = Some(height);
        self
    }

    pub fn initial_brightness(mut self, brightness: u8) -> Self {
        self.cfg.initial_brightness = Some(brightness.min(100));
        self
    }

    pub fn target_fps(mut self, fps: u32) -> Self {
        self.cfg.target_fps = Some(fps);
        self
    }

    pub fn preview_interval(mut self, interval: Duration) -> Self {
        self.cfg.preview_interval = Some(interval);
        self
    }

    pub fn max_consec_errors(mut self, n: u32) -> Self {
        self.cfg.max_consec_errors = Some(n);
        self
    }

    pub fn fps_window(mut self, window: Duration) -> Self {
        self.cfg.fps_window = Some(window);
        self
    }

    pub fn fps_warn_threshold(mut self, fps: f64) -> Self {
        self.cfg.fps_warn_threshold = Some(fps);
        self
    }

    pub fn fps_log_throttle(mut self, interval: Duration) -> Self {
        self.cfg.fps_log_throttle = Some(interval);
        self
    }

    pub fn dt_cap(mut self, cap: Duration) -> Self {
        self.cfg.dt_cap = Some(cap);
        self
    }

    pub fn data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cfg.data_root = Some(root.into());
        self
    }

    pub fn assets_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cfg.assets_root = Some(root.into());
        self
    }

    pub fn build(self) -> Result<EngineConfig, EngineConfigError> {
        let defaults = EngineConfig::default();
        let width = self.cfg.width.unwrap_or(defaults.width);
        let height = self.cfg.height.unwrap_or(defaults.height);
        let target_fps = self.cfg.target_fps.unwrap_or(defaults.target_fps);

        if target_fps == 0 {
            return Err(EngineConfigError::ZeroFps);
        }
        if width == 0 || height == 0 {
            return Err(EngineConfigError::ZeroDimensions { width, height });
        }

        Ok(EngineConfig {
            width,
            height,
            initial_brightness: self.cfg.initial_brightness.unwrap_or(defaults.initial_brightness),
            target_fps,
            preview_interval: self.cfg.preview_interval.unwrap_or(defaults.preview_interval),
            max_consec_errors: self.cfg.max_consec_errors.unwrap_or(defaults.max_consec_errors),
            fps_window: self.cfg.fps_window.unwrap_or(defaults.fps_window),
            fps_warn_threshold: self.cfg.fps_warn_threshold.unwrap_or(defaults.fps_warn_threshold),
            fps_log_throttle: self.cfg.fps_log_throttle.unwrap_or(defaults.fps_log_throttle),
            dt_cap: self.cfg.dt_cap.unwrap_or(defaults.dt_cap),
            data_root: self.cfg.data_root.unwrap_or(defaults.data_root),
            assets_root: self.cfg.assets_root.unwrap_or(defaults.assets_root),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.target_fps, 60);
        assert_eq!(cfg.preview_interval, Duration::from_millis(200));
        assert_eq!(cfg.max_consec_errors, 10);
        assert_eq!(cfg.fps_window, Duration::from_secs(2));
        assert_eq!(cfg.fps_warn_threshold, 40.0);
        assert_eq!(cfg.dt_cap, Duration::from_secs(1));
    }

    #[test]
    fn builder_rejects_zero_fps_and_zero_dimensions() {
        assert_eq!(EngineConfig::builder().target_fps(0).build(), Err(EngineConfigError::ZeroFps));
        assert_eq!(
            EngineConfig::builder().dimensions(0, 10).build(),
            Err(EngineConfigError::ZeroDimensions { width: 0, height: 10 })
        );
    }

    #[test]
    fn builder_overrides_apply() {
        let cfg = EngineConfig::builder().dimensions(32, 16).target_fps(30).build().unwrap();
        assert_eq!((cfg.width, cfg.height), (32, 16));
        assert_eq!(cfg.target_fps, 30);
        assert_eq!(cfg.frame_duration(), Duration::from_secs_f64(1.0 / 30.0));
    }
}
