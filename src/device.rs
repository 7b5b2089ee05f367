//! Abstract RGB matrix device.
//!
//! A [`Device`] is an opaque, double-buffered pixel surface bound to a
//! physical (or emulated) panel. The engine owns exactly one `Device` for
//! its lifetime; it is created once at startup and torn down at shutdown.
//!
//! This crate ships one concrete implementation, [`null::NullDevice`], a
//! software-emulated backend with no hardware dependency. A real hardware
//! backend is a separate concern; this trait is the contract such a
//! backend would implement.

pub mod null;
pub mod surface;

pub use surface::Surface;

use thiserror::Error;

/// Failure modes a [`Device`] can report.
///
/// Brightness values the backend rejects are degraded to software dimming
/// rather than failing — [`DeviceError`] is
/// reserved for faults that genuinely prevent a swap or construction, e.g.
/// [`DeviceError::BackendUnavailable`] at startup.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no backend is available for this device")]
    BackendUnavailable,
    #[error("swap failed: {0}")]
    SwapFailed(String),
}

/// The device SPI: dimensions, brightness, the current drawable [`Surface`],
/// and the VSync swap.
pub trait Device: Send {
    /// Panel width in pixels. Immutable for the device's lifetime.
    fn width(&self) -> u32;

    /// Panel height in pixels. Immutable for the device's lifetime.
    fn height(&self) -> u32;

    /// The drawable for the next frame. Scenes draw into this.
    fn surface(&mut self) -> &mut Surface;

    /// Sets brightness, clamped to `0..=100`. Idempotent. Backends that
    /// expose a hardware knob use it; otherwise the device degrades to
    /// software dimming applied per-pixel at swap time.
    fn set_brightness(&mut self, brightness: u8);

    /// Current brightness, `0..=100`.
    fn brightness(&self) -> u8;

    /// Blocks until the panel's vertical-sync event, presents the current
    /// surface, and returns the fresh (logically cleared) back-buffer
    /// surface.
    fn swap(&mut self) -> Result<&mut Surface, DeviceError>;

    /// Captures the currently displayed content as an RGB image at device
    /// resolution. See [`Surface::capture`] for the fallback order.
    fn capture(&mut self) -> image::RgbImage;
}
