//! Software-emulated device backend.
//!
//! `NullDevice` is the only backend this crate ships. It keeps the drawn
//! frame entirely in memory and has no hardware to synchronize with, so
//! [`swap`](Device::swap) never actually blocks — a real panel backend
//! would block here until the hardware's vertical-sync interrupt fires.
//! Brightness is always applied in software, since there is no physical
//! PWM driver underneath to offload it to.

use image::RgbImage;

use super::{Device, DeviceError, Surface};

pub struct NullDevice {
    width: u32,
    height: u32,
    brightness: u8,
    surface: Surface,
}

impl NullDevice {
    pub fn new(width: u32, height: u32, initial_brightness: u8) -> Self {
        Self {
            width,
            height,
            brightness: initial_brightness.min(100),
            surface: Surface::new(width, height),
        }
    }
}

impl Device for NullDevice {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn surface(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness.min(100);
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn swap(&mut self) -> Result<&mut Surface, DeviceError> {
        self.surface = Surface::new(self.width, self.height);
        Ok(&mut self.surface)
    }

    fn capture(&mut self) -> RgbImage {
        self.surface.capture()
    }
}
