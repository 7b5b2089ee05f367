//! The drawable a [`Scene`](crate::scene::Scene) draws into each frame.

use image::{imageops, DynamicImage, GenericImageView, Rgb, RgbImage};
use rusttype::{point, Font, Scale};

use crate::color::Color;

/// A double-buffered-aware drawing surface.
///
/// `Surface` owns the device's front-facing pixel buffer plus a "shadow"
/// mirror of the same content. The shadow exists purely so [`capture`]
/// (used for preview snapshots) can hand back a still image without
/// depending on the backend supporting pixel readback — most real LED
/// matrix backends don't.
///
/// Per the matrix driver's final design, [`set_pixel`](Surface::set_pixel)
/// does *not* update the shadow buffer: intercepting every single-pixel
/// write turned out to cost more than the scenes that call it densely
/// (plasma, starfields) could afford. Surfaces populated exclusively
/// through `set_pixel` will report an empty (black) preview; surfaces
/// populated through [`fill`](Surface::fill) or
/// [`set_image`](Surface::set_image) preview normally.
pub struct Surface {
    width: u32,
    height: u32,
    pixels: RgbImage,
    shadow: RgbImage,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: RgbImage::new(width, height),
            shadow: RgbImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The live pixel buffer, as drawn so far this frame.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Resets both buffers to black.
    pub fn clear(&mut self) {
        self.fill(0, 0, 0);
    }

    /// Fills every pixel with a solid color. Updates the shadow buffer.
    pub fn fill(&mut self, r: u8, g: u8, b: u8) {
        for px in self.pixels.pixels_mut() {
            *px = Rgb([r, g, b]);
        }
        for px in self.shadow.pixels_mut() {
            *px = Rgb([r, g, b]);
        }
    }

    /// Sets a single pixel. Out-of-range coordinates are silently ignored.
    /// Does not update the shadow buffer (see type-level docs).
    pub fn set_pixel(&mut self, x: i64, y: i64, r: u8, g: u8, b: u8) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        self.pixels.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
    }

    /// Reads back a single pixel. Out-of-range coordinates return black.
    pub fn get_pixel(&self, x: i64, y: i64) -> Color {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return Color::BLACK;
        }
        let Rgb([r, g, b]) = *self.pixels.get_pixel(x as u32, y as u32);
        Color::new(r, g, b)
    }

    /// Composites `img` onto the surface at `(x, y)`, resizing it to fit the
    /// surface exactly first if its dimensions differ. Replaces the shadow
    /// buffer with the same content, so image-driven scenes (clips, GIFs)
    /// preview correctly.
    pub fn set_image(&mut self, img: &DynamicImage) {
        let resized = if img.width() != self.width || img.height() != self.height {
            img.resize_exact(self.width, self.height, imageops::FilterType::Nearest)
        } else {
            img.clone()
        };
        let rgb = resized.to_rgb8();
        self.pixels = rgb.clone();
        self.shadow = rgb;
    }

    /// Alpha-composites `img` onto the surface at `(x, y)` without resizing,
    /// clipping to the surface bounds. Used by clip playback to draw GIF
    /// frames onto a persistent background canvas across update calls.
    pub fn overlay(&mut self, img: &DynamicImage, x: i64, y: i64) {
        imageops::overlay(&mut self.pixels, img, x, y);
        imageops::overlay(&mut self.shadow, img, x, y);
    }

    /// Rasterizes `text` at `(x, y)` in `color` using `font`. Glyphs that
    /// fall outside the surface are clipped per-pixel; glyphs starting
    /// entirely outside the surface are skipped. Updates the shadow buffer.
    pub fn draw_text(&mut self, font: &Font<'_>, x: i64, y: i64, color: Color, text: &str, size: f32) {
        let scale = Scale::uniform(size);
        let v_metrics = font.v_metrics(scale);
        let offset = point(x as f32, y as f32 + v_metrics.ascent);

        for glyph in font.layout(text, scale, offset) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    if v <= 0.0 {
                        return;
                    }
                    let px = bb.min.x + gx as i32;
                    let py = bb.min.y + gy as i32;
                    if px < 0 || py < 0 {
                        return;
                    }
                    self.set_pixel(px as i64, py as i64, color.r, color.g, color.b);
                    if (px as u32) < self.width && (py as u32) < self.height {
                        self.shadow.put_pixel(px as u32, py as u32, Rgb([color.r, color.g, color.b]));
                    }
                });
            }
        }
    }

    /// Returns a still image of the currently drawn frame for preview
    /// capture.
    ///
    /// Fallback order: if the shadow buffer has any non-black pixel, return
    /// a clone of it (matches what is actually visible on a real panel for
    /// anything drawn through `fill`/`set_image`/`overlay`/`draw_text`).
    /// Otherwise — e.g. a scene that painted exclusively through
    /// `set_pixel` — fall back to a clone of the live pixel buffer so the
    /// preview is not gratuitously blank; a genuinely all-black frame
    /// still reports black either way.
    pub fn capture(&self) -> RgbImage {
        if self.shadow.pixels().any(|p| *p != Rgb([0, 0, 0])) {
            self.shadow.clone()
        } else {
            self.pixels.clone()
        }
    }
}
