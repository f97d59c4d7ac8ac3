//! Font resolution and text drawing onto RGB bitmaps.
//!
//! Two kinds of faces are supported:
//! - The built-in bitmap fonts from `embedded-graphics`, picked by pixel height
//! - TrueType/OpenType files loaded with `ab_glyph`
//!
//! [`Face::load`] never fails: a font file that cannot be read or parsed is
//! logged and replaced by the built-in face of the requested size.
//!
//! Font paths may come from request input, so only regular files up to
//! [`MAX_FONT_BYTES`] are read.

use std::convert::Infallible;
use std::io::Read;
use std::path::Path;

use ab_glyph::{point, Font as _, FontArc, PxScale, ScaleFont};
use embedded_graphics::mono_font::{iso_8859_1, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::renderer::TextRenderer;
use embedded_graphics::text::{Baseline, Text};
use image::{Rgb, RgbImage};

use crate::error::Error;

/// Built-in fonts keyed by glyph cell height.
const BUILTIN_FONTS: &[(u32, &MonoFont<'static>)] = &[
    (6, &iso_8859_1::FONT_4X6),
    (7, &iso_8859_1::FONT_5X7),
    (8, &iso_8859_1::FONT_5X8),
    (9, &iso_8859_1::FONT_6X9),
    (10, &iso_8859_1::FONT_6X10),
    (12, &iso_8859_1::FONT_6X12),
    (13, &iso_8859_1::FONT_6X13),
    (14, &iso_8859_1::FONT_7X14),
    (15, &iso_8859_1::FONT_9X15),
    (18, &iso_8859_1::FONT_9X18),
    (20, &iso_8859_1::FONT_10X20),
];

/// Largest font file accepted (CJK faces run to ~20 MB).
pub const MAX_FONT_BYTES: u64 = 32 * 1024 * 1024;

/// Read and parse a font file.
///
/// Rejects anything that is not a regular file no larger than
/// [`MAX_FONT_BYTES`].
pub fn read_font(path: &Path) -> Result<FontArc, Error> {
    let file = std::fs::File::open(path)?;
    let metadata = file.metadata()?;
    if !metadata.is_file() {
        return Err(Error::InvalidInput(format!(
            "{}: not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_FONT_BYTES {
        return Err(Error::InvalidInput(format!(
            "{}: font file larger than {} bytes",
            path.display(),
            MAX_FONT_BYTES
        )));
    }

    // The file may grow between the check and the read
    let mut bytes = Vec::with_capacity(metadata.len() as usize);
    file.take(MAX_FONT_BYTES + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > MAX_FONT_BYTES {
        return Err(Error::InvalidInput(format!(
            "{}: font file larger than {} bytes",
            path.display(),
            MAX_FONT_BYTES
        )));
    }

    FontArc::try_from_vec(bytes)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))
}

/// Read the font at `path`, logging and returning `None` when it is unusable.
pub fn load_font(path: Option<&Path>) -> Option<FontArc> {
    let path = path?;
    match read_font(path) {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::warn!(
                "Font {} not usable ({}), falling back to default",
                path.display(),
                e
            );
            None
        }
    }
}

/// A font at a fixed pixel size.
pub enum Face {
    /// Built-in monospaced bitmap font
    Builtin(&'static MonoFont<'static>),

    /// Outline font loaded from a file
    Truetype {
        font: FontArc,
        scale: PxScale,
    },
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Face::Builtin(font) => f
                .debug_tuple("Builtin")
                .field(&font.character_size)
                .finish(),
            Face::Truetype { scale, .. } => f
                .debug_struct("Truetype")
                .field("scale", &scale.y)
                .finish_non_exhaustive(),
        }
    }
}

impl Face {
    /// The largest built-in font whose cell height does not exceed `size`.
    ///
    /// Sizes below the smallest font get the smallest font.
    pub fn builtin(size: u32) -> Self {
        let font = BUILTIN_FONTS
            .iter()
            .rev()
            .find(|(height, _)| *height <= size)
            .map(|(_, font)| *font)
            .unwrap_or(BUILTIN_FONTS[0].1);
        Face::Builtin(font)
    }

    /// `font` at `size` pixels, or the built-in face when there is no font.
    pub fn sized(font: Option<&FontArc>, size: u32) -> Self {
        match font {
            Some(font) => Face::Truetype {
                font: font.clone(),
                scale: PxScale::from(size as f32),
            },
            None => Self::builtin(size),
        }
    }

    /// Load a font file at `size` pixels.
    pub fn from_file(path: &Path, size: u32) -> Result<Self, Error> {
        let font = read_font(path)?;
        Ok(Self::sized(Some(&font), size))
    }

    /// Resolve a face, falling back to the built-in font on any failure.
    pub fn load(path: Option<&Path>, size: u32) -> Self {
        Self::sized(load_font(path).as_ref(), size)
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Face::Builtin(_))
    }

    /// Bounding box `(width, height)` of `text` drawn with its top at y = 0.
    ///
    /// Empty text measures as `(0, 0)`.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        if text.is_empty() {
            return (0, 0);
        }

        match self {
            Face::Builtin(font) => {
                let style = MonoTextStyle::new(font, Rgb888::BLACK);
                let metrics = style.measure_string(text, Point::zero(), Baseline::Top);
                (
                    metrics.bounding_box.size.width,
                    metrics.bounding_box.size.height,
                )
            }
            Face::Truetype { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let mut width = 0.0f32;
                let mut previous = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                let height = scaled.ascent() - scaled.descent();
                (width.ceil().max(0.0) as u32, height.ceil().max(0.0) as u32)
            }
        }
    }

    /// Draw `text` with its bounding box's top-left corner at `(x, y)`.
    ///
    /// Pixels falling outside `target` are clipped.
    pub fn draw(&self, target: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        if text.is_empty() {
            return;
        }

        match self {
            Face::Builtin(font) => {
                let style = MonoTextStyle::new(font, Rgb888::new(color[0], color[1], color[2]));
                let mut canvas = Canvas(target);
                // Infallible target
                let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
                    .draw(&mut canvas);
            }
            Face::Truetype { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let baseline = y as f32 + scaled.ascent();
                let mut caret = x as f32;
                let mut previous = None;

                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        caret += scaled.kern(prev, id);
                    }
                    let glyph = id.with_scale_and_position(*scale, point(caret, baseline));
                    caret += scaled.h_advance(id);
                    previous = Some(id);

                    let Some(outlined) = font.outline_glyph(glyph) else {
                        continue;
                    };
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let px = bounds.min.x as i32 + gx as i32;
                        let py = bounds.min.y as i32 + gy as i32;
                        blend(target, px, py, color, coverage);
                    });
                }
            }
        }
    }
}

fn blend(target: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= target.width() || y as u32 >= target.height() {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let pixel = target.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let under = pixel[channel] as f32;
        let over = color[channel] as f32;
        pixel[channel] = (under + (over - under) * coverage).round() as u8;
    }
}

/// `embedded-graphics` draw target backed by an `image` RGB buffer.
struct Canvas<'a>(&'a mut RgbImage);

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = (self.0.width() as i32, self.0.height() as i32);
        for Pixel(p, color) in pixels {
            if p.x >= 0 && p.y >= 0 && p.x < width && p.y < height {
                self.0.put_pixel(
                    p.x as u32,
                    p.y as u32,
                    Rgb([color.r(), color.g(), color.b()]),
                );
            }
        }
        Ok(())
    }
}
