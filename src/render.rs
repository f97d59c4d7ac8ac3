//! Text-to-image rendering for the Quote/0 panel.
//!
//! Lays out an optional title, message and signature on a fixed-size bitmap:
//!
//! ```text
//! +----------------------------------+
//! | Title                            |
//! | message text wrapped at the      |
//! | right padding, cut off when it   |
//! | reaches the bottom               |
//! |                        signature |
//! +----------------------------------+
//! ```
//!
//! Rendering never fails. A font that cannot be loaded falls back to the
//! built-in font, absent fields take no space, and message lines that do not
//! fit are dropped without an ellipsis.
//!
//! # Example
//!
//! ```
//! use quote0::{render, RenderSpec};
//!
//! let bitmap = render(&RenderSpec::new().with_title("Hello").with_signature("me"));
//! assert_eq!(bitmap.dimensions(), (296, 152));
//! ```

use std::path::PathBuf;

use image::{Rgb, RgbImage};

use crate::font::{self, Face};
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Rendered RGB pixel grid.
pub type Bitmap = RgbImage;

/// Gap between the title and the first message line
const TITLE_GAP: i64 = 6;

/// Gap between message lines
const LINE_GAP: i64 = 2;

/// Rendering input.
#[derive(Debug, Clone)]
pub struct RenderSpec {
    pub title: Option<String>,
    pub message: Option<String>,
    pub signature: Option<String>,

    /// Bitmap width (default: 296)
    pub width: u32,

    /// Bitmap height (default: 152)
    pub height: u32,

    /// Title font size in pixels (default: 18)
    pub title_size: u32,

    /// Message font size in pixels (default: 14)
    pub message_size: u32,

    /// Signature font size in pixels (default: 10)
    pub signature_size: u32,

    /// Margin on every side (default: 8)
    pub padding: u32,

    /// Background color (default: white)
    pub background: Rgb<u8>,

    /// Text color (default: black)
    pub foreground: Rgb<u8>,

    /// TrueType/OpenType font file; the built-in font is used when absent
    pub font_path: Option<PathBuf>,
}

impl Default for RenderSpec {
    fn default() -> Self {
        Self {
            title: None,
            message: None,
            signature: None,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            title_size: 18,
            message_size: 14,
            signature_size: 10,
            padding: 8,
            background: Rgb([255, 255, 255]),
            foreground: Rgb([0, 0, 0]),
            font_path: None,
        }
    }
}

impl RenderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Set the bitmap resolution.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set title, message and signature font sizes.
    #[must_use]
    pub fn with_font_sizes(mut self, title: u32, message: u32, signature: u32) -> Self {
        self.title_size = title;
        self.message_size = message;
        self.signature_size = signature;
        self
    }

    #[must_use]
    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }
}

/// Which field a [`TextRun`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Message,
    Signature,
}

/// A piece of text placed on the bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub field: Field,
    pub text: String,
    /// Left edge of the bounding box
    pub x: i32,
    /// Top edge of the bounding box
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl TextRun {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

struct Faces {
    title: Face,
    message: Face,
    signature: Face,
}

impl Faces {
    fn load(spec: &RenderSpec) -> Self {
        let font = font::load_font(spec.font_path.as_deref());
        let font = font.as_ref();
        Self {
            title: Face::sized(font, spec.title_size),
            message: Face::sized(font, spec.message_size),
            signature: Face::sized(font, spec.signature_size),
        }
    }

    fn get(&self, field: Field) -> &Face {
        match field {
            Field::Title => &self.title,
            Field::Message => &self.message,
            Field::Signature => &self.signature,
        }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Place every visible piece of text without drawing it.
pub fn layout(spec: &RenderSpec) -> Vec<TextRun> {
    layout_with(spec, &Faces::load(spec))
}

fn layout_with(spec: &RenderSpec, faces: &Faces) -> Vec<TextRun> {
    let padding = spec.padding as i64;
    let width = spec.width as i64;
    let height = spec.height as i64;
    let mut runs = Vec::new();
    let mut y = padding;

    if let Some(title) = present(&spec.title) {
        let (w, h) = faces.title.measure(title);
        runs.push(TextRun {
            field: Field::Title,
            text: title.to_string(),
            x: padding as i32,
            y: y as i32,
            width: w,
            height: h,
        });
        y += h as i64 + TITLE_GAP;
    }

    if let Some(message) = present(&spec.message) {
        let max_width = (width - 2 * padding).max(0) as u32;
        let limit = height - padding - spec.message_size as i64;

        for line in wrap_text(&faces.message, message, max_width) {
            if y > limit {
                break;
            }
            let (w, h) = faces.message.measure(&line);
            runs.push(TextRun {
                field: Field::Message,
                text: line,
                x: padding as i32,
                y: y as i32,
                width: w,
                height: h,
            });
            y += h as i64 + LINE_GAP;
        }
    }

    if let Some(signature) = present(&spec.signature) {
        let (w, h) = faces.signature.measure(signature);
        runs.push(TextRun {
            field: Field::Signature,
            text: signature.to_string(),
            x: (width - padding - w as i64) as i32,
            y: (height - padding - h as i64) as i32,
            width: w,
            height: h,
        });
    }

    runs
}

/// Render `spec` to a bitmap of exactly `spec.width` x `spec.height`.
pub fn render(spec: &RenderSpec) -> Bitmap {
    let faces = Faces::load(spec);
    let mut bitmap = RgbImage::from_pixel(spec.width, spec.height, spec.background);

    for run in layout_with(spec, &faces) {
        faces
            .get(run.field)
            .draw(&mut bitmap, run.x, run.y, &run.text, spec.foreground);
    }

    bitmap
}

/// Greedy character-granular wrap to `max_width` pixels.
///
/// Explicit newlines always break, and an empty paragraph yields an empty
/// line. A line is cut as soon as adding the next character would make it
/// wider than `max_width`, even mid-word. A single character wider than
/// `max_width` still gets its own line, so joining the lines of a paragraph
/// gives back the paragraph.
pub fn wrap_text(face: &Face, text: &str, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for c in paragraph.chars() {
            let mut candidate = current.clone();
            candidate.push(c);

            if face.measure(&candidate).0 > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current.push(c);
            } else {
                current = candidate;
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}
