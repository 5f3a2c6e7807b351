//! The edit description for one export.
//!
//! An edit applies a fixed, closed set of features to exactly one source
//! video: one trim window, one crop ratio, one color preset, one caption and
//! one sticker.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::source::MediaSource;

/// Top-level edit description (`edit.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSpec {
    /// Whether the source carries an audio track. Informational only; the
    /// audio mapping is always optional.
    #[serde(default = "default_true")]
    pub source_has_audio: bool,

    /// Time window of the source to keep.
    #[serde(default)]
    pub trim: Trim,

    /// Target framing.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Color grade.
    #[serde(default)]
    pub color_preset: ColorPreset,

    /// Burned-in caption.
    #[serde(default)]
    pub text_overlay: Option<TextOverlay>,

    /// Image composited over the picture.
    #[serde(default)]
    pub sticker_overlay: Option<StickerOverlay>,
}

fn default_true() -> bool {
    true
}

/// Start/end selection in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Trim {
    /// Seconds to skip from the beginning of the source (`>= 0`).
    #[serde(default)]
    pub start: f64,

    /// Absolute end position in seconds; `None` runs to the end of the source.
    #[serde(default)]
    pub end: Option<f64>,
}

impl Trim {
    pub fn new(start: f64, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// Start offset worth emitting, if any.
    pub fn effective_start(&self) -> Option<f64> {
        (self.start > 0.0).then_some(self.start)
    }

    /// End position worth emitting. An end at or before the start is dropped
    /// rather than rejected.
    pub fn effective_end(&self) -> Option<f64> {
        self.end.filter(|end| *end > self.start)
    }

    /// Whether the trim leaves the source untouched.
    pub fn is_full_length(&self) -> bool {
        self.effective_start().is_none() && self.effective_end().is_none()
    }
}

/// Aspect ratio the output is center-cropped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Keep the source framing.
    #[default]
    #[serde(rename = "none")]
    None,
    /// 16:9 widescreen.
    #[serde(rename = "16:9")]
    R16x9,
    /// 9:16 vertical.
    #[serde(rename = "9:16")]
    R9x16,
    /// 1:1 square.
    #[serde(rename = "1:1")]
    R1x1,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::None,
        AspectRatio::R16x9,
        AspectRatio::R9x16,
        AspectRatio::R1x1,
    ];

    /// Look up a ratio by its UI name. Unknown names mean "no crop".
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "16:9" => Self::R16x9,
            "9:16" => Self::R9x16,
            "1:1" => Self::R1x1,
            _ => Self::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::R16x9 => "16:9",
            Self::R9x16 => "9:16",
            Self::R1x1 => "1:1",
        }
    }

    /// Width over height, if this ratio constrains the frame.
    pub fn ratio(self) -> Option<(u32, u32)> {
        match self {
            Self::None => None,
            Self::R16x9 => Some((16, 9)),
            Self::R9x16 => Some((9, 16)),
            Self::R1x1 => Some((1, 1)),
        }
    }
}

/// Color grading preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPreset {
    #[default]
    None,
    Vivid,
    Cinema,
    #[serde(rename = "bw")]
    BlackAndWhite,
    Warm,
    Cool,
}

impl ColorPreset {
    pub const ALL: [ColorPreset; 6] = [
        ColorPreset::None,
        ColorPreset::Vivid,
        ColorPreset::Cinema,
        ColorPreset::BlackAndWhite,
        ColorPreset::Warm,
        ColorPreset::Cool,
    ];

    /// Look up a preset by its UI name. Unknown names mean "no grade".
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "vivid" => Self::Vivid,
            "cinema" => Self::Cinema,
            "bw" => Self::BlackAndWhite,
            "warm" => Self::Warm,
            "cool" => Self::Cool,
            _ => Self::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Vivid => "vivid",
            Self::Cinema => "cinema",
            Self::BlackAndWhite => "bw",
            Self::Warm => "warm",
            Self::Cool => "cool",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "No filter",
            Self::Vivid => "Vivid",
            Self::Cinema => "Cinema",
            Self::BlackAndWhite => "Black & White",
            Self::Warm => "Warm",
            Self::Cool => "Cool",
        }
    }
}

/// Caption drawn onto the final picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOverlay {
    /// Literal caption text.
    pub content: String,
    /// Left offset in output pixels. Off-canvas values are allowed.
    pub x: i32,
    /// Top offset in output pixels. Off-canvas values are allowed.
    pub y: i32,
    /// Font size in pixels (`>= 1`).
    pub font_size: u32,
}

impl TextOverlay {
    pub const DEFAULT_X: i32 = 40;
    pub const DEFAULT_Y: i32 = 60;
    pub const DEFAULT_FONT_SIZE: u32 = 44;

    pub fn new(content: impl Into<String>, x: i32, y: i32, font_size: u32) -> Self {
        Self {
            content: content.into(),
            x,
            y,
            font_size: font_size.max(1),
        }
    }

    /// Caption with surrounding whitespace removed.
    pub fn trimmed_content(&self) -> &str {
        self.content.trim()
    }

    /// Blank captions are treated as absent.
    pub fn is_blank(&self) -> bool {
        self.trimmed_content().is_empty()
    }
}

/// Image composited over the picture at a fixed offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerOverlay {
    /// Where the sticker bytes come from.
    pub image: MediaSource,
    /// Left offset in output pixels.
    pub x: i32,
    /// Top offset in output pixels.
    pub y: i32,
}

impl StickerOverlay {
    pub const DEFAULT_X: i32 = 100;
    pub const DEFAULT_Y: i32 = 100;

    pub fn new(image: MediaSource, x: i32, y: i32) -> Self {
        Self { image, x, y }
    }
}

impl Default for EditSpec {
    fn default() -> Self {
        Self {
            source_has_audio: true,
            trim: Trim::default(),
            aspect_ratio: AspectRatio::None,
            color_preset: ColorPreset::None,
            text_overlay: None,
            sticker_overlay: None,
        }
    }
}

impl EditSpec {
    pub fn with_trim(mut self, start: f64, end: Option<f64>) -> Self {
        self.trim = Trim::new(start, end);
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn with_color_preset(mut self, preset: ColorPreset) -> Self {
        self.color_preset = preset;
        self
    }

    pub fn with_text(mut self, text: TextOverlay) -> Self {
        self.text_overlay = Some(text);
        self
    }

    pub fn with_sticker(mut self, sticker: StickerOverlay) -> Self {
        self.sticker_overlay = Some(sticker);
        self
    }

    /// The caption, unless it is missing or blank.
    pub fn text(&self) -> Option<&TextOverlay> {
        self.text_overlay.as_ref().filter(|text| !text.is_blank())
    }

    pub fn sticker(&self) -> Option<&StickerOverlay> {
        self.sticker_overlay.as_ref()
    }

    pub fn has_sticker(&self) -> bool {
        self.sticker_overlay.is_some()
    }

    /// Load an edit from a JSON file.
    ///
    /// Relative sticker paths are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EditError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| EditError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut spec: EditSpec =
            serde_json::from_str(&json).map_err(|e| EditError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        if let Some(base) = path.parent() {
            spec.resolve_relative_paths(base);
        }

        spec.validate()?;
        Ok(spec)
    }

    /// Save the edit as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EditError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| EditError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| EditError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reject values no form could have produced.
    pub fn validate(&self) -> Result<(), EditError> {
        if !self.trim.start.is_finite() || self.trim.start < 0.0 {
            return Err(EditError::ValidationError {
                message: format!("trim start must be >= 0, got {}", self.trim.start),
            });
        }
        if let Some(end) = self.trim.end {
            if !end.is_finite() {
                return Err(EditError::ValidationError {
                    message: format!("trim end must be finite, got {end}"),
                });
            }
        }
        if let Some(text) = &self.text_overlay {
            if text.font_size == 0 {
                return Err(EditError::ValidationError {
                    message: "font size must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        if let Some(StickerOverlay {
            image: MediaSource::Path(image),
            ..
        }) = &mut self.sticker_overlay
        {
            if image.is_relative() {
                *image = base.join(&*image);
            }
        }
    }
}

/// Errors that can occur when loading or saving edits.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid edit: {message}")]
    ValidationError { message: String },
}
