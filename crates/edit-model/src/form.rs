//! Raw form input and the fallback rules that turn it into an [`EditSpec`].
//!
//! Form fields arrive as untyped strings. A field that cannot be parsed is
//! replaced by its default; this is never reported as an error.

use serde::{Deserialize, Serialize};

use crate::edit::{AspectRatio, ColorPreset, EditSpec, StickerOverlay, TextOverlay, Trim};
use crate::source::MediaSource;

/// The raw field set of the edit form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditForm {
    pub trim_start: Option<String>,
    pub trim_end: Option<String>,
    pub ratio: Option<String>,
    pub filter: Option<String>,
    pub text: Option<String>,
    pub text_x: Option<String>,
    pub text_y: Option<String>,
    pub text_size: Option<String>,
    pub sticker: Option<MediaSource>,
    pub sticker_x: Option<String>,
    pub sticker_y: Option<String>,
}

impl EditForm {
    /// Apply the fallback rules and build the edit.
    pub fn into_spec(self) -> EditSpec {
        let start = field_or_default("trim_start", self.trim_start.as_deref(), 0.0, |raw| {
            parse_lenient_float(raw).filter(|v| v.is_finite() && *v >= 0.0)
        });

        let end = match self.trim_end.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let parsed = parse_lenient_float(raw).filter(|v| v.is_finite());
                if parsed.is_none() {
                    tracing::debug!(field = "trim_end", value = raw, "Ignoring unparsable value");
                }
                parsed
            }
        };

        let aspect_ratio = AspectRatio::from_name(self.ratio.as_deref().unwrap_or_default());
        let color_preset = ColorPreset::from_name(self.filter.as_deref().unwrap_or_default());

        let content = self.text.unwrap_or_default().trim().to_string();
        let text_overlay = if content.is_empty() {
            None
        } else {
            let x = int_field("text_x", self.text_x.as_deref(), TextOverlay::DEFAULT_X);
            let y = int_field("text_y", self.text_y.as_deref(), TextOverlay::DEFAULT_Y);
            let font_size = field_or_default(
                "text_size",
                self.text_size.as_deref(),
                TextOverlay::DEFAULT_FONT_SIZE,
                |raw| {
                    parse_lenient_int(raw)
                        .filter(|v| *v >= 1)
                        .and_then(|v| u32::try_from(v).ok())
                },
            );
            Some(TextOverlay::new(content, x, y, font_size))
        };

        let sticker_overlay = self.sticker.map(|image| {
            let x = int_field("sticker_x", self.sticker_x.as_deref(), StickerOverlay::DEFAULT_X);
            let y = int_field("sticker_y", self.sticker_y.as_deref(), StickerOverlay::DEFAULT_Y);
            StickerOverlay::new(image, x, y)
        });

        EditSpec {
            source_has_audio: true,
            trim: Trim::new(start, end),
            aspect_ratio,
            color_preset,
            text_overlay,
            sticker_overlay,
        }
    }
}

fn int_field(name: &'static str, raw: Option<&str>, default: i32) -> i32 {
    field_or_default(name, raw, default, |raw| {
        parse_lenient_int(raw).and_then(|v| i32::try_from(v).ok())
    })
}

fn field_or_default<T: Copy + std::fmt::Debug>(
    name: &'static str,
    raw: Option<&str>,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    let raw = match raw.map(str::trim) {
        None | Some("") => return default,
        Some(raw) => raw,
    };
    match parse(raw) {
        Some(value) => value,
        None => {
            tracing::debug!(field = name, value = raw, default = ?default, "Substituting default");
            default
        }
    }
}

/// Parse the leading integer of `raw` (`"12px"` -> 12).
pub fn parse_lenient_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let prefix_len = numeric_prefix_len(raw, false);
    raw[..prefix_len].parse().ok()
}

/// Parse the leading decimal number of `raw` (`"2.5s"` -> 2.5).
pub fn parse_lenient_float(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<f64>() {
        return Some(value);
    }
    let prefix_len = numeric_prefix_len(raw, true);
    raw[..prefix_len].parse().ok()
}

fn numeric_prefix_len(raw: &str, allow_fraction: bool) -> usize {
    let bytes = raw.as_bytes();
    let mut idx = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        idx += 1;
    }
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if allow_fraction && idx < bytes.len() && bytes[idx] == b'.' {
        idx += 1;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
    }
    idx
}
