//! Caption compilation.

use nexus_edit_model::TextOverlay;

use crate::fragment::{Filter, FilterFragment};

const FONT_COLOR: &str = "white";
const BOX_COLOR: &str = "black@0.5";
const BOX_BORDER_PX: u32 = 12;

/// `drawtext` fragment for a caption, or `None` for a blank caption.
///
/// The caption is emitted as one quoted value (see
/// [`escape_quoted`](crate::fragment::escape_quoted)), so quotes or
/// separators in user text cannot introduce further filters or options.
pub fn text_fragment(text: &TextOverlay) -> Option<FilterFragment> {
    if text.is_blank() {
        return None;
    }

    Some(FilterFragment::new(
        Filter::new("drawtext")
            .quoted_option("text", escape_drawtext(text.trimmed_content()))
            .option("x", text.x)
            .option("y", text.y)
            .option("fontsize", text.font_size.max(1))
            .option("fontcolor", FONT_COLOR)
            .option("box", 1)
            .option("boxcolor", BOX_COLOR)
            .option("boxborderw", BOX_BORDER_PX),
    ))
}

/// `drawtext` expands `%{...}` sequences and backslash escapes in its text.
/// Escape both so the caption is drawn literally.
pub fn escape_drawtext(caption: &str) -> String {
    let mut out = String::with_capacity(caption.len());
    for ch in caption.chars() {
        if matches!(ch, '\\' | '%') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
