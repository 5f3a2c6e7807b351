//! Center-crop geometry for aspect-ratio targets.
//!
//! The source size is unknown when compiling, so every crop is an expression
//! over the engine's runtime symbols: `iw`/`ih` (input width/height) and `a`
//! (their ratio). The engine centers the crop window by default.

use nexus_edit_model::AspectRatio;

use crate::fragment::{Filter, FilterFragment};

/// Crop to the largest centered region with the requested ratio.
///
/// A source already at the target ratio gets a full-frame crop, which the
/// engine treats as a no-op.
pub fn crop_fragment(ratio: AspectRatio) -> Option<FilterFragment> {
    let (num, den) = ratio.ratio()?;

    let (width, height) = if num == den {
        ("min(iw,ih)".to_string(), "min(iw,ih)".to_string())
    } else {
        // Wider than target: keep height, narrow width. Otherwise keep width.
        (
            format!("if(gt(a,{num}/{den}),ih*{num}/{den},iw)"),
            format!("if(gt(a,{num}/{den}),ih,iw*{den}/{num})"),
        )
    };

    Some(FilterFragment::new(
        Filter::new("crop").quoted_arg(width).quoted_arg(height),
    ))
}
