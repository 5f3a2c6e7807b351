//! Color-grade preset registry.

use nexus_edit_model::ColorPreset;

use crate::fragment::{Filter, FilterFragment};

/// Fragment for a color preset; `None` means no grade is applied.
pub fn preset_fragment(preset: ColorPreset) -> Option<FilterFragment> {
    let fragment = match preset {
        ColorPreset::None => return None,
        ColorPreset::Vivid => FilterFragment::new(eq(1.2, 1.35).option("brightness", 0.02)),
        ColorPreset::Cinema => FilterFragment::new(eq(1.25, 1.15).option("brightness", -0.02)),
        ColorPreset::BlackAndWhite => FilterFragment::new(Filter::new("hue").option("s", 0)),
        ColorPreset::Warm => {
            FilterFragment::new(eq(1.1, 1.2)).then(colorbalance(0.05, 0.02, -0.03))
        }
        ColorPreset::Cool => {
            FilterFragment::new(eq(1.1, 1.15)).then(colorbalance(-0.03, 0.01, 0.05))
        }
    };
    Some(fragment)
}

/// Look a preset up by its UI name. Unrecognized names yield no fragment.
pub fn preset_fragment_by_name(name: &str) -> Option<FilterFragment> {
    preset_fragment(ColorPreset::from_name(name))
}

fn eq(contrast: f64, saturation: f64) -> Filter {
    Filter::new("eq")
        .option("contrast", contrast)
        .option("saturation", saturation)
}

/// Shadow-range balance shift for red/green/blue.
fn colorbalance(rs: f64, gs: f64, bs: f64) -> Filter {
    Filter::new("colorbalance")
        .option("rs", rs)
        .option("gs", gs)
        .option("bs", bs)
}
