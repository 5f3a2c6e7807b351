//! List aspect ratios and color presets with the filters they compile to.

use nexus_edit_model::{AspectRatio, ColorPreset};
use nexus_filter_graph::{crop_fragment, preset_fragment};

pub fn run() -> anyhow::Result<()> {
    println!("Aspect ratios");
    for ratio in AspectRatio::ALL {
        let filter = crop_fragment(ratio)
            .map(|f| f.render())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<6} {}", ratio.name(), filter);
    }

    println!();
    println!("Color presets");
    for preset in ColorPreset::ALL {
        let filter = preset_fragment(preset)
            .map(|f| f.render())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<7} {:<14} {}", preset.name(), preset.label(), filter);
    }

    Ok(())
}
