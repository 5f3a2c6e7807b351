//! CLI command implementations.

pub mod check;
pub mod export;
pub mod plan;
pub mod presets;

use std::path::PathBuf;

use clap::Args;
use nexus_edit_model::{EditForm, EditSpec, MediaSource};

/// Edit settings, either as a saved `edit.json` or as raw form fields.
///
/// Form fields are taken as typed; values that do not parse fall back to their
/// defaults instead of failing.
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Load the edit from a JSON file instead of the form flags
    #[arg(long, value_name = "FILE")]
    pub edit: Option<PathBuf>,

    /// Seconds to skip from the start
    #[arg(long, allow_hyphen_values = true)]
    pub trim_start: Option<String>,

    /// Absolute end position in seconds
    #[arg(long, allow_hyphen_values = true)]
    pub trim_end: Option<String>,

    /// Aspect ratio: none|16:9|9:16|1:1
    #[arg(long)]
    pub ratio: Option<String>,

    /// Color preset: none|vivid|cinema|bw|warm|cool
    #[arg(long)]
    pub filter: Option<String>,

    /// Caption text
    #[arg(long)]
    pub text: Option<String>,

    /// Caption left offset in pixels
    #[arg(long, allow_hyphen_values = true)]
    pub text_x: Option<String>,

    /// Caption top offset in pixels
    #[arg(long, allow_hyphen_values = true)]
    pub text_y: Option<String>,

    /// Caption font size in pixels
    #[arg(long)]
    pub text_size: Option<String>,

    /// Sticker image
    #[arg(long, value_name = "IMAGE")]
    pub sticker: Option<PathBuf>,

    /// Sticker left offset in pixels
    #[arg(long, allow_hyphen_values = true)]
    pub sticker_x: Option<String>,

    /// Sticker top offset in pixels
    #[arg(long, allow_hyphen_values = true)]
    pub sticker_y: Option<String>,
}

impl EditArgs {
    pub fn into_spec(self) -> anyhow::Result<EditSpec> {
        if let Some(path) = &self.edit {
            if self.has_form_fields() {
                tracing::warn!("--edit given; ignoring form flags");
            }
            return EditSpec::load(path)
                .map_err(|e| anyhow::anyhow!("Failed to load edit: {e}"));
        }

        let form = EditForm {
            trim_start: self.trim_start,
            trim_end: self.trim_end,
            ratio: self.ratio,
            filter: self.filter,
            text: self.text,
            text_x: self.text_x,
            text_y: self.text_y,
            text_size: self.text_size,
            sticker: self.sticker.map(MediaSource::Path),
            sticker_x: self.sticker_x,
            sticker_y: self.sticker_y,
        };
        Ok(form.into_spec())
    }

    fn has_form_fields(&self) -> bool {
        [
            &self.trim_start,
            &self.trim_end,
            &self.ratio,
            &self.filter,
            &self.text,
            &self.text_x,
            &self.text_y,
            &self.text_size,
            &self.sticker_x,
            &self.sticker_y,
        ]
        .iter()
        .any(|field| field.is_some())
            || self.sticker.is_some()
    }
}
