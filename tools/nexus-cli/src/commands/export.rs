//! Export an edited copy of a video.

use std::path::PathBuf;

use nexus_common::config::NexusConfig;
use nexus_edit_model::MediaSource;
use nexus_render_engine::{export_edit, ExportRequest, FfmpegEngine, StatusCallback};

use super::EditArgs;

pub async fn run(
    config: &NexusConfig,
    video: PathBuf,
    edit: EditArgs,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Exporting: {}", video.display());

    let spec = edit.into_spec()?;
    println!("  Ratio: {}", spec.aspect_ratio.name());
    println!("  Filter: {}", spec.color_preset.label());
    if !spec.trim.is_full_length() {
        println!(
            "  Trim: {} -> {}",
            spec.trim.start,
            spec.trim
                .effective_end()
                .map(|end| end.to_string())
                .unwrap_or_else(|| "end".to_string())
        );
    }

    let mut engine = FfmpegEngine::from_config(&config.engine);
    let status_cb: StatusCallback = Box::new(|status| {
        println!("  {}", status.message);
    });

    let request = ExportRequest::new(spec, Some(MediaSource::Path(video)));
    let Some(artifact) = export_edit(&mut engine, &request, Some(&status_cb)).await? else {
        println!("No video selected; nothing to export.");
        return Ok(());
    };

    let output_path = output.unwrap_or_else(|| config.output_dir.join(&artifact.file_name));
    artifact.save_to(&output_path).await?;

    println!(
        "Saved {} ({} bytes, {})",
        output_path.display(),
        artifact.size(),
        artifact.mime_type
    );
    Ok(())
}
