//! Show what an export would run, without running it.

use std::path::PathBuf;

use nexus_render_engine::plan_export;

use super::EditArgs;

pub fn run(video: Option<PathBuf>, edit: EditArgs, json: bool) -> anyhow::Result<()> {
    let spec = edit.into_spec()?;
    let plan = plan_export(&spec)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if let Some(video) = &video {
        println!("Source: {}", video.display());
    }
    println!(
        "Graph: {}",
        if plan.graph.is_labeled() {
            "labeled"
        } else {
            "simple"
        }
    );
    if plan.graph.is_empty() {
        println!("  (no filters)");
    } else {
        println!("  {}", plan.graph);
    }
    println!();
    println!("{}", plan.command.display("ffmpeg"));

    Ok(())
}
