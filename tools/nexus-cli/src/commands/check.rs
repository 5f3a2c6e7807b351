//! Check engine availability.

use nexus_common::config::{config_file_path, NexusConfig};
use nexus_render_engine::FfmpegEngine;

pub fn run(config: &NexusConfig, init_config: bool) -> anyhow::Result<()> {
    println!("Nexus System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if !config_path.exists() {
        if init_config {
            config.save()?;
            println!("[OK] Config: wrote defaults to {}", config_path.display());
        } else {
            println!("[--] Config: defaults ({} not found)", config_path.display());
        }
    } else {
        match NexusConfig::try_load_from(&config_path) {
            Ok(_) => println!("[OK] Config: {}", config_path.display()),
            Err(e) => println!("[WARN] Config: {e} (using defaults)"),
        }
    }
    println!("     Output dir: {}", config.output_dir.display());

    let engine = FfmpegEngine::from_config(&config.engine);
    match engine.version() {
        Some(version) => {
            println!("[OK] Engine: {}", engine.binary().display());
            println!("     {version}");
        }
        None => {
            println!("[FAIL] Engine: '{}' is not runnable", engine.binary().display());
        }
    }

    println!();
    if engine.is_available() {
        println!("Engine is available. Nexus is ready.");
    } else {
        println!("Install ffmpeg or set NEXUS_FFMPEG to its path.");
    }

    Ok(())
}
