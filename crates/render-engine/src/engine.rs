//! Media engine boundary.
//!
//! The engine is a black box with a tiny virtual filesystem: inputs are
//! written under plain file names, a run consumes an argument list, and the
//! output is read back by name. The engine performs no semantic repair of
//! malformed commands; a bad graph simply fails the run.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use nexus_common::config::EngineConfig;
use nexus_common::error::{NexusError, NexusResult};

/// Operations the export pipeline needs from a media engine.
///
/// A handle is created once and kept for the whole session. Loading is
/// idempotent and there is no explicit teardown beyond dropping the handle.
pub trait MediaEngine: Send {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Whether [`load`](Self::load) has already succeeded.
    fn is_loaded(&self) -> bool;

    /// Initialize the engine. May be slow on first use.
    fn load(&mut self) -> NexusResult<()>;

    /// Place `bytes` in the engine's working storage under `name`.
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> NexusResult<()>;

    /// Execute one command. Not cancelable once started.
    fn run(&mut self, args: &[String]) -> NexusResult<()>;

    /// Read a file the engine produced.
    fn read_file(&mut self, name: &str) -> NexusResult<Vec<u8>>;
}

/// Flags every run gets ahead of the command: overwrite, quiet stderr, and
/// machine-readable progress on stdout.
const ENGINE_FLAGS: [&str; 8] = [
    "-y",
    "-hide_banner",
    "-loglevel",
    "error",
    "-nostats",
    "-progress",
    "pipe:1",
    "-nostdin",
];

const STALL_WARNING_SECS: u64 = 10;

/// [`MediaEngine`] backed by a system ffmpeg binary.
///
/// The virtual filesystem is a private scratch directory created on load and
/// removed when the engine is dropped.
pub struct FfmpegEngine {
    binary: PathBuf,
    workdir: Option<tempfile::TempDir>,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            workdir: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.resolved_ffmpeg_path())
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Check that the binary can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// First line of `ffmpeg -version`, if the binary runs.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let raw = String::from_utf8(output.stdout).ok()?;
        raw.lines().next().map(|line| line.trim().to_string())
    }

    fn workdir(&self) -> NexusResult<&Path> {
        self.workdir
            .as_ref()
            .map(|dir| dir.path())
            .ok_or_else(|| NexusError::engine("engine used before load"))
    }

    fn virtual_path(&self, name: &str) -> NexusResult<PathBuf> {
        check_virtual_name(name)?;
        Ok(self.workdir()?.join(name))
    }
}

impl MediaEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_loaded(&self) -> bool {
        self.workdir.is_some()
    }

    fn load(&mut self) -> NexusResult<()> {
        if self.is_loaded() {
            return Ok(());
        }

        let started = Instant::now();
        if !self.is_available() {
            return Err(NexusError::engine(format!(
                "ffmpeg not runnable at '{}' (install it or set NEXUS_FFMPEG)",
                self.binary.display()
            )));
        }

        let workdir = tempfile::Builder::new()
            .prefix("nexus-engine-")
            .tempdir()
            .map_err(|e| NexusError::engine(format!("Failed to create engine workspace: {e}")))?;

        tracing::info!(
            binary = %self.binary.display(),
            workdir = %workdir.path().display(),
            load_ms = started.elapsed().as_millis(),
            "Engine loaded"
        );
        self.workdir = Some(workdir);
        Ok(())
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> NexusResult<()> {
        let path = self.virtual_path(name)?;
        std::fs::write(&path, bytes)
            .map_err(|e| NexusError::engine(format!("Failed to write {name}: {e}")))?;
        tracing::debug!(name, bytes = bytes.len(), "Engine file written");
        Ok(())
    }

    fn run(&mut self, args: &[String]) -> NexusResult<()> {
        let workdir = self.workdir()?.to_path_buf();
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut cmd = Command::new(&self.binary);
        cmd.args(ENGINE_FLAGS)
            .args(args)
            .current_dir(&workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| NexusError::engine(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(pid = child.id(), args_len = args.len(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| NexusError::engine("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| NexusError::engine("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = Instant::now();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| NexusError::engine(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest.out_time_secs;
                last_progress_wall = Instant::now();
                tracing::debug!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "ffmpeg progress"
                );
            } else if last_progress_wall.elapsed().as_secs() >= STALL_WARNING_SECS {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for {STALL_WARNING_SECS}s"
                );
                last_progress_wall = Instant::now();
            }
        }

        let status = child
            .wait()
            .map_err(|e| NexusError::engine(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(NexusError::engine(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            out_time_secs = latest.out_time_secs,
            complete = latest.complete,
            "ffmpeg run finished"
        );
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> NexusResult<Vec<u8>> {
        let path = self.virtual_path(name)?;
        let bytes = std::fs::read(&path)
            .map_err(|e| NexusError::retrieval(format!("Failed to read {name}: {e}")))?;
        if bytes.is_empty() {
            return Err(NexusError::retrieval(format!("{name} is empty")));
        }
        Ok(bytes)
    }
}

/// Virtual file names are bare file names, never paths.
pub fn check_virtual_name(name: &str) -> NexusResult<()> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0');
    if plain {
        Ok(())
    } else {
        Err(NexusError::engine(format!("invalid engine file name: {name:?}")))
    }
}

/// Latest values from ffmpeg's `-progress` key/value stream.
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite the name, ffmpeg reports microseconds here too.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}
