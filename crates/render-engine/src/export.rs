//! Export orchestration.
//!
//! Drives one export through the engine: load, stage inputs, compile, run,
//! retrieve. Every phase change is reported to an optional status callback.
//! Whatever goes wrong past the inert check, the caller sees the same
//! [`EXPORT_FAILED_MESSAGE`]; the detailed cause goes to the log.

use std::path::Path;

use chrono::{DateTime, Utc};
use nexus_common::error::{NexusError, NexusResult, EXPORT_FAILED_MESSAGE};
use nexus_edit_model::{EditSpec, MediaSource};
use nexus_filter_graph::{compile_graph, FilterGraph};
use serde::Serialize;

use crate::command::{assemble, EngineCommand, OUTPUT_NAME, STICKER_INPUT_NAME, VIDEO_INPUT_NAME};
use crate::engine::MediaEngine;

/// Download name of a finished export.
pub const ARTIFACT_FILE_NAME: &str = "nexus_export.mp4";

/// Content type of a finished export.
pub const ARTIFACT_MIME_TYPE: &str = "video/mp4";

/// Phases of a single export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    Idle,
    EngineLoading,
    StagingInputs,
    Compiling,
    Running,
    Retrieving,
    Done,
    Failed,
}

impl ExportPhase {
    /// Human-readable status line for the phase.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready.",
            Self::EngineLoading => {
                "Loading Nexus Engine (FFmpeg)... first time takes 15-40 seconds."
            }
            Self::StagingInputs => "Preparing files...",
            Self::Compiling => "Compiling filter graph...",
            Self::Running => "Exporting HQ... (do not interrupt)",
            Self::Retrieving => "Finalizing download...",
            Self::Done => "Export complete. Video saved!",
            Self::Failed => EXPORT_FAILED_MESSAGE,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` may follow `self`. Phases only move forward, and any
    /// phase that has started work may fail.
    pub fn can_transition_to(self, next: ExportPhase) -> bool {
        use ExportPhase::*;
        match (self, next) {
            (Idle, EngineLoading)
            | (EngineLoading, StagingInputs)
            | (StagingInputs, Compiling)
            | (Compiling, Running)
            | (Running, Retrieving)
            | (Retrieving, Done) => true,
            (from, Failed) => from != Idle && !from.is_terminal(),
            _ => false,
        }
    }
}

/// A phase change as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportStatus {
    pub phase: ExportPhase,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Status callback, invoked synchronously on every phase change.
///
/// It runs on the exporting task between engine calls, so it should only
/// record or print the status.
pub type StatusCallback = Box<dyn Fn(ExportStatus) + Send + Sync>;

/// Tracks the phase of one export and reports changes.
pub struct ExportTracker<'a> {
    phase: ExportPhase,
    callback: Option<&'a StatusCallback>,
    history: Vec<ExportStatus>,
}

impl<'a> ExportTracker<'a> {
    pub fn new(callback: Option<&'a StatusCallback>) -> Self {
        Self {
            phase: ExportPhase::Idle,
            callback,
            history: Vec::new(),
        }
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    /// Every status reported so far, oldest first.
    pub fn history(&self) -> &[ExportStatus] {
        &self.history
    }

    /// Move to `next`, rejecting transitions the state machine forbids.
    pub fn advance(&mut self, next: ExportPhase) -> NexusResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(anyhow::anyhow!(
                "illegal export transition {:?} -> {:?}",
                self.phase,
                next
            )
            .into());
        }
        self.enter(next);
        Ok(())
    }

    /// Mark the export failed. No-op before work starts or after it ended.
    pub fn fail(&mut self) {
        if self.phase.can_transition_to(ExportPhase::Failed) {
            self.enter(ExportPhase::Failed);
        }
    }

    fn enter(&mut self, phase: ExportPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "Export phase change");
        self.phase = phase;
        let status = ExportStatus {
            phase,
            message: phase.label().to_string(),
            at: Utc::now(),
        };
        self.history.push(status.clone());
        if let Some(callback) = self.callback {
            callback(status);
        }
    }
}

/// What to export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub spec: EditSpec,
    /// Source video. Without one the export does nothing.
    pub video: Option<MediaSource>,
}

impl ExportRequest {
    pub fn new(spec: EditSpec, video: Option<MediaSource>) -> Self {
        Self { spec, video }
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl ExportArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            file_name: ARTIFACT_FILE_NAME.to_string(),
            mime_type: ARTIFACT_MIME_TYPE.to_string(),
            bytes,
            created_at: Utc::now(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Write the artifact to `path`, creating parent directories.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> NexusResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.bytes).await?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Export saved");
        Ok(())
    }
}

/// Compiled graph and the command that runs it.
#[derive(Debug, Clone, Serialize)]
pub struct ExportPlan {
    pub graph: FilterGraph,
    pub command: EngineCommand,
}

impl ExportPlan {
    pub fn args(&self) -> Vec<String> {
        self.command.to_args()
    }
}

/// Compile an edit into an engine command without touching any media.
///
/// Fails only if the compiled command contradicts its own graph, which is a
/// defect rather than a user error.
pub fn plan_export(spec: &EditSpec) -> NexusResult<ExportPlan> {
    let graph = compile_graph(spec);
    let command = assemble(spec, &graph);

    let problems = command.problems(&graph);
    if !problems.is_empty() {
        return Err(NexusError::compile(problems.join("; ")));
    }

    Ok(ExportPlan { graph, command })
}

/// Export an edit through `engine`.
///
/// Returns `Ok(None)` without touching the engine when no source video is
/// selected. Holding the engine by `&mut` keeps exports strictly one at a
/// time.
///
/// # Blocking
///
/// [`MediaEngine`] is a synchronous trait, so `load` and `run` block the
/// calling task until the engine returns. Only input staging and source
/// reads go through `tokio::fs`. Callers on a shared runtime should drive
/// this future from `spawn_blocking` or a dedicated runtime, as `nexus export`
/// does with its own `tokio::main`. `status` is called inline on the same
/// task and must return quickly.
pub async fn export_edit<E: MediaEngine>(
    engine: &mut E,
    request: &ExportRequest,
    status: Option<&StatusCallback>,
) -> NexusResult<Option<ExportArtifact>> {
    let Some(video) = request.video.as_ref() else {
        tracing::info!("No source video selected, nothing to export");
        return Ok(None);
    };

    let mut tracker = ExportTracker::new(status);
    match run_export(engine, &request.spec, video, &mut tracker).await {
        Ok(artifact) => {
            tracker.advance(ExportPhase::Done)?;
            tracing::info!(
                engine = engine.name(),
                bytes = artifact.size(),
                "Export complete"
            );
            Ok(Some(artifact))
        }
        Err(err) => {
            tracing::error!(
                engine = engine.name(),
                phase = ?tracker.phase(),
                video = %video.describe(),
                error = %err,
                "Export failed"
            );
            tracker.fail();
            Err(NexusError::export_failed())
        }
    }
}

async fn run_export<E: MediaEngine>(
    engine: &mut E,
    spec: &EditSpec,
    video: &MediaSource,
    tracker: &mut ExportTracker<'_>,
) -> NexusResult<ExportArtifact> {
    tracker.advance(ExportPhase::EngineLoading)?;
    if engine.is_loaded() {
        tracing::debug!(engine = engine.name(), "Engine already loaded");
    } else {
        engine.load()?;
    }

    tracker.advance(ExportPhase::StagingInputs)?;
    let video_bytes = read_source(video).await?;
    engine.write_file(VIDEO_INPUT_NAME, &video_bytes)?;
    if let Some(sticker) = spec.sticker() {
        let sticker_bytes = read_source(&sticker.image).await?;
        engine.write_file(STICKER_INPUT_NAME, &sticker_bytes)?;
    }

    tracker.advance(ExportPhase::Compiling)?;
    let plan = plan_export(spec)?;
    tracing::info!(
        labeled = plan.graph.is_labeled(),
        command = %plan.command.display(engine.name()),
        "Export command assembled"
    );

    tracker.advance(ExportPhase::Running)?;
    engine.run(&plan.args())?;

    tracker.advance(ExportPhase::Retrieving)?;
    let bytes = engine.read_file(OUTPUT_NAME)?;
    if bytes.is_empty() {
        return Err(NexusError::retrieval(format!("{OUTPUT_NAME} is empty")));
    }

    Ok(ExportArtifact::new(bytes))
}

async fn read_source(source: &MediaSource) -> NexusResult<Vec<u8>> {
    match source {
        MediaSource::Bytes(bytes) => Ok(bytes.clone()),
        MediaSource::Path(path) => tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NexusError::FileNotFound { path: path.clone() }
            } else {
                NexusError::staging(format!("Failed to read {}: {e}", path.display()))
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_phase_labels() {
        use ExportPhase::*;
        assert_eq!(
            EngineLoading.label(),
            "Loading Nexus Engine (FFmpeg)... first time takes 15-40 seconds."
        );
        assert_eq!(StagingInputs.label(), "Preparing files...");
        assert_eq!(Retrieving.label(), "Finalizing download...");
        assert_eq!(Running.label(), "Exporting HQ... (do not interrupt)");
        assert_eq!(Done.label(), "Export complete. Video saved!");
        assert_eq!(Failed.label(), EXPORT_FAILED_MESSAGE);

        let all = [
            Idle,
            EngineLoading,
            StagingInputs,
            Compiling,
            Running,
            Retrieving,
            Done,
            Failed,
        ];
        let labels: std::collections::HashSet<_> = all.iter().map(|p| p.label()).collect();
        assert_eq!(labels.len(), all.len());
    }

    #[test]
    fn test_phase_order_is_linear() {
        use ExportPhase::*;
        let order = [
            Idle,
            EngineLoading,
            StagingInputs,
            Compiling,
            Running,
            Retrieving,
            Done,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{pair:?}");
            assert!(!pair[1].can_transition_to(pair[0]), "{pair:?}");
        }
        assert!(!Idle.can_transition_to(Running));
        assert!(!Compiling.can_transition_to(Done));
    }

    #[test]
    fn test_failed_reachable_only_while_working() {
        use ExportPhase::*;
        assert!(!Idle.can_transition_to(Failed));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
        for phase in [EngineLoading, StagingInputs, Compiling, Running, Retrieving] {
            assert!(phase.can_transition_to(Failed), "{phase:?}");
        }
    }

    #[test]
    fn test_tracker_rejects_skipped_phase() {
        let mut tracker = ExportTracker::new(None);
        assert!(tracker.advance(ExportPhase::Running).is_err());
        assert_eq!(tracker.phase(), ExportPhase::Idle);
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_tracker_reports_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: StatusCallback = Box::new(move |status| {
            sink.lock().unwrap().push(status.message);
        });

        let mut tracker = ExportTracker::new(Some(&callback));
        tracker.advance(ExportPhase::EngineLoading).unwrap();
        tracker.fail();
        tracker.fail();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ExportPhase::EngineLoading.label().to_string(),
                EXPORT_FAILED_MESSAGE.to_string()
            ]
        );
        assert_eq!(tracker.history().len(), 2);
    }

    #[test]
    fn test_fail_before_start_is_ignored() {
        let mut tracker = ExportTracker::new(None);
        tracker.fail();
        assert_eq!(tracker.phase(), ExportPhase::Idle);
    }

    #[test]
    fn test_plan_export_for_default_edit() {
        let plan = plan_export(&EditSpec::default()).unwrap();
        assert!(plan.graph.is_empty());
        let args = plan.args();
        assert_eq!(args.first().map(String::as_str), Some("-i"));
        assert_eq!(args.last().map(String::as_str), Some(OUTPUT_NAME));
    }

    #[test]
    fn test_artifact_metadata() {
        let artifact = ExportArtifact::new(vec![1, 2, 3]);
        assert_eq!(artifact.file_name, "nexus_export.mp4");
        assert_eq!(artifact.mime_type, "video/mp4");
        assert_eq!(artifact.size(), 3);
    }

    #[test]
    fn test_status_and_plan_serialize() {
        let status = ExportStatus {
            phase: ExportPhase::StagingInputs,
            message: ExportPhase::StagingInputs.label().to_string(),
            at: Utc::now(),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["phase"], "staging_inputs");
        assert_eq!(value["message"], "Preparing files...");

        let plan = plan_export(&EditSpec::default()).unwrap();
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["graph"]["shape"], "simple");
        assert_eq!(value["command"]["output"], OUTPUT_NAME);
    }

    #[tokio::test]
    async fn test_missing_path_source_is_file_not_found() {
        let err = read_source(&MediaSource::path("/nonexistent/nexus/input.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, NexusError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_artifact_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(ARTIFACT_FILE_NAME);
        ExportArtifact::new(b"mp4".to_vec())
            .save_to(&path)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"mp4");
    }
}
