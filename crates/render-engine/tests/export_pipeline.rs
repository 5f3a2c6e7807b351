use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use nexus_common::error::{NexusError, NexusResult, EXPORT_FAILED_MESSAGE};
use nexus_edit_model::{AspectRatio, ColorPreset, EditSpec, MediaSource, TextOverlay};
use nexus_render_engine::{
    export_edit, ExportPhase, ExportRequest, MediaEngine, StatusCallback, OUTPUT_NAME,
    STICKER_INPUT_NAME, VIDEO_INPUT_NAME,
};

/// In-memory engine that records what it was asked to do.
#[derive(Default)]
struct FakeEngine {
    loaded: bool,
    load_calls: usize,
    files: HashMap<String, Vec<u8>>,
    runs: Vec<Vec<String>>,
    fail_run: bool,
    skip_output: bool,
}

impl MediaEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn load(&mut self) -> NexusResult<()> {
        self.load_calls += 1;
        self.loaded = true;
        Ok(())
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> NexusResult<()> {
        self.files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn run(&mut self, args: &[String]) -> NexusResult<()> {
        self.runs.push(args.to_vec());
        if self.fail_run {
            return Err(NexusError::engine("Conversion failed! (exit status 1)"));
        }
        if !self.skip_output {
            self.files
                .insert(OUTPUT_NAME.to_string(), b"fake-mp4-bytes".to_vec());
        }
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> NexusResult<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| NexusError::retrieval(format!("{name} not found")))
    }
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join(name)
}

fn recorder() -> (StatusCallback, Arc<Mutex<Vec<ExportPhase>>>) {
    let phases = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&phases);
    let callback: StatusCallback = Box::new(move |status| {
        sink.lock().unwrap().push(status.phase);
    });
    (callback, phases)
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

const ENCODING: [&str; 18] = [
    "-c:v", "libx264", "-preset", "slow", "-crf", "18", "-pix_fmt", "yuv420p", "-movflags",
    "+faststart", "-r", "30", "-b:v", "9000k", "-c:a", "aac", "-b:a", "192k",
];

#[tokio::test]
async fn export_without_video_is_inert() {
    let mut engine = FakeEngine::default();
    let (callback, phases) = recorder();
    let request = ExportRequest::new(EditSpec::default(), None);

    let result = export_edit(&mut engine, &request, Some(&callback))
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(engine.load_calls, 0);
    assert!(engine.runs.is_empty());
    assert!(phases.lock().unwrap().is_empty());
}

#[tokio::test]
async fn square_vivid_caption_export_runs_expected_command() {
    let mut engine = FakeEngine::default();
    let (callback, phases) = recorder();
    let spec = EditSpec::default()
        .with_trim(2.0, Some(8.0))
        .with_aspect_ratio(AspectRatio::R1x1)
        .with_color_preset(ColorPreset::Vivid)
        .with_text(TextOverlay::new("Hi", 10, 10, 20));
    let request = ExportRequest::new(spec, Some(MediaSource::bytes(b"source".to_vec())));

    let artifact = export_edit(&mut engine, &request, Some(&callback))
        .await
        .unwrap()
        .expect("artifact");

    assert_eq!(artifact.file_name, "nexus_export.mp4");
    assert_eq!(artifact.mime_type, "video/mp4");
    assert_eq!(artifact.bytes, b"fake-mp4-bytes");

    let mut expected = strings(&[
        "-i",
        "input.mp4",
        "-ss",
        "2",
        "-to",
        "8",
        "-vf",
        "crop='min(iw,ih)':'min(iw,ih)',\
         eq=contrast=1.2:saturation=1.35:brightness=0.02,\
         drawtext=text='Hi':x=10:y=10:fontsize=20:fontcolor=white:box=1:boxcolor=black@0.5:boxborderw=12",
    ]);
    expected.extend(strings(&ENCODING));
    expected.push("output.mp4".to_string());
    assert_eq!(engine.runs, vec![expected]);

    assert_eq!(engine.files.get(VIDEO_INPUT_NAME).unwrap(), b"source");
    assert!(!engine.files.contains_key(STICKER_INPUT_NAME));

    assert_eq!(
        *phases.lock().unwrap(),
        vec![
            ExportPhase::EngineLoading,
            ExportPhase::StagingInputs,
            ExportPhase::Compiling,
            ExportPhase::Running,
            ExportPhase::Retrieving,
            ExportPhase::Done,
        ]
    );
}

#[tokio::test]
async fn fixture_edit_with_sticker_uses_labeled_graph() {
    let spec = EditSpec::load(fixture("sample-edit.json")).unwrap();
    let sticker_bytes = std::fs::read(fixture("sticker.png")).unwrap();

    let mut engine = FakeEngine::default();
    let request = ExportRequest::new(spec, Some(MediaSource::bytes(b"source".to_vec())));
    export_edit(&mut engine, &request, None)
        .await
        .unwrap()
        .expect("artifact");

    assert_eq!(engine.files.get(STICKER_INPUT_NAME), Some(&sticker_bytes));

    let args = &engine.runs[0];
    assert_eq!(
        &args[..8],
        strings(&["-i", "input.mp4", "-i", "sticker.png", "-ss", "2", "-to", "8"]).as_slice()
    );
    assert_eq!(args[8], "-filter_complex");
    assert!(args[9].starts_with("[0:v]crop="));
    assert!(args[9].ends_with("[v0];[v0][1:v]overlay=50:50[v]"));
    assert_eq!(&args[10..14], strings(&["-map", "[v]", "-map", "0:a?"]).as_slice());
    assert!(!args.iter().any(|a| a == "-vf"));
    assert_eq!(args.last().map(String::as_str), Some("output.mp4"));
}

#[tokio::test]
async fn engine_failure_collapses_into_generic_message() {
    let mut engine = FakeEngine {
        fail_run: true,
        ..FakeEngine::default()
    };
    let (callback, phases) = recorder();
    let request = ExportRequest::new(
        EditSpec::default(),
        Some(MediaSource::bytes(b"source".to_vec())),
    );

    let err = export_edit(&mut engine, &request, Some(&callback))
        .await
        .unwrap_err();

    assert!(matches!(err, NexusError::ExportFailed { .. }));
    assert_eq!(err.to_string(), EXPORT_FAILED_MESSAGE);
    assert_eq!(
        phases.lock().unwrap().last().copied(),
        Some(ExportPhase::Failed)
    );
    assert!(!phases.lock().unwrap().contains(&ExportPhase::Retrieving));
}

#[tokio::test]
async fn missing_output_is_a_failed_export() {
    let mut engine = FakeEngine {
        skip_output: true,
        ..FakeEngine::default()
    };
    let request = ExportRequest::new(
        EditSpec::default(),
        Some(MediaSource::bytes(b"source".to_vec())),
    );

    let err = export_edit(&mut engine, &request, None).await.unwrap_err();
    assert_eq!(err.to_string(), EXPORT_FAILED_MESSAGE);
    assert_eq!(engine.runs.len(), 1);
}

#[tokio::test]
async fn unreadable_video_fails_before_running() {
    let mut engine = FakeEngine::default();
    let request = ExportRequest::new(
        EditSpec::default(),
        Some(MediaSource::path("/nonexistent/nexus/source.mp4")),
    );

    let err = export_edit(&mut engine, &request, None).await.unwrap_err();
    assert_eq!(err.to_string(), EXPORT_FAILED_MESSAGE);
    assert!(engine.runs.is_empty());
}

#[tokio::test]
async fn engine_loads_once_per_session() {
    let mut engine = FakeEngine::default();
    let request = ExportRequest::new(
        EditSpec::default().with_color_preset(ColorPreset::Cinema),
        Some(MediaSource::bytes(b"source".to_vec())),
    );

    for _ in 0..3 {
        export_edit(&mut engine, &request, None).await.unwrap();
    }

    assert_eq!(engine.load_calls, 1);
    assert_eq!(engine.runs.len(), 3);
    assert_eq!(engine.runs[0], engine.runs[2]);
}

#[tokio::test]
async fn status_callback_runs_inline_on_exporting_thread() {
    let caller = std::thread::current().id();
    let threads = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&threads);
    let callback: StatusCallback = Box::new(move |_| {
        sink.lock().unwrap().push(std::thread::current().id());
    });

    let mut engine = FakeEngine::default();
    let request = ExportRequest::new(
        EditSpec::default(),
        Some(MediaSource::bytes(b"source".to_vec())),
    );
    export_edit(&mut engine, &request, Some(&callback))
        .await
        .unwrap();

    let threads = threads.lock().unwrap();
    assert_eq!(threads.len(), 6);
    assert!(threads.iter().all(|id| *id == caller));
}
