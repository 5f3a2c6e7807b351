//! Engine command assembly.
//!
//! The engine is position-sensitive: options apply to the next input or
//! output that follows them. Sections are therefore always emitted as
//! inputs, trim, filter, encoding, output name.

use nexus_edit_model::EditSpec;
use nexus_filter_graph::{FilterGraph, OUTPUT_LABEL};
use serde::Serialize;

/// Virtual file the source video is staged as.
pub const VIDEO_INPUT_NAME: &str = "input.mp4";

/// Virtual file the sticker image is staged as.
pub const STICKER_INPUT_NAME: &str = "sticker.png";

/// Virtual file the engine writes.
pub const OUTPUT_NAME: &str = "output.mp4";

/// Audio of the primary input; `?` keeps silent sources from failing.
const OPTIONAL_SOURCE_AUDIO: &str = "0:a?";

/// Output encoding, identical for every export. Quality over size: slow x264
/// at CRF 18 with a 9 Mbit/s floor, 30 fps, AAC 192k.
const ENCODING_OPTIONS: [(&str, &str); 9] = [
    ("-c:v", "libx264"),
    ("-preset", "slow"),
    ("-crf", "18"),
    ("-pix_fmt", "yuv420p"),
    ("-movflags", "+faststart"),
    ("-r", "30"),
    ("-b:v", "9000k"),
    ("-c:a", "aac"),
    ("-b:a", "192k"),
];

/// Sections of a command, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSection {
    Inputs,
    Trim,
    Filter,
    Encoding,
    Output,
}

/// A `flag value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOption {
    pub flag: &'static str,
    pub value: String,
}

impl CommandOption {
    pub fn new(flag: &'static str, value: impl Into<String>) -> Self {
        Self {
            flag,
            value: value.into(),
        }
    }
}

/// A fully assembled engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineCommand {
    pub inputs: Vec<CommandOption>,
    pub trim: Vec<CommandOption>,
    pub filter: Vec<CommandOption>,
    pub encoding: Vec<CommandOption>,
    pub output: String,
}

impl EngineCommand {
    /// Each section with its options, in emission order.
    pub fn sections(&self) -> [(CommandSection, &[CommandOption]); 4] {
        [
            (CommandSection::Inputs, self.inputs.as_slice()),
            (CommandSection::Trim, self.trim.as_slice()),
            (CommandSection::Filter, self.filter.as_slice()),
            (CommandSection::Encoding, self.encoding.as_slice()),
        ]
    }

    /// Linearize into the argument list handed to the engine.
    pub fn to_args(&self) -> Vec<String> {
        self.tagged_args().into_iter().map(|(_, arg)| arg).collect()
    }

    /// Arguments paired with the section they belong to.
    pub fn tagged_args(&self) -> Vec<(CommandSection, String)> {
        let mut args = Vec::new();
        for (section, options) in self.sections() {
            for option in options {
                args.push((section, option.flag.to_string()));
                args.push((section, option.value.clone()));
            }
        }
        args.push((CommandSection::Output, self.output.clone()));
        args
    }

    /// Value of the first option with `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.sections()
            .into_iter()
            .flat_map(|(_, options)| options.iter())
            .find(|option| option.flag == flag)
            .map(|option| option.value.as_str())
    }

    /// Single shell-style line for logs and dry runs.
    pub fn display(&self, program: &str) -> String {
        std::iter::once(program.to_string())
            .chain(self.to_args().iter().map(|arg| shell_quote(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Contradictions between the command and its graph. Empty for anything
    /// [`assemble`] produces; a non-empty result is a compiler defect.
    pub fn problems(&self, graph: &FilterGraph) -> Vec<String> {
        let mut problems = graph.dangling_labels();

        for option in &self.filter {
            if option.value.is_empty() {
                problems.push(format!("{} has an empty value", option.flag));
            }
        }

        let uses_complex = self.value_of("-filter_complex").is_some();
        if uses_complex != graph.is_labeled() {
            problems.push("filter option does not match graph shape".to_string());
        }
        if graph.is_labeled() && self.inputs.len() < 2 {
            problems.push("labeled graph needs the sticker input".to_string());
        }
        if self.output.is_empty() {
            problems.push("output name is empty".to_string());
        }

        problems
    }
}

/// Assemble the engine command for an edit and its compiled graph.
///
/// Pure and total: no media is inspected and nothing is reordered.
pub fn assemble(spec: &EditSpec, graph: &FilterGraph) -> EngineCommand {
    let mut inputs = vec![CommandOption::new("-i", VIDEO_INPUT_NAME)];
    if spec.has_sticker() {
        inputs.push(CommandOption::new("-i", STICKER_INPUT_NAME));
    }

    let mut trim = Vec::new();
    if let Some(start) = spec.trim.effective_start() {
        trim.push(CommandOption::new("-ss", format_seconds(start)));
    }
    if let Some(end) = spec.trim.effective_end() {
        trim.push(CommandOption::new("-to", format_seconds(end)));
    }

    let filter = match graph {
        FilterGraph::Labeled { .. } => vec![
            CommandOption::new("-filter_complex", graph.render()),
            CommandOption::new("-map", format!("[{OUTPUT_LABEL}]")),
            CommandOption::new("-map", OPTIONAL_SOURCE_AUDIO),
        ],
        FilterGraph::Simple { chain } if chain.is_empty() => Vec::new(),
        FilterGraph::Simple { chain } => vec![CommandOption::new("-vf", chain.render())],
    };

    EngineCommand {
        inputs,
        trim,
        filter,
        encoding: encoding_options(),
        output: OUTPUT_NAME.to_string(),
    }
}

/// The fixed output-encoding block.
pub fn encoding_options() -> Vec<CommandOption> {
    ENCODING_OPTIONS
        .iter()
        .map(|&(flag, value)| CommandOption::new(flag, value))
        .collect()
}

/// Seconds in their shortest form: `5`, `2.5`.
pub fn format_seconds(secs: f64) -> String {
    format!("{secs}")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+@,%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
