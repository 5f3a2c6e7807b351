//! Filter graph construction.
//!
//! Decides the structural shape of the graph: a plain per-stream chain when
//! only the source video is involved, or a labeled two-node graph when a
//! sticker image has to be composited on top.

use std::collections::HashSet;
use std::fmt;

use nexus_edit_model::EditSpec;
use serde::Serialize;

use crate::fragment::{Filter, FilterChain, FilterFragment};
use crate::{crop_fragment, preset_fragment, text_fragment};

/// Label of the graph's final video stream.
pub const OUTPUT_LABEL: &str = "v";

/// Label of the graded/captioned source before the sticker goes on.
pub const BASE_LABEL: &str = "v0";

/// Input index of the primary video.
pub const VIDEO_INPUT: usize = 0;

/// Input index of the sticker image, when present.
pub const STICKER_INPUT: usize = 1;

/// A stream reference in a labeled graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamLabel {
    /// Video stream of a raw input, e.g. `[1:v]`.
    InputVideo(usize),
    /// Stream produced by an earlier node, e.g. `[v0]`.
    Named(String),
}

impl StreamLabel {
    pub fn named(label: impl Into<String>) -> Self {
        Self::Named(label.into())
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputVideo(index) => write!(f, "[{index}:v]"),
            Self::Named(label) => write!(f, "[{label}]"),
        }
    }
}

/// One `inputs chain output` statement of a labeled graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub inputs: Vec<StreamLabel>,
    pub chain: FilterChain,
    pub output: StreamLabel,
}

impl GraphNode {
    /// Render the node. An empty chain becomes the identity filter so the
    /// output label always exists.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for input in &self.inputs {
            out.push_str(&input.to_string());
        }
        out.push_str(&self.chain.render_or_passthrough());
        out.push_str(&self.output.to_string());
        out
    }
}

/// The compiled filter graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum FilterGraph {
    /// Chain over the only video stream; wiring is implicit.
    Simple { chain: FilterChain },
    /// Explicitly wired multi-input graph ending in [`OUTPUT_LABEL`].
    Labeled { nodes: Vec<GraphNode> },
}

impl FilterGraph {
    pub fn is_labeled(&self) -> bool {
        matches!(self, Self::Labeled { .. })
    }

    /// True for a simple graph with nothing to apply.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Simple { chain } => chain.is_empty(),
            Self::Labeled { nodes } => nodes.is_empty(),
        }
    }

    /// Label to map to the output, for labeled graphs.
    pub fn output_label(&self) -> Option<&StreamLabel> {
        match self {
            Self::Simple { .. } => None,
            Self::Labeled { nodes } => nodes.last().map(|node| &node.output),
        }
    }

    /// Render to the engine's textual grammar.
    ///
    /// Simple graphs render as a `,`-joined chain (empty when there is
    /// nothing to do); labeled graphs join nodes with `;`.
    pub fn render(&self) -> String {
        match self {
            Self::Simple { chain } => chain.render(),
            Self::Labeled { nodes } => nodes
                .iter()
                .map(GraphNode::render)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }

    /// Wiring problems: labels consumed before being produced, labels
    /// produced twice, input counts that do not match the consuming filter,
    /// or a final label other than [`OUTPUT_LABEL`]. Empty for every graph
    /// [`build_graph`] returns.
    pub fn dangling_labels(&self) -> Vec<String> {
        let Self::Labeled { nodes } = self else {
            return Vec::new();
        };

        let mut problems = Vec::new();
        let mut produced: HashSet<&str> = HashSet::new();
        for (idx, node) in nodes.iter().enumerate() {
            for input in &node.inputs {
                if let StreamLabel::Named(label) = input {
                    if !produced.contains(label.as_str()) {
                        problems.push(format!("node {idx} consumes unknown label [{label}]"));
                    }
                }
            }
            if node.inputs.len() != node.chain.input_count() {
                problems.push(format!(
                    "node {idx} wires {} inputs into a filter taking {}",
                    node.inputs.len(),
                    node.chain.input_count()
                ));
            }
            match &node.output {
                StreamLabel::Named(label) => {
                    if !produced.insert(label.as_str()) {
                        problems.push(format!("node {idx} redefines label [{label}]"));
                    }
                }
                StreamLabel::InputVideo(index) => {
                    problems.push(format!("node {idx} writes to raw input {index}"));
                }
            }
        }

        match nodes.last().map(|node| &node.output) {
            Some(StreamLabel::Named(label)) if label == OUTPUT_LABEL => {}
            other => problems.push(format!(
                "graph must end in [{OUTPUT_LABEL}], ends in {}",
                other.map(ToString::to_string).unwrap_or_else(|| "nothing".to_string())
            )),
        }

        problems
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Where the sticker is placed over the picture, in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickerPlacement {
    pub x: i32,
    pub y: i32,
}

/// `overlay` fragment compositing the second input at `(x, y)`.
pub fn overlay_fragment(placement: StickerPlacement) -> FilterFragment {
    FilterFragment::new(
        Filter::new("overlay")
            .with_inputs(2)
            .arg(placement.x)
            .arg(placement.y),
    )
}

/// Compose fragments into a graph.
///
/// Fragments are chained crop, then grade, then caption: the caption is drawn
/// on the final framed and graded picture and is never cropped or graded
/// itself. With a sticker the chain becomes node `[0:v]..[v0]` (identity if
/// empty) followed by `[v0][1:v]overlay[v]`.
pub fn build_graph(
    crop: Option<FilterFragment>,
    preset: Option<FilterFragment>,
    text: Option<FilterFragment>,
    sticker: Option<StickerPlacement>,
) -> FilterGraph {
    let chain: FilterChain = [crop, preset, text].into_iter().flatten().collect();

    let Some(placement) = sticker else {
        return FilterGraph::Simple { chain };
    };

    let base = GraphNode {
        inputs: vec![StreamLabel::InputVideo(VIDEO_INPUT)],
        chain,
        output: StreamLabel::named(BASE_LABEL),
    };
    let overlay = GraphNode {
        inputs: vec![
            StreamLabel::named(BASE_LABEL),
            StreamLabel::InputVideo(STICKER_INPUT),
        ],
        chain: std::iter::once(overlay_fragment(placement)).collect(),
        output: StreamLabel::named(OUTPUT_LABEL),
    };

    FilterGraph::Labeled {
        nodes: vec![base, overlay],
    }
}

/// Compile an edit into its filter graph.
pub fn compile_graph(spec: &EditSpec) -> FilterGraph {
    let graph = build_graph(
        crop_fragment(spec.aspect_ratio),
        preset_fragment(spec.color_preset),
        spec.text().and_then(text_fragment),
        spec.sticker().map(|sticker| StickerPlacement {
            x: sticker.x,
            y: sticker.y,
        }),
    );

    tracing::debug!(
        labeled = graph.is_labeled(),
        ratio = spec.aspect_ratio.name(),
        preset = spec.color_preset.name(),
        caption = spec.text().is_some(),
        graph = %graph,
        "Filter graph compiled"
    );

    graph
}
