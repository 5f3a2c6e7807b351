//! Nexus Filter Graph
//!
//! Compiles an [`EditSpec`](nexus_edit_model::EditSpec) into the filter
//! expression the media engine evaluates.
//!
//! # Graph Shapes
//!
//! ```text
//! no sticker:   [crop] , [grade] , [caption]                    (-vf)
//!
//! sticker:      [0:v] crop,grade,caption|null [v0]
//!               [v0][1:v] overlay=x:y [v]                      (-filter_complex)
//! ```
//!
//! Fragments are built as a small AST and rendered to text in one place
//! ([`fragment`]), so quoting and escaping rules are applied uniformly.

pub mod fragment;
pub mod geometry;
pub mod graph;
pub mod presets;
pub mod text;

pub use fragment::*;
pub use geometry::crop_fragment;
pub use graph::*;
pub use presets::{preset_fragment, preset_fragment_by_name};
pub use text::text_fragment;
