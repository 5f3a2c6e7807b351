//! Nexus Render Engine
//!
//! Turns an [`EditSpec`](nexus_edit_model::EditSpec) plus source media into an
//! exported video by driving a media engine.
//!
//! # Pipeline Architecture
//!
//! ```text
//! video ──────┐
//!             ├── Stage (input.mp4, sticker.png)
//! sticker ────┘         │
//!                       ├── Compile (filter graph)
//! EditSpec ─────────────┘         │
//!                                 ├── Assemble (inputs, trim, filter, encoding)
//!                                 │
//!                                 ▼
//!                          Engine run (ffmpeg)
//!                                 │
//!                                 ▼
//!                           output.mp4 ──► nexus_export.mp4
//! ```

pub mod command;
pub mod engine;
pub mod export;

pub use command::*;
pub use engine::*;
pub use export::*;
