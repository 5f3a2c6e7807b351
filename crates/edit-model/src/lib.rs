//! Nexus Edit Model
//!
//! Defines the data contracts for a single export:
//! - **Edit:** The validated edit description (trim, framing, grade, overlays)
//! - **Form:** Raw user input and the fallback rules that turn it into an edit
//! - **Source:** Opaque handles to the bytes of the video and sticker image
//!
//! An [`EditSpec`] is an immutable value built once per export attempt. Every
//! derived artifact (filter graph, engine command) is recomputed from it.

pub mod edit;
pub mod form;
pub mod source;

pub use edit::*;
pub use form::*;
pub use source::*;
