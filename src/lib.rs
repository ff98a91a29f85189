//! Formatting pipeline for AI-generated building-material analyses.
//!
//! Model output is resolved once into a [`types::RawReport`], turned into
//! blocks ([`sectionize`] for free text, [`normalize`] for structured JSON),
//! rendered into a [`visual::VisualDocument`] and finally painted or
//! exported.
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod render;
pub mod sectionize;
pub mod types;
pub mod upstream;
pub mod util;
pub mod visual;

pub use error::{ExportError, ReportError, Result};
pub use render::{outline, render, RenderOptions};
pub use types::{Block, ProjectData, RawReport, StructuredReport};
pub use visual::VisualDocument;
