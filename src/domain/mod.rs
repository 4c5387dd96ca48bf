//! Domain layer: document model, parser, merge engine and serializer
//!
//! This layer is independent of external concerns (no file system, no CLI, no config loading).

pub mod classifier;
pub mod entities;
pub mod error;
pub mod merge;
pub mod number;
pub mod parser;
pub mod serializer;

pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use merge::{merge, MergeStats};
pub use number::{Decimal, NumberError};
pub use parser::{
    parse_str, read_lines, Diagnostic, DiagnosticKind, ParsedFile, ScriptParser, MAX_DEPTH,
};
pub use serializer::{render_forest, render_node, RenderOptions};
