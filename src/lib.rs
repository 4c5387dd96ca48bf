//! pdxmerge: parse, merge and render Paradox-style script directories.
//!
//! Layers, innermost first:
//! - [`domain`]: document model, line classifier, parser, merge engine, serializer
//! - [`application`]: services orchestrating discovery, parsing and output
//! - [`infrastructure`]: filesystem boundary and dependency wiring
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
