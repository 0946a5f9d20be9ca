//! ANSI Escape Sequence Optimizer
//!
//! Rewrites a byte stream of text and terminal control sequences into a
//! shorter stream that a terminal displays identically. The pipeline is:
//!
//! - `parser`: byte-level lexer producing lossless tokens
//! - `normalizer`: tokens to canonical semantic events
//! - `core`: events, attributes, colors and the terminal state tracker
//! - `optimizer`: run-based rewriting of semantic events
//! - `serializer`: shortest encoding of events
//! - `pipeline`: streaming driver with the length guard
//!
//! ```
//! let out = ansi_optimizer::optimize(b"\x1b[31m\x1b[32mgreen");
//! assert_eq!(out, b"\x1b[32mgreen");
//! ```

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod normalizer;
pub mod optimizer;
pub mod parser;
pub mod pipeline;
pub mod serializer;

pub use config::{Config, Limits, Rules};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
pub use error::{Error, Result};
pub use pipeline::{dump_events, optimize, optimize_stream, optimize_with, Pipeline, Stats};
