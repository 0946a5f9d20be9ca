//! Diagnostics for sequences passed through verbatim
//!
//! The optimizer never fails on bad input. Malformed and unrecognized
//! sequences are reported to a [`DiagnosticSink`] and then copied to the
//! output unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnostic class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Bytes that did not form a complete sequence
    MalformedSequence,
    /// A well-formed sequence (or SGR parameter) that is not understood
    UnrecognizedSequence,
}

/// A single report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Offset of the token in the input stream
    pub offset: u64,
    /// The token's bytes
    pub bytes: Vec<u8>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            DiagnosticKind::MalformedSequence => "malformed sequence",
            DiagnosticKind::UnrecognizedSequence => "unrecognized sequence",
        };
        write!(f, "{} at byte {}: {}", what, self.offset, self.bytes.escape_ascii())
    }
}

/// Receiver of diagnostics
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Logs every diagnostic at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        tracing::debug!("{}", diagnostic);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _diagnostic: &Diagnostic) {}
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: &Diagnostic) {
        (**self).report(diagnostic);
    }
}
