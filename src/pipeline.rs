//! Streaming pipeline
//!
//! Wires lexer, normalizer, optimizer and serializer together and applies
//! the length guard: every segment between two hard barriers (text runs and
//! whole-token opaques) is emitted either optimized or exactly as it came
//! in, whichever is not longer.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::SemanticEvent;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink, TracingSink};
use crate::error::Result;
use crate::normalizer::{Normalized, Normalizer};
use crate::optimizer::Optimizer;
use crate::parser::{Lexer, Token};
use crate::serializer::Serializer;

/// Counters collected while optimizing a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub tokens: u64,
    /// Events produced by the normalizer
    pub events_in: u64,
    /// Events left after optimization
    pub events_out: u64,
    pub malformed: u64,
    pub unrecognized: u64,
    /// Segments emitted unchanged because optimizing did not shorten them
    pub raw_segments: u64,
}

impl Stats {
    /// Bytes saved, as a fraction of the input
    pub fn savings(&self) -> f64 {
        if self.bytes_in == 0 {
            return 0.0;
        }
        self.bytes_in.saturating_sub(self.bytes_out) as f64 / self.bytes_in as f64
    }
}

/// Bytes-in, bytes-out optimizer for one stream
///
/// [`feed`](Self::feed) produces bytes and [`feed_events`](Self::feed_events)
/// produces the optimized events themselves; use one of them per stream.
pub struct Pipeline<S: DiagnosticSink = TracingSink> {
    lexer: Lexer,
    normalizer: Normalizer,
    optimizer: Optimizer,
    serializer: Serializer,
    sink: S,
    /// Input bytes of the current segment
    segment_raw: Vec<u8>,
    /// Optimized bytes of the current segment
    segment_out: Vec<u8>,
    tokens: Vec<Token>,
    stats: Stats,
}

impl Pipeline {
    /// Create a pipeline that logs diagnostics through `tracing`
    pub fn new(config: &Config) -> Self {
        Self::with_sink(config, TracingSink)
    }
}

impl<S: DiagnosticSink> Pipeline<S> {
    /// Create a pipeline reporting diagnostics to `sink`
    pub fn with_sink(config: &Config, sink: S) -> Self {
        Self {
            lexer: Lexer::with_max_sequence_len(config.limits.max_sequence_len),
            normalizer: Normalizer::new(),
            optimizer: Optimizer::new(config.rules),
            serializer: Serializer::new(),
            sink,
            segment_raw: Vec::new(),
            segment_out: Vec::new(),
            tokens: Vec::new(),
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Consume the pipeline, returning the diagnostics sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Return to the start-of-stream state so the pipeline can take a new
    /// stream; buffers keep their capacity
    pub fn reset(&mut self) {
        self.lexer.reset();
        self.normalizer.reset();
        self.optimizer.reset();
        self.serializer.reset();
        self.segment_raw.clear();
        self.segment_out.clear();
        self.tokens.clear();
        self.stats = Stats::default();
    }

    /// Process a chunk of input, appending finished output to `out`
    ///
    /// Output for a pending segment is held back until the segment closes.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        let start = out.len();
        self.lex(chunk, |pipeline, token| pipeline.process(token, out));
        self.stats.bytes_out += (out.len() - start) as u64;
    }

    /// Signal end of stream and emit everything still pending
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        let start = out.len();
        if let Some(token) = self.lexer.finish() {
            self.process(token, out);
        }
        self.close_segment(out);
        self.stats.bytes_out += (out.len() - start) as u64;
        self.log_summary();
    }

    /// Process a chunk of input, appending optimized events to `events`
    ///
    /// No serialization or length guard is applied and `bytes_out` is left
    /// to the caller.
    pub fn feed_events(&mut self, chunk: &[u8], events: &mut Vec<SemanticEvent>) {
        self.lex(chunk, |pipeline, token| pipeline.process_events(token, events));
    }

    /// Signal end of stream and append every event still pending
    pub fn finish_events(&mut self, events: &mut Vec<SemanticEvent>) {
        if let Some(token) = self.lexer.finish() {
            self.process_events(token, events);
        }
        let Self {
            optimizer, stats, ..
        } = self;
        optimizer.finish(|event| {
            stats.events_out += 1;
            events.push(event);
        });
        self.log_summary();
    }

    fn log_summary(&self) {
        tracing::debug!(
            "stream finished: {} bytes in, {} bytes out, {} raw segments",
            self.stats.bytes_in,
            self.stats.bytes_out,
            self.stats.raw_segments
        );
    }

    /// Lex a chunk and hand every completed token to `process`
    fn lex<F>(&mut self, chunk: &[u8], mut process: F)
    where
        F: FnMut(&mut Self, Token),
    {
        self.stats.bytes_in += chunk.len() as u64;
        let mut tokens = std::mem::take(&mut self.tokens);
        self.lexer.feed(chunk, |token| tokens.push(token));
        for token in tokens.drain(..) {
            process(self, token);
        }
        self.tokens = tokens;
    }

    /// Normalize one token, counting it and reporting its diagnostic
    fn normalize(&mut self, token: &Token) -> Normalized {
        self.stats.tokens += 1;
        let normalized = self.normalizer.normalize(token);
        if let Some(diagnostic) = &normalized.diagnostic {
            match diagnostic.kind {
                DiagnosticKind::MalformedSequence => self.stats.malformed += 1,
                DiagnosticKind::UnrecognizedSequence => self.stats.unrecognized += 1,
            }
            self.sink.report(diagnostic);
        }
        self.stats.events_in += normalized.events.len() as u64;
        normalized
    }

    fn process_events(&mut self, token: Token, events: &mut Vec<SemanticEvent>) {
        let normalized = self.normalize(&token);
        let Self {
            optimizer, stats, ..
        } = self;
        for event in normalized.events {
            optimizer.push(event, |event| {
                stats.events_out += 1;
                events.push(event);
            });
        }
    }

    fn process(&mut self, token: Token, out: &mut Vec<u8>) {
        let normalized = self.normalize(&token);

        if normalized.is_hard_barrier() {
            self.close_segment(out);
            let Self {
                optimizer,
                serializer,
                stats,
                ..
            } = self;
            for event in normalized.events {
                optimizer.push(event, |event| {
                    stats.events_out += 1;
                    serializer.write(&event, out);
                });
            }
            return;
        }

        token.write_to(&mut self.segment_raw);
        let Self {
            optimizer,
            serializer,
            segment_out,
            stats,
            ..
        } = self;
        for event in normalized.events {
            optimizer.push(event, |event| {
                stats.events_out += 1;
                serializer.write(&event, segment_out);
            });
        }
    }

    /// Flush the pending run and emit the shorter rendition of the segment
    fn close_segment(&mut self, out: &mut Vec<u8>) {
        let Self {
            optimizer,
            serializer,
            segment_out,
            stats,
            ..
        } = self;
        optimizer.finish(|event| {
            stats.events_out += 1;
            serializer.write(&event, segment_out);
        });
        serializer.flush(segment_out);

        if self.segment_out.len() > self.segment_raw.len() {
            tracing::trace!(
                "kept {} raw bytes over {} optimized",
                self.segment_raw.len(),
                self.segment_out.len()
            );
            self.stats.raw_segments += 1;
            out.extend_from_slice(&self.segment_raw);
        } else {
            out.extend_from_slice(&self.segment_out);
        }
        self.segment_raw.clear();
        self.segment_out.clear();
    }
}

/// Optimize a complete buffer with the default configuration
pub fn optimize(input: &[u8]) -> Vec<u8> {
    optimize_with(input, &Config::default())
}

/// Optimize a complete buffer
pub fn optimize_with(input: &[u8], config: &Config) -> Vec<u8> {
    let mut pipeline = Pipeline::new(config);
    let mut out = Vec::with_capacity(input.len());
    pipeline.feed(input, &mut out);
    pipeline.finish(&mut out);
    out
}

/// Read the next chunk, retrying reads cut short by a signal
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Read `reader` to the end in chunks, writing optimized bytes to `writer`
pub fn optimize_stream<R, W>(mut reader: R, mut writer: W, config: &Config) -> Result<Stats>
where
    R: Read,
    W: Write,
{
    let mut pipeline = Pipeline::new(config);
    let mut buf = vec![0u8; config.limits.chunk_size];
    let mut out = Vec::new();

    loop {
        let n = read_chunk(&mut reader, &mut buf)?;
        if n == 0 {
            break;
        }
        pipeline.feed(&buf[..n], &mut out);
        writer.write_all(&out)?;
        out.clear();
    }

    pipeline.finish(&mut out);
    writer.write_all(&out)?;
    writer.flush()?;
    Ok(*pipeline.stats())
}

/// Write each event as one JSON line, returning the number of bytes written
fn write_json_lines<W: Write>(
    events: &mut Vec<SemanticEvent>,
    writer: &mut W,
    line: &mut Vec<u8>,
) -> Result<u64> {
    let mut written = 0;
    for event in events.drain(..) {
        line.clear();
        serde_json::to_writer(&mut *line, &event)?;
        line.push(b'\n');
        writer.write_all(line)?;
        written += line.len() as u64;
    }
    Ok(written)
}

/// Write the optimized event stream as JSON lines instead of bytes
///
/// The length guard does not apply; every optimized event is written.
pub fn dump_events<R, W>(mut reader: R, mut writer: W, config: &Config) -> Result<Stats>
where
    R: Read,
    W: Write,
{
    let mut pipeline = Pipeline::new(config);
    let mut buf = vec![0u8; config.limits.chunk_size];
    let mut events = Vec::new();
    let mut line = Vec::new();

    loop {
        let n = read_chunk(&mut reader, &mut buf)?;
        if n == 0 {
            break;
        }
        pipeline.feed_events(&buf[..n], &mut events);
        pipeline.stats.bytes_out += write_json_lines(&mut events, &mut writer, &mut line)?;
    }

    pipeline.finish_events(&mut events);
    pipeline.stats.bytes_out += write_json_lines(&mut events, &mut writer, &mut line)?;
    writer.flush()?;
    Ok(pipeline.stats)
}
