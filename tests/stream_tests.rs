//! Stream and file tests
//!
//! Exercise the reader/writer entry points the binary is built on.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};

use ansi_optimizer::config::CliArgs;
use ansi_optimizer::{dump_events, optimize, optimize_stream, Config, Error};

/// Reader that returns a fixed number of bytes per call and fails once
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
    interrupted: bool,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.interrupted {
            self.interrupted = true;
            return Err(io::Error::new(io::ErrorKind::Interrupted, "try again"));
        }
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

/// Writer that always fails
struct Broken;

impl Write for Broken {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const SAMPLE: &[u8] = b"\x1b[0m\x1b[1m\x1b[1m$ ls\x1b[0m\r\n\x1b[34mdir\x1b[0m  file\r\n\x1b[2A\x1b[2B\x1b[K";

#[test]
fn test_stream_matches_buffer() {
    let mut out = Vec::new();
    let stats = optimize_stream(Cursor::new(SAMPLE), &mut out, &Config::default()).unwrap();
    assert_eq!(out, optimize(SAMPLE));
    assert_eq!(stats.bytes_in, SAMPLE.len() as u64);
    assert_eq!(stats.bytes_out, out.len() as u64);
    assert!(stats.bytes_out < stats.bytes_in);
}

#[test]
fn test_stream_survives_interrupts_and_short_reads() {
    let mut config = Config::default();
    config.limits.chunk_size = 3;
    let reader = Trickle {
        data: SAMPLE,
        step: 2,
        interrupted: false,
    };
    let mut out = Vec::new();
    optimize_stream(reader, &mut out, &config).unwrap();
    assert_eq!(out, optimize(SAMPLE));
}

#[test]
fn test_write_error_propagates() {
    let result = optimize_stream(Cursor::new(SAMPLE), Broken, &Config::default());
    match result {
        Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("Expected I/O error, got {:?}", other),
    }
}

#[test]
fn test_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("session.log");
    let output_path = dir.path().join("session.min");
    fs::write(&input_path, SAMPLE).unwrap();

    let input = File::open(&input_path).unwrap();
    let output = File::create(&output_path).unwrap();
    optimize_stream(input, output, &Config::default()).unwrap();

    assert_eq!(fs::read(&output_path).unwrap(), optimize(SAMPLE));
}

#[test]
fn test_config_file_drives_rules() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[rules]\ndrop_net_zero_moves = false\n").unwrap();

    let args = CliArgs {
        config: Some(config_path),
        ..Default::default()
    };
    let config = Config::load_with_args(&args).unwrap();

    let mut out = Vec::new();
    optimize_stream(Cursor::new(&b"\x1b[A\x1b[B"[..]), &mut out, &config).unwrap();
    assert_eq!(out, b"\x1b[A\x1b[B");
}

#[test]
fn test_invalid_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[limits]\nchunk_size = 0\n").unwrap();

    let args = CliArgs {
        config: Some(config_path),
        ..Default::default()
    };
    match Config::load_with_args(&args) {
        Err(Error::Config { field, .. }) => assert_eq!(field, "limits.chunk_size"),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_dump_events_json_lines() {
    let mut out = Vec::new();
    let stats = dump_events(
        Cursor::new(&b"\x1b[31m\x1b[32mx\x1b[?25l"[..]),
        &mut out,
        &Config::default(),
    )
    .unwrap();

    assert_eq!(stats.bytes_out, out.len() as u64);
    assert!(stats.bytes_out > stats.bytes_in);
    assert_eq!(stats.savings(), 0.0);
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(stats.events_in, 4);
    assert_eq!(stats.events_out, 3);
    assert_eq!(stats.unrecognized, 1);
}
