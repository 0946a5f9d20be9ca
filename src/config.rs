//! Configuration for the optimizer
//!
//! This module provides the configuration system with:
//! - XDG-compliant config file location
//! - CLI argument overrides
//! - Environment variable support
//! - Config precedence: CLI > env > file > defaults
//! - Validation with the offending field named in the error

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::parser::DEFAULT_MAX_SEQUENCE_LEN;

/// Prefix of every environment variable read by [`Config::apply_env_vars`]
pub const ENV_PREFIX: &str = "ANSI_OPTIMIZER_";

/// CLI arguments for `ansi-optimize`
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ansi-optimize")]
#[command(version)]
#[command(about = "Remove redundant terminal control sequences without changing what is displayed", long_about = None)]
pub struct CliArgs {
    /// Input file (reads stdin when omitted)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output file (writes stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep attribute changes as separate sequences
    #[arg(long)]
    pub no_coalesce: bool,

    /// Do not fold consecutive cursor moves
    #[arg(long)]
    pub no_fold: bool,

    /// Keep relative moves that cancel out
    #[arg(long)]
    pub keep_net_zero_moves: bool,

    /// Keep sequences that re-set already known state
    #[arg(long)]
    pub no_redundant_state: bool,

    /// Keep repeated idempotent sequences
    #[arg(long)]
    pub no_collapse: bool,

    /// Read size in bytes
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Longest sequence kept whole, in bytes
    #[arg(long, value_name = "BYTES")]
    pub max_sequence_len: Option<usize>,

    /// Print statistics as JSON to stderr when done
    #[arg(long)]
    pub stats: bool,

    /// Write optimized events as JSON lines instead of bytes
    #[arg(long)]
    pub dump_events: bool,
}

/// Rewriting rules that can be switched off individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Drop events (and attribute components) that change nothing
    pub redundant_state: bool,
    /// Merge attribute events within a run
    pub coalesce_attributes: bool,
    /// Sum relative moves and let absolute moves subsume earlier moves
    pub fold_cursor_moves: bool,
    /// Drop folded relative moves that sum to zero
    pub drop_net_zero_moves: bool,
    /// Drop immediate repeats of idempotent events
    pub collapse_repeats: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            redundant_state: true,
            coalesce_attributes: true,
            fold_cursor_moves: true,
            drop_net_zero_moves: true,
            collapse_repeats: true,
        }
    }
}

impl Rules {
    /// Every rule off: the output re-encodes the input event by event
    pub fn none() -> Self {
        Self {
            redundant_state: false,
            coalesce_attributes: false,
            fold_cursor_moves: false,
            drop_net_zero_moves: false,
            collapse_repeats: false,
        }
    }
}

/// Resource limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Sequences longer than this are passed through as fragments
    pub max_sequence_len: usize,
    /// Bytes read per chunk when streaming
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    8192
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
            chunk_size: default_chunk_size(),
        }
    }
}

/// Optimizer configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rules: Rules,
    #[serde(default)]
    pub limits: Limits,
}

/// Parse a boolean environment value
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration with full precedence:
    /// CLI args > environment variables > config file > defaults
    pub fn load_with_args(args: &CliArgs) -> Result<Self> {
        let mut config = Config::default();

        let config_path = args.config.clone().or_else(Self::default_config_path);
        if let Some(path) = &config_path {
            // An explicitly named file must exist; the default one is optional
            if args.config.is_some() || path.exists() {
                config = Self::load_from_file(path)?;
                tracing::debug!("Loaded config from {:?}", path);
            }
        }

        config.apply_env_vars();
        config.apply_cli_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `ANSI_OPTIMIZER_*` environment variables
    pub fn apply_env_vars(&mut self) {
        self.apply_env(|name| env::var(name).ok());
    }

    /// Apply environment overrides from an arbitrary lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let flags = [
            ("REDUNDANT_STATE", &mut self.rules.redundant_state),
            ("COALESCE_ATTRIBUTES", &mut self.rules.coalesce_attributes),
            ("FOLD_CURSOR_MOVES", &mut self.rules.fold_cursor_moves),
            ("DROP_NET_ZERO_MOVES", &mut self.rules.drop_net_zero_moves),
            ("COLLAPSE_REPEATS", &mut self.rules.collapse_repeats),
        ];
        for (name, flag) in flags {
            match var(name).as_deref().map(parse_bool) {
                Some(Some(value)) => *flag = value,
                Some(None) => tracing::warn!("Ignoring {}{}: expected a boolean", ENV_PREFIX, name),
                None => {}
            }
        }

        if let Some(val) = var("MAX_SEQUENCE_LEN") {
            match val.trim().parse() {
                Ok(len) => self.limits.max_sequence_len = len,
                Err(_) => tracing::warn!("Ignoring {}MAX_SEQUENCE_LEN: not a number", ENV_PREFIX),
            }
        }
        if let Some(val) = var("CHUNK_SIZE") {
            match val.trim().parse() {
                Ok(size) => self.limits.chunk_size = size,
                Err(_) => tracing::warn!("Ignoring {}CHUNK_SIZE: not a number", ENV_PREFIX),
            }
        }
    }

    /// Apply CLI arguments to config
    pub fn apply_cli_args(&mut self, args: &CliArgs) {
        if args.no_coalesce {
            self.rules.coalesce_attributes = false;
        }
        if args.no_fold {
            self.rules.fold_cursor_moves = false;
        }
        if args.keep_net_zero_moves {
            self.rules.drop_net_zero_moves = false;
        }
        if args.no_redundant_state {
            self.rules.redundant_state = false;
        }
        if args.no_collapse {
            self.rules.collapse_repeats = false;
        }
        if let Some(size) = args.chunk_size {
            self.limits.chunk_size = size;
        }
        if let Some(len) = args.max_sequence_len {
            self.limits.max_sequence_len = len;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_sequence_len < 16 {
            return Err(Error::Config {
                field: "limits.max_sequence_len".to_string(),
                message: "must be at least 16".to_string(),
            });
        }
        if self.limits.max_sequence_len > 16 * 1024 * 1024 {
            return Err(Error::Config {
                field: "limits.max_sequence_len".to_string(),
                message: "must be at most 16 MiB".to_string(),
            });
        }
        if self.limits.chunk_size == 0 {
            return Err(Error::Config {
                field: "limits.chunk_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.limits.chunk_size > 64 * 1024 * 1024 {
            return Err(Error::Config {
                field: "limits.chunk_size".to_string(),
                message: "must be at most 64 MiB".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ansi-optimizer").join("config.toml"))
    }
}
