/// Configuration module for Repolens.
///
/// Handles loading, validating, and providing default analysis settings.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_extensions() -> Vec<String> {
    [".py", ".js", ".jsx", ".ts", ".tsx", ".rs", ".go"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_exclude() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/__pycache__/**",
        "**/.git/**",
        "**/target/**",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_max_file_size() -> u64 {
    1_000_000
}

fn default_max_chunk_lines() -> usize {
    100
}

fn default_min_dependents() -> usize {
    2
}

fn default_max_dependencies() -> usize {
    5
}

fn default_entry_keywords() -> Vec<String> {
    ["controller", "main", "app", "entry", "handler", "router"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisConfig {
    /// File extensions (with leading dot) considered during a walk.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns excluding paths from the walk.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Files larger than this (bytes) are skipped.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Line cap for a single chunk.
    #[serde(default = "default_max_chunk_lines")]
    pub max_chunk_lines: usize,

    #[serde(default)]
    pub chunk_strategy: ChunkStrategy,

    #[serde(default)]
    pub entry_points: EntryPointConfig,
}

/// How files are split into chunks.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Chunk along top-level declarations, falling back to size windows.
    #[default]
    Declaration,
    /// Fixed-size line windows only.
    Size,
}

/// Entry-point heuristic knobs.
///
/// The thresholds and keyword list are unvalidated heuristics. They are
/// configuration, not constants, and no precision claim is attached to them.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EntryPointConfig {
    /// A file qualifies structurally when its dependent count exceeds this.
    #[serde(default = "default_min_dependents")]
    pub min_dependents: usize,

    /// ...and its dependency count stays below this.
    #[serde(default = "default_max_dependencies")]
    pub max_dependencies: usize,

    /// Path substrings (case-insensitive) that qualify a file by name alone.
    #[serde(default = "default_entry_keywords")]
    pub keywords: Vec<String>,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: default_exclude(),
            max_file_size: default_max_file_size(),
            max_chunk_lines: default_max_chunk_lines(),
            chunk_strategy: ChunkStrategy::default(),
            entry_points: EntryPointConfig::default(),
        }
    }
}

impl Default for EntryPointConfig {
    fn default() -> Self {
        Self {
            min_dependents: default_min_dependents(),
            max_dependencies: default_max_dependencies(),
            keywords: default_entry_keywords(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl AnalysisConfig {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"repolens.json"`. A missing or
    /// invalid file yields the default configuration rather than an error.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "repolens.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: AnalysisConfig = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_chunk_lines > 0, "max_chunk_lines must be positive");
        anyhow::ensure!(self.max_file_size > 0, "max_file_size must be positive");
        anyhow::ensure!(
            !self.extensions.is_empty(),
            "at least one extension must be specified"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
