//! # Repolens: structural code indexer
//!
//! Parses a heterogeneous multi-language source tree into a structural index
//! that downstream, context-limited analyzers can consume piece by piece.
//!
//! ## Architecture
//!
//! - **[`config`]**: configuration loading, validation, and defaults
//! - **[`parser`]**: tree-sitter symbol extraction, tiered fallbacks, chunking
//! - **[`indexer`]**: repository walk, `RepoMap` and `SymbolTable` construction
//! - **[`graph`]**: file-level dependency graph and traversal queries
//!
//! ## Pipeline
//!
//! filesystem → [`RepositoryIndexer`] → per file: [`CodeParser`] + [`parser::Chunker`]
//! → [`RepoMap`] + [`SymbolTable`] → [`DependencyGraphBuilder`] → [`DependencyGraph`]

pub mod config;
pub mod graph;
pub mod indexer;
pub mod parser;

pub use config::{AnalysisConfig, ChunkStrategy, EntryPointConfig};
pub use graph::{DependencyGraph, DependencyGraphBuilder};
pub use indexer::{FileIndex, RepoMap, RepositoryIndexer, SymbolTable};
pub use parser::{Chunk, CodeParser, DefKind, Definition, ParseTier, RefKind, Reference};

/// Errors surfaced to the caller.
///
/// Only pre-flight conditions are fatal: a missing root directory, an invalid
/// exclude glob, or a fallback pattern that fails to compile. Everything that
/// happens per file during a walk is logged and recovered internally.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("root directory not found: {0}")]
    RootNotFound(std::path::PathBuf),

    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("invalid fallback pattern: {0}")]
    FallbackPattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
