//! Symbol extraction and chunking over per-language syntax trees.

pub mod chunker;
pub mod extract;
pub mod languages;

pub use chunker::{Chunk, Chunker};
pub use extract::{CodeParser, DefKind, Definition, ParseResult, ParseTier, RefKind, Reference};
pub use languages::LanguageConfig;
