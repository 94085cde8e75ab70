use serde::Serialize;
use tree_sitter::{Node, Parser};

use super::extract::declaration_name;
use super::languages::LanguageConfig;
use crate::config::ChunkStrategy;

/// A contiguous, line-bounded slice of one file, treated as a single
/// logical unit downstream. For one file, chunks are ordered by
/// `start_line` and never overlap; on the size-window path they
/// additionally partition the file exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub kind: String,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Splits source into bounded logical chunks.
///
/// Priority order: top-level declarations; sub-declarations of oversized
/// declarations; fixed-size line windows when no declarations exist at all
/// (or when configured size-based). Output is byte-identical for identical
/// input, so chunk identity can serve as a cache key downstream.
pub struct Chunker {
    max_chunk_lines: usize,
    strategy: ChunkStrategy,
}

impl Chunker {
    pub fn new(max_chunk_lines: usize, strategy: ChunkStrategy) -> Self {
        Self {
            max_chunk_lines: max_chunk_lines.max(1),
            strategy,
        }
    }

    pub fn chunk(&self, language: Option<&str>, source: &str) -> Vec<Chunk> {
        if self.strategy == ChunkStrategy::Size {
            return self.size_windows(source);
        }
        let Some(config) = language.and_then(LanguageConfig::get_by_name) else {
            return self.size_windows(source);
        };
        match self.declaration_chunks(&config, source) {
            Some(chunks) if !chunks.is_empty() => chunks,
            // Parse failure or a file with no top-level declarations.
            _ => self.size_windows(source),
        }
    }

    fn declaration_chunks(&self, config: &LanguageConfig, source: &str) -> Option<Vec<Chunk>> {
        let mut parser = Parser::new();
        parser.set_language(&config.language).ok()?;
        let tree = parser.parse(source, None)?;
        let bytes = source.as_bytes();

        let root = tree.root_node();
        let mut chunks = Vec::new();

        for child in root.named_children(&mut root.walk()) {
            for (decl, span) in declaration_roots(child, config) {
                if line_span(span) > self.max_chunk_lines {
                    let subs = sub_declarations(decl, config);
                    if subs.is_empty() {
                        // No sub-chunk-eligible nodes inside: keep the oversized
                        // declaration whole rather than fail.
                        chunks.push(make_chunk(span, decl, bytes, config));
                    } else {
                        for sub in subs {
                            chunks.push(make_chunk(sub, sub, bytes, config));
                        }
                    }
                } else {
                    chunks.push(make_chunk(span, decl, bytes, config));
                }
            }
        }

        chunks.sort_by_key(|c| c.start_line);
        Some(chunks)
    }

    fn size_windows(&self, source: &str) -> Vec<Chunk> {
        let lines: Vec<&str> = source.lines().collect();
        let mut chunks = Vec::new();
        for (i, window) in lines.chunks(self.max_chunk_lines).enumerate() {
            let start_line = i * self.max_chunk_lines + 1;
            let end_line = start_line + window.len() - 1;
            chunks.push(Chunk {
                text: window.join("\n"),
                kind: "window".to_string(),
                name: format!("lines_{start_line}_{end_line}"),
                start_line,
                end_line,
            });
        }
        chunks
    }
}

/// Find declaration chunk roots `(declaration, span)` within one top-level
/// statement. A statement that is itself a declaration is its own root.
/// Anything else is searched with a worklist that stops descending at each
/// declaration found, so declarations nested in wrappers or control flow
/// (Python `decorated_definition`, JS/TS `export_statement`, a `def` under a
/// top-level `if`) still become chunks. A lone nested declaration keeps the
/// enclosing statement as its span, covering decorator and export lines;
/// siblings each span themselves so chunks cannot overlap.
fn declaration_roots<'t>(node: Node<'t>, config: &LanguageConfig) -> Vec<(Node<'t>, Node<'t>)> {
    if config.is_declaration(node.kind()) {
        return vec![(node, node)];
    }

    let mut found = Vec::new();
    let mut queue = std::collections::VecDeque::from([node]);
    while let Some(current) = queue.pop_front() {
        for child in current.named_children(&mut current.walk()) {
            if config.is_declaration(child.kind()) {
                found.push(child);
            } else {
                queue.push_back(child);
            }
        }
    }

    match found.len() {
        0 => Vec::new(),
        1 => vec![(found[0], node)],
        _ => found.into_iter().map(|decl| (decl, decl)).collect(),
    }
}

/// Breadth-first search for sub-chunk-eligible declarations inside an
/// oversized node. Descent stops as soon as a node matches, so nested
/// declarations are never counted twice and results never overlap.
fn sub_declarations<'t>(node: Node<'t>, config: &LanguageConfig) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut queue: std::collections::VecDeque<Node> =
        node.named_children(&mut node.walk()).collect();

    while let Some(current) = queue.pop_front() {
        if config.subchunk_kinds.contains(&current.kind()) {
            found.push(current);
            continue;
        }
        queue.extend(current.named_children(&mut current.walk()));
    }

    found
}

fn line_span(node: Node) -> usize {
    node.end_position().row - node.start_position().row + 1
}

fn make_chunk(span: Node, decl: Node, source: &[u8], config: &LanguageConfig) -> Chunk {
    let kind = kind_label(decl.kind(), config);
    let start_line = span.start_position().row + 1;
    Chunk {
        text: span.utf8_text(source).unwrap_or("").to_string(),
        kind: kind.to_string(),
        name: declaration_name(decl, source, config)
            .unwrap_or_else(|| format!("{kind}_{start_line}")),
        start_line,
        end_line: span.end_position().row + 1,
    }
}

fn kind_label(node_kind: &str, config: &LanguageConfig) -> &'static str {
    if config.class_kinds.contains(&node_kind) {
        "class"
    } else if config.method_kinds.contains(&node_kind) {
        "method"
    } else {
        "function"
    }
}
