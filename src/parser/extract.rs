use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;
use tree_sitter::{Node, Parser};

use super::languages::LanguageConfig;
use crate::IndexError;

/// Call names suppressed as reference noise.
const BUILTIN_CALLS: &[&str] = &[
    "len", "make", "append", "delete", "print", "println", "panic", "recover", "range", "return",
    "break", "continue",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefKind {
    Class,
    Function,
    Method,
}

impl DefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefKind::Class => "class",
            DefKind::Function => "function",
            DefKind::Method => "method",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Call,
    TypeUse,
}

/// A named declaration site. Names need not be unique within a file
/// or across the repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub kind: DefKind,
    pub name: String,
    pub line: usize,
    /// Method names collected from a class-like body. Empty for
    /// functions and methods.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

/// A named use site. Carries no resolved target; resolution happens at
/// graph-build time by name lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub kind: RefKind,
    pub name: String,
    pub line: usize,
}

/// Which fallback tier produced a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseTier {
    /// Full tree-sitter grammar walk.
    Grammar,
    /// Textual declaration patterns; yields definitions with no references.
    Regex,
    /// No language resolved for the file.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
    pub language: Option<String>,
    pub tier: ParseTier,
}

impl ParseResult {
    fn unsupported() -> Self {
        Self {
            definitions: Vec::new(),
            references: Vec::new(),
            language: None,
            tier: ParseTier::Unsupported,
        }
    }
}

/// Ordered extraction strategies, tried in sequence until one succeeds.
#[derive(Debug, Clone, Copy)]
enum Strategy {
    Grammar,
    Regex,
}

const STRATEGIES: [Strategy; 2] = [Strategy::Grammar, Strategy::Regex];

/// Extracts definitions and references from source files.
///
/// Extraction never fails across file boundaries: a file whose grammar is
/// unavailable or whose tree cannot be built degrades to the regex tier,
/// and a file with no resolvable language yields an empty result.
pub struct CodeParser {
    fallbacks: HashMap<&'static str, Vec<(DefKind, Regex)>>,
}

impl CodeParser {
    pub fn new() -> Result<Self, IndexError> {
        let mut fallbacks = HashMap::new();
        for config in LanguageConfig::get_all() {
            let mut patterns = Vec::new();
            for (kind, pattern) in config.fallback_patterns {
                patterns.push((*kind, Regex::new(pattern)?));
            }
            fallbacks.insert(config.name, patterns);
        }
        Ok(Self { fallbacks })
    }

    /// Parse a file, resolving its language from the extension.
    pub fn parse_file(&self, path: &std::path::Path, source: &str) -> ParseResult {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match LanguageConfig::get_by_extension(ext) {
            Some(config) => self.parse_with(&config, source),
            None => ParseResult::unsupported(),
        }
    }

    /// Parse source in a named language.
    pub fn parse_source(&self, lang_name: &str, source: &str) -> ParseResult {
        match LanguageConfig::get_by_name(lang_name) {
            Some(config) => self.parse_with(&config, source),
            None => ParseResult::unsupported(),
        }
    }

    fn parse_with(&self, config: &LanguageConfig, source: &str) -> ParseResult {
        for strategy in STRATEGIES {
            if let Some(result) = self.try_strategy(strategy, config, source) {
                return result;
            }
        }
        ParseResult::unsupported()
    }

    fn try_strategy(
        &self,
        strategy: Strategy,
        config: &LanguageConfig,
        source: &str,
    ) -> Option<ParseResult> {
        match strategy {
            Strategy::Grammar => {
                let (definitions, references) = grammar_extract(config, source)?;
                Some(ParseResult {
                    definitions,
                    references,
                    language: Some(config.name.to_string()),
                    tier: ParseTier::Grammar,
                })
            }
            Strategy::Regex => Some(ParseResult {
                definitions: self.regex_extract(config, source),
                references: Vec::new(),
                language: Some(config.name.to_string()),
                tier: ParseTier::Regex,
            }),
        }
    }

    fn regex_extract(&self, config: &LanguageConfig, source: &str) -> Vec<Definition> {
        let mut definitions = Vec::new();
        let Some(patterns) = self.fallbacks.get(config.name) else {
            return definitions;
        };
        for (kind, regex) in patterns {
            for captures in regex.captures_iter(source) {
                let Some(name) = captures.get(1) else { continue };
                let line = source[..name.start()].matches('\n').count() + 1;
                definitions.push(Definition {
                    kind: *kind,
                    name: name.as_str().to_string(),
                    line,
                    methods: Vec::new(),
                });
            }
        }
        definitions.sort_by_key(|d| d.line);
        definitions
    }
}

/// Grammar-tier extraction: a single pre-order pass over the tree using an
/// explicit worklist, so deeply nested real-world code cannot overflow the
/// stack. Returns `None` when the grammar cannot be loaded or the tree
/// cannot be built, handing control to the next tier.
fn grammar_extract(
    config: &LanguageConfig,
    source: &str,
) -> Option<(Vec<Definition>, Vec<Reference>)> {
    let mut parser = Parser::new();
    parser.set_language(&config.language).ok()?;
    let tree = parser.parse(source, None)?;

    let bytes = source.as_bytes();
    let mut definitions = Vec::new();
    let mut references = Vec::new();

    // (node, inside a class body); children are pushed in reverse so the
    // pop order matches source order.
    let mut stack: Vec<(Node, bool)> = vec![(tree.root_node(), false)];

    while let Some((node, in_class)) = stack.pop() {
        let kind = node.kind();
        let line = node.start_position().row + 1;
        let mut child_in_class = in_class;

        if config.class_kinds.contains(&kind) {
            if let Some(name) = declaration_name(node, bytes, config) {
                definitions.push(Definition {
                    kind: DefKind::Class,
                    name,
                    line,
                    methods: collect_methods(node, bytes, config),
                });
            }
            child_in_class = true;
        } else if config.function_kinds.contains(&kind) {
            if !in_class {
                if let Some(name) = declaration_name(node, bytes, config) {
                    definitions.push(Definition {
                        kind: DefKind::Function,
                        name,
                        line,
                        methods: Vec::new(),
                    });
                }
            }
            // The class boundary is consumed; deeper nested declarations
            // are free functions again.
            child_in_class = false;
        } else if config.method_kinds.contains(&kind) {
            if !in_class {
                if let Some(name) = declaration_name(node, bytes, config) {
                    definitions.push(Definition {
                        kind: DefKind::Method,
                        name,
                        line,
                        methods: Vec::new(),
                    });
                }
            }
            child_in_class = false;
        } else if config.call_kinds.contains(&kind) {
            if let Some(callee) = node.child_by_field_name(config.callee_field) {
                if let Ok(text) = callee.utf8_text(bytes) {
                    let name = trailing_segment(text);
                    if !name.is_empty() && !BUILTIN_CALLS.contains(&name.as_str()) {
                        references.push(Reference {
                            kind: RefKind::Call,
                            name,
                            line,
                        });
                    }
                }
            }
        } else if config.type_use_kinds.contains(&kind) && !is_declared_name(node, config) {
            if let Ok(text) = node.utf8_text(bytes) {
                if text.chars().next().is_some_and(char::is_uppercase) {
                    references.push(Reference {
                        kind: RefKind::TypeUse,
                        name: text.to_string(),
                        line,
                    });
                }
            }
        }

        let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
        for child in children.into_iter().rev() {
            stack.push((child, child_in_class));
        }
    }

    Some((definitions, references))
}

/// Read a declaration's identifier, trying the configured name fields on the
/// node itself and then one level down (Go wraps `type_spec` inside
/// `type_declaration`).
pub(crate) fn declaration_name(
    node: Node,
    source: &[u8],
    config: &LanguageConfig,
) -> Option<String> {
    for field in config.name_fields {
        if let Some(child) = node.child_by_field_name(field) {
            if let Ok(text) = child.utf8_text(source) {
                return Some(text.trim().to_string());
            }
        }
    }
    for child in node.named_children(&mut node.walk()) {
        for field in config.name_fields {
            if let Some(name_node) = child.child_by_field_name(field) {
                if let Ok(text) = name_node.utf8_text(source) {
                    return Some(text.trim().to_string());
                }
            }
        }
    }
    None
}

/// Whether `node` is the identifier being declared rather than a use site.
/// In Rust, Go, and TypeScript a type declaration's own name is a
/// `type_identifier` too; recording it would make every type reference
/// itself at its definition line. The name may hang off the declaration
/// directly or off an intermediate wrapper (Go's `type_spec` inside
/// `type_declaration`).
fn is_declared_name(node: Node, config: &LanguageConfig) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let in_declaration = config.is_declaration(parent.kind())
        || parent
            .parent()
            .is_some_and(|gp| config.is_declaration(gp.kind()));
    in_declaration
        && config.name_fields.iter().any(|field| {
            parent
                .child_by_field_name(field)
                .is_some_and(|n| n.id() == node.id())
        })
}

/// Collect method names nested in a class-like body, breadth-first.
/// Descent stops at each matched declaration and at nested classes, which
/// are visited on their own turn of the outer traversal.
fn collect_methods(class_node: Node, source: &[u8], config: &LanguageConfig) -> Vec<String> {
    let mut methods = Vec::new();

    let start = class_node
        .child_by_field_name(config.body_field)
        .unwrap_or(class_node);
    let mut queue: std::collections::VecDeque<Node> =
        start.named_children(&mut start.walk()).collect();

    while let Some(node) = queue.pop_front() {
        let kind = node.kind();
        if config.class_kinds.contains(&kind) {
            continue;
        }
        if config.function_kinds.contains(&kind) || config.method_kinds.contains(&kind) {
            if let Some(name) = declaration_name(node, source, config) {
                methods.push(name);
            }
            continue;
        }
        queue.extend(node.named_children(&mut node.walk()));
    }

    methods
}

/// Keep only the last dotted segment of a callee expression
/// (`a.b.foo` → `foo`, `mod::foo` → `foo`), trading precision for
/// resolvability against single-segment symbol names.
fn trailing_segment(callee: &str) -> String {
    let segment = callee.trim();
    let segment = segment.rsplit("::").next().unwrap_or(segment);
    let segment = segment.rsplit('.').next().unwrap_or(segment);
    // Chained or parenthesized callees leave non-identifier characters
    // behind; keep only the trailing identifier run.
    let tail: Vec<char> = segment
        .chars()
        .rev()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    tail.into_iter().rev().collect()
}
