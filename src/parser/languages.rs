use tree_sitter::Language;

use super::extract::DefKind;

/// Declarative description of one supported language.
///
/// Extraction and chunking are driven entirely by these tables; adding a
/// language means adding a row here, not a new traversal code path.
pub struct LanguageConfig {
    pub name: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
    /// Class-like declaration kinds. Method names nested inside their bodies
    /// are collected into the class definition, not emitted independently.
    pub class_kinds: &'static [&'static str],
    /// Free-function declaration kinds.
    pub function_kinds: &'static [&'static str],
    /// Method declaration kinds that occur outside a class body (e.g. Go).
    pub method_kinds: &'static [&'static str],
    /// Call-expression kinds.
    pub call_kinds: &'static [&'static str],
    /// Type-mention kinds recorded as references.
    pub type_use_kinds: &'static [&'static str],
    /// Fields that may hold a declaration's identifier, tried in order.
    pub name_fields: &'static [&'static str],
    /// Field holding a call's callee expression.
    pub callee_field: &'static str,
    /// Field holding a declaration's body.
    pub body_field: &'static str,
    /// Kinds eligible as sub-chunks when a declaration exceeds the line cap.
    pub subchunk_kinds: &'static [&'static str],
    /// Textual declaration patterns for the regex fallback tier.
    /// Each pattern captures the declared name in group 1.
    pub fallback_patterns: &'static [(DefKind, &'static str)],
}

impl LanguageConfig {
    pub fn get_all() -> Vec<LanguageConfig> {
        vec![
            python_config(),
            javascript_config(),
            typescript_config(),
            rust_config(),
            go_config(),
        ]
    }

    pub fn get_by_extension(ext: &str) -> Option<LanguageConfig> {
        Self::get_all()
            .into_iter()
            .find(|c| c.extensions.contains(&ext))
    }

    pub fn get_by_name(name: &str) -> Option<LanguageConfig> {
        Self::get_all().into_iter().find(|c| c.name == name)
    }

    /// Whether `kind` names any declaration this language chunks on.
    pub fn is_declaration(&self, kind: &str) -> bool {
        self.class_kinds.contains(&kind)
            || self.function_kinds.contains(&kind)
            || self.method_kinds.contains(&kind)
    }
}

fn python_config() -> LanguageConfig {
    LanguageConfig {
        name: "python",
        language: tree_sitter_python::LANGUAGE.into(),
        extensions: &["py"],
        class_kinds: &["class_definition"],
        function_kinds: &["function_definition"],
        method_kinds: &[],
        call_kinds: &["call"],
        type_use_kinds: &[],
        name_fields: &["name"],
        callee_field: "function",
        body_field: "body",
        subchunk_kinds: &["function_definition"],
        fallback_patterns: &[
            (DefKind::Class, r"(?m)^\s*class\s+([A-Za-z_]\w*)"),
            (
                DefKind::Function,
                r"(?m)^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(",
            ),
        ],
    }
}

fn javascript_config() -> LanguageConfig {
    LanguageConfig {
        name: "javascript",
        language: tree_sitter_javascript::LANGUAGE.into(),
        extensions: &["js", "jsx"],
        class_kinds: &["class_declaration"],
        function_kinds: &["function_declaration", "generator_function_declaration"],
        method_kinds: &["method_definition"],
        call_kinds: &["call_expression"],
        type_use_kinds: &[],
        name_fields: &["name"],
        callee_field: "function",
        body_field: "body",
        subchunk_kinds: &["method_definition", "function_declaration"],
        fallback_patterns: &[
            (
                DefKind::Class,
                r"(?m)^\s*(?:export\s+)?(?:default\s+)?class\s+([A-Za-z_$][\w$]*)",
            ),
            (
                DefKind::Function,
                r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)",
            ),
        ],
    }
}

fn typescript_config() -> LanguageConfig {
    LanguageConfig {
        name: "typescript",
        language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        extensions: &["ts", "tsx"],
        class_kinds: &[
            "class_declaration",
            "abstract_class_declaration",
            "interface_declaration",
        ],
        function_kinds: &["function_declaration", "generator_function_declaration"],
        method_kinds: &["method_definition"],
        call_kinds: &["call_expression"],
        type_use_kinds: &["type_identifier"],
        name_fields: &["name"],
        callee_field: "function",
        body_field: "body",
        subchunk_kinds: &["method_definition", "function_declaration"],
        fallback_patterns: &[
            (
                DefKind::Class,
                r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)",
            ),
            (
                DefKind::Class,
                r"(?m)^\s*(?:export\s+)?interface\s+([A-Za-z_$][\w$]*)",
            ),
            (
                DefKind::Function,
                r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)",
            ),
        ],
    }
}

fn rust_config() -> LanguageConfig {
    LanguageConfig {
        name: "rust",
        language: tree_sitter_rust::LANGUAGE.into(),
        extensions: &["rs"],
        // impl blocks count as class-like: their functions become the
        // methods of the named type, mirroring how inherent methods read.
        class_kinds: &["struct_item", "enum_item", "trait_item", "impl_item"],
        function_kinds: &["function_item"],
        method_kinds: &[],
        call_kinds: &["call_expression"],
        type_use_kinds: &["type_identifier"],
        name_fields: &["name", "type"],
        callee_field: "function",
        body_field: "body",
        subchunk_kinds: &["function_item"],
        fallback_patterns: &[
            (
                DefKind::Class,
                r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait)\s+([A-Za-z_]\w*)",
            ),
            (
                DefKind::Function,
                r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+([A-Za-z_]\w*)",
            ),
        ],
    }
}

fn go_config() -> LanguageConfig {
    LanguageConfig {
        name: "go",
        language: tree_sitter_go::LANGUAGE.into(),
        extensions: &["go"],
        class_kinds: &["type_declaration"],
        function_kinds: &["function_declaration"],
        method_kinds: &["method_declaration"],
        call_kinds: &["call_expression"],
        type_use_kinds: &["type_identifier"],
        name_fields: &["name"],
        callee_field: "function",
        body_field: "body",
        subchunk_kinds: &["function_declaration", "method_declaration"],
        fallback_patterns: &[
            (
                DefKind::Class,
                r"(?m)^type\s+([A-Za-z_]\w*)\s+(?:struct|interface)\b",
            ),
            (
                DefKind::Function,
                r"(?m)^func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)\s*\(",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_extension() {
        assert_eq!(LanguageConfig::get_by_extension("py").unwrap().name, "python");
        assert_eq!(LanguageConfig::get_by_extension("tsx").unwrap().name, "typescript");
        assert_eq!(LanguageConfig::get_by_extension("rs").unwrap().name, "rust");
        assert!(LanguageConfig::get_by_extension("yaml").is_none());
    }

    #[test]
    fn test_get_by_name() {
        assert!(LanguageConfig::get_by_name("go").is_some());
        assert!(LanguageConfig::get_by_name("cobol").is_none());
    }

    #[test]
    fn test_every_language_has_fallback_patterns() {
        for config in LanguageConfig::get_all() {
            assert!(
                !config.fallback_patterns.is_empty(),
                "{} is missing regex fallback patterns",
                config.name
            );
            assert!(!config.subchunk_kinds.is_empty(), "{}", config.name);
        }
    }

    #[test]
    fn test_is_declaration() {
        let py = LanguageConfig::get_by_name("python").unwrap();
        assert!(py.is_declaration("class_definition"));
        assert!(py.is_declaration("function_definition"));
        assert!(!py.is_declaration("call"));
    }
}
