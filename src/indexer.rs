//! Repository indexing: walks a source tree and builds the repository map
//! and symbol table consumed by the dependency graph and by external
//! analyzers.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::IndexError;
use crate::config::AnalysisConfig;
use crate::parser::{Chunk, Chunker, CodeParser, DefKind, Definition, Reference};

/// Everything the index records about one file. Entries are immutable once
/// the walk completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileIndex {
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
    pub language: Option<String>,
    pub chunks: Vec<Chunk>,
}

/// Relative file path → structural index, in path order.
pub type RepoMap = BTreeMap<String, FileIndex>;

/// Symbol name → defining files, first appearance preserved, duplicates
/// across files retained.
pub type SymbolTable = HashMap<String, Vec<String>>;

/// Per-file result of the parse phase, produced independently of any shared
/// state and merged after the walk.
struct FileRecord {
    rel_path: String,
    index: FileIndex,
}

/// Walks a repository and accumulates a [`RepoMap`] and [`SymbolTable`].
///
/// Per-file parsing is a pure computation over that file's bytes; failures
/// are logged and the file skipped, never aborting the run. Both maps are
/// rebuilt wholesale on each [`index`](Self::index) call.
pub struct RepositoryIndexer {
    parser: CodeParser,
    chunker: Chunker,
    config: AnalysisConfig,
    repo_map: RepoMap,
    symbol_table: SymbolTable,
}

impl RepositoryIndexer {
    pub fn new(config: AnalysisConfig) -> Result<Self, IndexError> {
        Ok(Self {
            parser: CodeParser::new()?,
            chunker: Chunker::new(config.max_chunk_lines, config.chunk_strategy),
            config,
            repo_map: RepoMap::new(),
            symbol_table: SymbolTable::new(),
        })
    }

    /// Index every matching file under `root`.
    ///
    /// Fatal errors are limited to pre-flight conditions (missing root,
    /// invalid exclude glob); anything that goes wrong for a single file is
    /// logged and that file is skipped.
    pub fn index(&mut self, root: &Path) -> Result<&RepoMap, IndexError> {
        if !root.is_dir() {
            return Err(IndexError::RootNotFound(root.to_path_buf()));
        }
        let excludes = build_globset(&self.config.exclude)?;
        let files = self.collect_files(root, &excludes);
        info!("indexing {} files under {}", files.len(), root.display());

        let mut records = Vec::with_capacity(files.len());
        for (path, rel_path) in files {
            match self.process_file(&path, &rel_path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!("skipping {rel_path}: {e}"),
            }
        }

        // Single merge point: nothing reads these maps while the walk runs.
        self.repo_map.clear();
        self.symbol_table.clear();
        for record in records {
            for def in &record.index.definitions {
                if !def.name.is_empty() {
                    self.symbol_table
                        .entry(def.name.clone())
                        .or_default()
                        .push(record.rel_path.clone());
                }
            }
            self.repo_map.insert(record.rel_path, record.index);
        }

        info!(
            "indexed {} files, {} distinct symbols",
            self.repo_map.len(),
            self.symbol_table.len()
        );
        Ok(&self.repo_map)
    }

    fn collect_files(&self, root: &Path, excludes: &GlobSet) -> Vec<(PathBuf, String)> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(root).hidden(false).build();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_default();
            if !self.config.extensions.contains(&ext) {
                continue;
            }

            // Store forward-slashed relative paths for cross-platform keys.
            let rel_path = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            if excludes.is_match(&rel_path) {
                debug!("excluded by pattern: {rel_path}");
                continue;
            }

            files.push((path.to_path_buf(), rel_path));
        }

        files.sort_by(|a, b| a.1.cmp(&b.1));
        files
    }

    /// Parse and chunk one file. Returns `Ok(None)` for deliberate skips
    /// (oversized, empty); IO errors propagate to the caller's warn-and-skip.
    fn process_file(&self, path: &Path, rel_path: &str) -> Result<Option<FileRecord>, IndexError> {
        let size = std::fs::metadata(path)?.len();
        if size > self.config.max_file_size {
            debug!("skipping large file: {rel_path} ({size} bytes)");
            return Ok(None);
        }

        let bytes = std::fs::read(path)?;
        let source = String::from_utf8_lossy(&bytes);
        if source.trim().is_empty() {
            debug!("skipping empty file: {rel_path}");
            return Ok(None);
        }

        let parsed = self.parser.parse_file(path, &source);
        let chunks = self.chunker.chunk(parsed.language.as_deref(), &source);

        Ok(Some(FileRecord {
            rel_path: rel_path.to_string(),
            index: FileIndex {
                definitions: parsed.definitions,
                references: parsed.references,
                language: parsed.language,
                chunks,
            },
        }))
    }

    pub fn repo_map(&self) -> &RepoMap {
        &self.repo_map
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    /// Files defining `symbol`, in first-appearance order. Empty for
    /// unknown symbols.
    pub fn files_defining(&self, symbol: &str) -> &[String] {
        self.symbol_table
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Bounded textual summary: top files by definition count, each with a
    /// capped listing of classes (and their methods) and functions.
    /// A derived, side-effect-free view over the frozen map.
    pub fn summary(&self, max_files: usize, max_methods: usize, max_functions: usize) -> String {
        let mut ranked: Vec<(&String, &FileIndex)> = self.repo_map.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.definitions
                .len()
                .cmp(&a.1.definitions.len())
                .then_with(|| a.0.cmp(b.0))
        });

        let mut lines = Vec::new();
        for (path, index) in ranked.into_iter().take(max_files) {
            let classes: Vec<&Definition> = index
                .definitions
                .iter()
                .filter(|d| d.kind == DefKind::Class)
                .collect();
            let functions: Vec<&Definition> = index
                .definitions
                .iter()
                .filter(|d| matches!(d.kind, DefKind::Function | DefKind::Method))
                .collect();

            lines.push(format!("\n## {path}"));
            if !classes.is_empty() {
                lines.push("Classes:".to_string());
                for class in classes {
                    let methods = class
                        .methods
                        .iter()
                        .take(max_methods)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ");
                    if methods.is_empty() {
                        lines.push(format!("  - {}", class.name));
                    } else {
                        lines.push(format!("  - {} (methods: {methods})", class.name));
                    }
                }
            }
            if !functions.is_empty() {
                lines.push("Functions/Methods:".to_string());
                for func in functions.into_iter().take(max_functions) {
                    lines.push(format!("  - {}", func.name));
                }
            }
        }

        lines.join("\n")
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, IndexError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn indexer() -> RepositoryIndexer {
        RepositoryIndexer::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_index_two_files_and_symbol_table() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def foo():\n    return 1\n").unwrap();
        fs::write(dir.path().join("b.py"), "foo()\n").unwrap();

        let mut idx = indexer();
        let repo_map = idx.index(dir.path()).unwrap();

        assert_eq!(repo_map.len(), 2);
        assert!(repo_map.contains_key("a.py"));
        assert!(repo_map.contains_key("b.py"));
        assert_eq!(idx.files_defining("foo"), &["a.py".to_string()]);
        assert!(idx.files_defining("missing").is_empty());

        let b = &idx.repo_map()["b.py"];
        assert!(b.references.iter().any(|r| r.name == "foo"));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let mut idx = indexer();
        let err = idx.index(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, IndexError::RootNotFound(_)));
    }

    #[test]
    fn test_oversized_and_empty_files_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("big.py"), "x = 1\n".repeat(100)).unwrap();
        fs::write(dir.path().join("empty.py"), "   \n\n").unwrap();
        fs::write(dir.path().join("ok.py"), "def f():\n    pass\n").unwrap();

        let mut config = AnalysisConfig::default();
        config.max_file_size = 200;
        let mut idx = RepositoryIndexer::new(config).unwrap();
        let repo_map = idx.index(dir.path()).unwrap();

        assert_eq!(repo_map.len(), 1);
        assert!(repo_map.contains_key("ok.py"));
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = tempdir().unwrap();
        let vendored = dir.path().join("node_modules").join("lib");
        fs::create_dir_all(&vendored).unwrap();
        fs::write(vendored.join("dep.js"), "function dep() {}\n").unwrap();
        fs::write(dir.path().join("app.js"), "function app() {}\n").unwrap();

        let mut idx = indexer();
        let repo_map = idx.index(dir.path()).unwrap();
        assert_eq!(repo_map.len(), 1);
        assert!(repo_map.contains_key("app.js"));
    }

    #[test]
    fn test_unsupported_extension_gets_window_chunks() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("schema.sql"), "SELECT 1;\nSELECT 2;\n").unwrap();

        let mut config = AnalysisConfig::default();
        config.extensions.push(".sql".to_string());
        let mut idx = RepositoryIndexer::new(config).unwrap();
        let repo_map = idx.index(dir.path()).unwrap();

        let entry = &repo_map["schema.sql"];
        assert!(entry.language.is_none());
        assert!(entry.definitions.is_empty());
        assert!(entry.references.is_empty());
        assert_eq!(entry.chunks.len(), 1);
        assert_eq!(entry.chunks[0].kind, "window");
        assert_eq!(entry.chunks[0].end_line, 2);
    }

    #[test]
    fn test_broken_file_does_not_poison_the_run() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.py"), "def broken(:\n  ???\n").unwrap();
        fs::write(dir.path().join("fine.py"), "def fine():\n    pass\n").unwrap();

        let mut idx = indexer();
        let repo_map = idx.index(dir.path()).unwrap();

        // The broken file still gets an entry; the healthy one is unaffected.
        assert!(repo_map.contains_key("broken.py"));
        assert!(repo_map.contains_key("fine.py"));
        assert!(repo_map["fine.py"].definitions.iter().any(|d| d.name == "fine"));
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let dir = tempdir().unwrap();
        let mut bytes = b"def salvaged():\n    pass\n# ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        fs::write(dir.path().join("mixed.py"), bytes).unwrap();

        let mut idx = indexer();
        let repo_map = idx.index(dir.path()).unwrap();
        assert!(repo_map["mixed.py"]
            .definitions
            .iter()
            .any(|d| d.name == "salvaged"));
    }

    #[test]
    fn test_summary_is_ranked_and_bounded() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("rich.py"),
            "class Api:\n    def get(self):\n        pass\n    def put(self):\n        pass\n\ndef helper():\n    pass\n",
        )
        .unwrap();
        fs::write(dir.path().join("thin.py"), "def only():\n    pass\n").unwrap();

        let mut idx = indexer();
        idx.index(dir.path()).unwrap();

        let summary = idx.summary(10, 1, 10);
        let rich_pos = summary.find("## rich.py").unwrap();
        let thin_pos = summary.find("## thin.py").unwrap();
        assert!(rich_pos < thin_pos, "files ranked by definition count");
        assert!(summary.contains("Api (methods: get)"), "methods capped at 1");
        assert!(summary.contains("  - helper"));

        let top_only = idx.summary(1, 5, 5);
        assert!(top_only.contains("rich.py"));
        assert!(!top_only.contains("thin.py"));
    }

    #[test]
    fn test_reindex_rebuilds_wholesale() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "def first():\n    pass\n").unwrap();

        let mut idx = indexer();
        idx.index(dir.path()).unwrap();
        assert_eq!(idx.files_defining("first"), &["a.py".to_string()]);

        fs::write(&file, "def second():\n    pass\n").unwrap();
        idx.index(dir.path()).unwrap();
        assert!(idx.files_defining("first").is_empty());
        assert_eq!(idx.files_defining("second"), &["a.py".to_string()]);
    }
}
