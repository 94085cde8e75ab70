//! End-to-end pipeline tests: walk a small polyglot repository, build the
//! index, and query the dependency graph over it.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use repolens::{
    AnalysisConfig, DependencyGraphBuilder, RepositoryIndexer,
};

/// A three-language repository with one cross-file and one cross-language
/// dependency:
///   app/main.py    calls Database (services/db.py) and run_server (web/server.js)
///   services/db.py defines class Database
///   web/server.js  defines run_server
///   lib/util.rs    defines Config with a constructor
fn sample_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "app/main.py", concat!(
        "from services.db import Database\n",
        "\n",
        "def main():\n",
        "    db = Database()\n",
        "    db.connect()\n",
        "    run_server()\n",
    ));
    write(root, "services/db.py", concat!(
        "class Database:\n",
        "    def connect(self):\n",
        "        pass\n",
        "\n",
        "    def query(self, sql):\n",
        "        pass\n",
    ));
    write(root, "web/server.js", concat!(
        "function run_server() {\n",
        "  listen(8080);\n",
        "}\n",
    ));
    write(root, "lib/util.rs", concat!(
        "pub struct Config {\n",
        "    pub port: u16,\n",
        "}\n",
        "\n",
        "impl Config {\n",
        "    pub fn new(port: u16) -> Self {\n",
        "        Self { port }\n",
        "    }\n",
        "}\n",
    ));

    dir
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn indexed(dir: &TempDir) -> RepositoryIndexer {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut indexer = RepositoryIndexer::new(AnalysisConfig::default()).unwrap();
    indexer.index(dir.path()).unwrap();
    indexer
}

#[test]
fn test_full_pipeline() {
    let dir = sample_repo();
    let indexer = indexed(&dir);
    let repo_map = indexer.repo_map();

    assert_eq!(repo_map.len(), 4);
    for path in ["app/main.py", "services/db.py", "web/server.js", "lib/util.rs"] {
        assert!(repo_map.contains_key(path), "missing {path}");
    }

    let db = &repo_map["services/db.py"];
    assert_eq!(db.language.as_deref(), Some("python"));
    let class = db.definitions.iter().find(|d| d.name == "Database").unwrap();
    assert_eq!(class.methods, vec!["connect", "query"]);
    assert!(!db.chunks.is_empty());

    assert_eq!(indexer.files_defining("Database"), &["services/db.py".to_string()]);
    assert_eq!(indexer.files_defining("run_server"), &["web/server.js".to_string()]);
}

#[test]
fn test_graph_queries_over_index() {
    let dir = sample_repo();
    let indexer = indexed(&dir);

    let config = AnalysisConfig::default();
    let graph = DependencyGraphBuilder::new(
        indexer.repo_map(),
        indexer.symbol_table(),
        config.entry_points,
    )
    .build();

    assert_eq!(
        graph.dependencies("app/main.py"),
        vec!["services/db.py", "web/server.js"],
        "cross-language edges resolve by symbol name"
    );
    assert_eq!(graph.dependents("services/db.py"), vec!["app/main.py"]);

    let central = graph.central_files(1);
    assert_eq!(central[0].1, 1);

    assert_eq!(graph.entry_points(), vec!["app/main.py"]);

    assert_eq!(
        graph.trace("app/main.py", 3),
        vec!["app/main.py", "services/db.py", "web/server.js"]
    );
    assert_eq!(graph.trace("app/main.py", 0), vec!["app/main.py"]);

    let stats = graph.stats();
    assert_eq!(stats.nodes, 4);
    assert_eq!(stats.edges, 2);
}

#[test]
fn test_summary_names_classes_and_methods() {
    let dir = sample_repo();
    let indexer = indexed(&dir);

    let summary = indexer.summary(10, 10, 10);
    assert!(summary.contains("## services/db.py"));
    assert!(summary.contains("Database (methods: connect, query)"));
    assert!(summary.contains("  - main"));
}

#[test]
fn test_broken_file_does_not_abort_the_walk() {
    let dir = sample_repo();
    write(dir.path(), "broken.py", "def broken(:\n  !!!\n");

    let indexer = indexed(&dir);
    assert_eq!(indexer.repo_map().len(), 5);
    assert!(indexer.repo_map().contains_key("broken.py"));
    // The healthy files are untouched by their neighbor's syntax errors.
    assert_eq!(indexer.files_defining("Database"), &["services/db.py".to_string()]);
}

#[test]
fn test_repo_map_serializes() {
    let dir = sample_repo();
    let indexer = indexed(&dir);

    let json = serde_json::to_value(indexer.repo_map()).unwrap();
    let db = &json["services/db.py"];
    assert_eq!(db["language"], "python");
    assert_eq!(db["definitions"][0]["name"], "Database");
    assert_eq!(db["definitions"][0]["kind"], "class");
    assert!(db["chunks"].as_array().is_some());
}
