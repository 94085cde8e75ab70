//! File-level dependency graph derived from the repository index.
//!
//! A directed edge `a -> b` means a references a symbol that b defines.
//! The graph answers structural questions only: who depends on whom, which
//! files sit at the center of the import web, where execution likely
//! enters, and what a bounded dependency walk from one file reaches.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use tracing::debug;

use crate::config::EntryPointConfig;
use crate::indexer::{RepoMap, SymbolTable};

/// One-shot builder: snapshots an index into an immutable [`DependencyGraph`].
pub struct DependencyGraphBuilder<'a> {
    repo_map: &'a RepoMap,
    symbols: &'a SymbolTable,
    rules: EntryPointConfig,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(repo_map: &'a RepoMap, symbols: &'a SymbolTable, rules: EntryPointConfig) -> Self {
        Self {
            repo_map,
            symbols,
            rules,
        }
    }

    /// Resolve every reference through the symbol table and materialize both
    /// edge directions. Unresolvable references are dropped; ambiguous
    /// symbols produce one edge per defining file.
    pub fn build(self) -> DependencyGraph {
        let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut inn: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for path in self.repo_map.keys() {
            out.entry(path.clone()).or_default();
            inn.entry(path.clone()).or_default();
        }

        let mut edges = 0usize;
        for (path, index) in self.repo_map {
            for reference in &index.references {
                let Some(defining) = self.symbols.get(&reference.name) else {
                    continue;
                };
                for target in defining {
                    // A stale symbol table may name files outside the map;
                    // nodes are exactly the indexed files, so those resolve
                    // to nothing.
                    if target == path || !self.repo_map.contains_key(target) {
                        continue;
                    }
                    if out.entry(path.clone()).or_default().insert(target.clone()) {
                        edges += 1;
                    }
                    inn.entry(target.clone()).or_default().insert(path.clone());
                }
            }
        }

        debug!("dependency graph: {} nodes, {edges} edges", out.len());
        DependencyGraph {
            out,
            inn,
            rules: self.rules,
        }
    }
}

/// Immutable file dependency graph. All query results are deterministic:
/// adjacency is kept sorted, so equal inputs yield identical output.
pub struct DependencyGraph {
    out: BTreeMap<String, BTreeSet<String>>,
    inn: BTreeMap<String, BTreeSet<String>>,
    rules: EntryPointConfig,
}

impl DependencyGraph {
    /// Files `path` depends on. Empty for unknown paths.
    pub fn dependencies(&self, path: &str) -> Vec<String> {
        self.out
            .get(path)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Files that depend on `path`. Empty for unknown paths.
    pub fn dependents(&self, path: &str) -> Vec<String> {
        self.inn
            .get(path)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.out.len()
    }

    /// The `n` most-depended-upon files, ranked by dependent count with
    /// lexical path order breaking ties.
    pub fn central_files(&self, n: usize) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .inn
            .iter()
            .map(|(path, dependents)| (path.clone(), dependents.len()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Likely execution entry points: files that are widely depended upon
    /// while depending on little themselves, plus files whose path contains
    /// a configured keyword (case-insensitive). Sorted by path.
    pub fn entry_points(&self) -> Vec<String> {
        let mut found = BTreeSet::new();
        for path in self.out.keys() {
            let deps = self.out[path].len();
            let dependents = self.inn[path].len();
            let structural = dependents > self.rules.min_dependents
                && deps < self.rules.max_dependencies;
            let lowered = path.to_lowercase();
            let named = self.rules.keywords.iter().any(|k| lowered.contains(k));
            if structural || named {
                found.insert(path.clone());
            }
        }
        found.into_iter().collect()
    }

    /// Depth-bounded dependency walk from `start`, pre-order, each file
    /// visited at most once so cycles terminate. `trace(p, 0)` is `[p]`;
    /// an unknown start yields an empty trace.
    pub fn trace(&self, start: &str, max_depth: usize) -> Vec<String> {
        if !self.out.contains_key(start) {
            return Vec::new();
        }

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(start.to_string(), 0usize)];

        while let Some((path, depth)) = stack.pop() {
            if !visited.insert(path.clone()) {
                continue;
            }
            if depth < max_depth {
                if let Some(next) = self.out.get(&path) {
                    // Reverse push so the lexically first dependency is
                    // expanded first.
                    for dep in next.iter().rev() {
                        if !visited.contains(dep) {
                            stack.push((dep.clone(), depth + 1));
                        }
                    }
                }
            }
            order.push(path);
        }

        order
    }

    pub fn stats(&self) -> GraphStats {
        let edges = self.out.values().map(BTreeSet::len).sum();
        let isolated = self
            .out
            .iter()
            .filter(|(path, deps)| deps.is_empty() && self.inn[*path].is_empty())
            .count();
        GraphStats {
            nodes: self.out.len(),
            edges,
            isolated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub isolated: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files, {} dependency edges, {} isolated",
            self.nodes, self.edges, self.isolated
        )
    }
}
