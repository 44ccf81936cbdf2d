//! Module identity: install paths, short names, and their node indices.
//!
//! Every module is identified by its install path (as written in
//! `modules.dep`). Its short name is the final path segment with the
//! extension stripped, so `kernel/drivers/foo/bar-baz.ko` is `bar-baz`.
//!
//! Index 0 always belongs to the synthetic [`ROOT`] entry; modules are
//! numbered from 1 in the order they are registered.
//!
//! # Duplicates
//!
//! Name→path and path→index lookups are last-write-wins when the source
//! data repeats a name or path. Separator-normalized name matching
//! (`-` vs `_`) is first-match-wins in registration order.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

/// Label of the synthetic source node.
pub const ROOT: &str = "ROOT";

/// Derive a module's short name from its path.
///
/// Takes the final `/` segment and strips everything from the last `.`.
#[must_use]
pub fn module_name(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}

/// Normalize `-` to `_`, the form used by module aliases.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Bidirectional lookup between module paths, names, and node indices.
#[derive(Debug, Clone)]
pub struct ModuleTable {
    paths: Vec<String>,
    by_path: HashMap<String, NodeIndex>,
    by_name: HashMap<String, NodeIndex>,
    /// Distinct names in first-registration order.
    names: Vec<String>,
}

impl Default for ModuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleTable {
    /// Create a table holding only the [`ROOT`] entry at index 0.
    #[must_use]
    pub fn new() -> Self {
        let root = NodeIndex::new(0);
        Self {
            paths: vec![ROOT.to_string()],
            by_path: HashMap::from([(ROOT.to_string(), root)]),
            by_name: HashMap::from([(ROOT.to_string(), root)]),
            names: Vec::new(),
        }
    }

    /// Register a module path and return the index assigned to it.
    pub fn register(&mut self, path: &str) -> NodeIndex {
        let idx = NodeIndex::new(self.paths.len());
        let name = module_name(path).to_string();

        self.paths.push(path.to_string());
        self.by_path.insert(path.to_string(), idx);
        if self.by_name.insert(name.clone(), idx).is_none() {
            self.names.push(name);
        }
        idx
    }

    /// Number of registered modules, excluding ROOT.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install path of `idx`, or `None` if the index was never assigned.
    #[must_use]
    pub fn path(&self, idx: NodeIndex) -> Option<&str> {
        self.paths.get(idx.index()).map(String::as_str)
    }

    /// Short name of `idx`. ROOT's name is [`ROOT`].
    #[must_use]
    pub fn name(&self, idx: NodeIndex) -> Option<&str> {
        self.path(idx).map(module_name)
    }

    /// Name of `idx`, falling back to `#<index>` for unknown indices.
    #[must_use]
    pub fn label(&self, idx: NodeIndex) -> String {
        self.name(idx)
            .map_or_else(|| format!("#{}", idx.index()), str::to_string)
    }

    #[must_use]
    pub fn by_path(&self, path: &str) -> Option<NodeIndex> {
        self.by_path.get(path).copied()
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<NodeIndex> {
        self.by_name.get(name).copied()
    }

    /// Resolve a name that may use `_` where the module's real name uses `-`.
    ///
    /// The first registered name whose normalized form equals `raw` wins;
    /// otherwise `raw` is looked up verbatim.
    #[must_use]
    pub fn resolve_name(&self, raw: &str) -> Option<NodeIndex> {
        self.names
            .iter()
            .find(|name| normalize_name(name) == raw)
            .and_then(|name| self.by_name(name))
            .or_else(|| self.by_name(raw))
    }

    /// Indices of all registered modules (ROOT excluded), in order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (1..self.paths.len()).map(NodeIndex::new)
    }
}
