//! `modules.alias` lookup: which module claims a device identifier.
//!
//! Lines look like `alias of:N*T*Csamsung,exynos-pinctrl pinctrl_exynos`.
//! The leading `alias` token is dropped; what remains is a pattern followed
//! by the claiming module's name.

#![allow(clippy::module_name_repetitions)]

use serde::Serialize;

/// What an identifier resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "module", rename_all = "snake_case")]
pub enum AliasTarget {
    /// A loadable module (by alias name, usually `_`-separated).
    Module(String),
    /// No module claims the identifier; the driver is built into the kernel.
    Builtin,
}

impl AliasTarget {
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AliasEntry {
    /// Normalized line: pattern, space, module.
    line: String,
    pattern_len: usize,
    module: String,
}

/// Parsed `modules.alias` contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    /// Parse alias text. Lines without a module token are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|raw| {
                let trimmed = raw.trim();
                let line = trimmed.strip_prefix("alias").unwrap_or(trimmed).trim();
                let mut tokens = line.split_whitespace();
                let pattern = tokens.next()?;
                let module = tokens.next()?;
                Some(AliasEntry {
                    line: line.to_string(),
                    pattern_len: pattern.len(),
                    module: module.to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `identifier` to the module that claims it.
    ///
    /// A line matches when it contains `identifier` followed by a space.
    /// The longest matching pattern wins; among equally long patterns the
    /// later line wins.
    #[must_use]
    pub fn resolve(&self, identifier: &str) -> AliasTarget {
        let needle = format!("{identifier} ");
        self.entries
            .iter()
            .filter(|entry| entry.line.contains(&needle))
            .max_by_key(|entry| entry.pattern_len)
            .map_or(AliasTarget::Builtin, |entry| {
                AliasTarget::Module(entry.module.clone())
            })
    }
}
