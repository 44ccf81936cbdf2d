//! Manifest fragment formatting.
//!
//! Each module path becomes one line of the form `    "drivers/foo.ko",`
//! for inclusion in a build manifest list.

use crate::config::OutputConfig;

/// Format one module path as a manifest entry.
#[must_use]
pub fn manifest_line(path: &str, config: &OutputConfig) -> String {
    let stripped = if config.strip_prefix.is_empty() {
        path.to_string()
    } else {
        path.replacen(&config.strip_prefix, "", 1)
    };
    format!("{:indent$}\"{stripped}\",", "", indent = config.indent)
}

/// Render a whole manifest fragment, one newline-terminated line per path.
#[must_use]
pub fn render_manifest<S: AsRef<str>>(paths: &[S], config: &OutputConfig) -> String {
    paths
        .iter()
        .map(|path| manifest_line(path.as_ref(), config) + "\n")
        .collect()
}
