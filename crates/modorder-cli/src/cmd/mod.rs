pub mod closure;
pub mod completions;
pub mod order;

use anyhow::{Context, Result};
use modorder_core::ErrorCode;
use std::path::Path;
use tracing::warn;

use crate::output::coded;

/// Read a required input file.
pub fn read_required(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} from {}", path.display()))
        .map_err(coded(ErrorCode::InputReadFailed))
}

/// Read an optional input file; an unreadable file is warned about and
/// treated as absent.
pub fn read_optional(path: Option<&Path>, what: &str) -> Option<String> {
    let path = path?;
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "{what} not readable, continuing without it");
            None
        }
    }
}
