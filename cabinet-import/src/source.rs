//! Source file reader

use cabinet_common::{Error, Result};
use std::path::Path;
use tracing::info;

/// Load a whole source file as text
///
/// A missing file is a fatal not-found error. No retry, no partial reads.
pub fn read_source(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::NotFound(format!("Source file not found: {}", path.display())));
    }

    let content = std::fs::read_to_string(path)?;
    info!("📂 Loaded {} ({} bytes)", path.display(), content.len());
    Ok(content)
}
