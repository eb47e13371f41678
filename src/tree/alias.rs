// ABOUTME: Alias dirents redirecting to another path in the tree
// ABOUTME: Targets are resolved lazily by scope lookup

use super::path::Path;

/// Symbolic forward reference to another dirent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    target: Path,
}

impl Alias {
    /// Create an alias pointing at `target`
    pub fn new(target: impl Into<Path>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Path this alias redirects to
    pub fn target(&self) -> &Path {
        &self.target
    }
}
