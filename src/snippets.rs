//! The snippet map boundary: short usage examples mined externally for a
//! function name (spec.md §6).

use std::collections::HashMap;
use std::path::Path;

/// Looks up usage snippets by function name. Returning `None` or an empty
/// list both suppress the snippets section and disable `SnippetIncluder`.
pub trait SnippetMap: Send + Sync {
    fn snippets_for(&self, function_name: &str) -> Option<Vec<String>>;
}

/// Loads a `{functionName: [snippet, ...]}` sidecar file.
pub struct JsonSnippetMap {
    by_function: HashMap<String, Vec<String>>,
}

impl JsonSnippetMap {
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let bytes = std::fs::read(path)?;
        let by_function: HashMap<String, Vec<String>> = serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self { by_function })
    }

    pub fn empty() -> Self {
        Self { by_function: HashMap::new() }
    }
}

impl SnippetMap for JsonSnippetMap {
    fn snippets_for(&self, function_name: &str) -> Option<Vec<String>> {
        self.by_function.get(function_name).cloned()
    }
}
