use std::{collections::BTreeMap, path::Path};

use anyhow::Context;

/// Read a flat `key=value` properties file into a map.
///
/// Lines are trimmed first. `#`-prefixed lines and lines without a `=` are
/// skipped; everything after the first `=` is the value. A later duplicate
/// key overwrites an earlier one. Value content is not validated here.
pub fn load_properties(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read properties file {}", path.display()))?;

    let mut props = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(props)
}
