use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use flow_nav::{
    CompiledFlow, FactPath, FlowSpec, InMemoryFactStore, NavigationOptions, compile,
    compile_with_dictionary,
};

/// Reads a JSON file, or TOML when the extension says so.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&raw).with_context(|| format!("invalid TOML in {}", path.display()))
    } else {
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

pub fn load_flow(path: &Path, dictionary: Option<&Path>) -> Result<CompiledFlow> {
    let spec: FlowSpec = read_document(path)?;
    let flow = match dictionary {
        Some(dictionary_path) => {
            let paths: Vec<FactPath> = read_document(dictionary_path)?;
            let dictionary: BTreeSet<FactPath> = paths.into_iter().collect();
            compile_with_dictionary(&spec, &dictionary)
        }
        None => compile(&spec),
    }
    .with_context(|| format!("flow {} does not compile", path.display()))?;
    debug!(flow = %flow.id(), screens = flow.screens().len(), "loaded flow");
    Ok(flow)
}

/// Missing `path` means an empty snapshot.
pub fn load_facts(path: Option<&Path>) -> Result<InMemoryFactStore> {
    match path {
        Some(path) => read_document(path),
        None => Ok(InMemoryFactStore::new()),
    }
}

pub fn load_options(path: Option<&Path>) -> Result<NavigationOptions> {
    match path {
        Some(path) => read_document(path),
        None => Ok(NavigationOptions::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_read_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        fs::write(&path, "navigate_to_data_view_at_end_of_sub_subcategory = true\n").unwrap();
        let options = load_options(Some(&path)).unwrap();
        assert_eq!(options, NavigationOptions::review());
    }

    #[test]
    fn facts_read_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        fs::write(&path, r#"{"/name": "Ada", "/filers": ["a"]}"#).unwrap();
        let store = load_facts(Some(&path)).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_facts(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
