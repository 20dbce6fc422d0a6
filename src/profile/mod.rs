//! Profile overlay engine (§4.6).
//!
//! A profile is a bag of named files layered over a parent chain; overlaying
//! flattens that chain depth-first, post-order (parents merged before the
//! child that named them), with `.properties` files merged key-by-key and
//! everything else overwritten wholesale. Grounded on the same "visited set,
//! recurse into dependencies, append self on return" shape as the resource
//! sorter (`crate::resource::sort`) and the closure evaluator's array
//! splicing, applied here to a parent-profile graph instead.

pub mod interpolation;

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::errors::{ShellError, ShellResult};

pub const DELETED_SENTINEL: &str = "#deleted#";

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub id: String,
    pub parent_ids: Vec<String>,
    pub files: IndexMap<String, Vec<u8>>,
    pub is_overlay: bool,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), parent_ids: Vec::new(), files: IndexMap::new(), is_overlay: false }
    }

    pub fn with_parent(mut self, id: impl Into<String>) -> Self {
        self.parent_ids.push(id.into());
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), bytes.into());
        self
    }
}

/// A lookup source for profiles by id, consulted by `overlay` (§4.6).
pub trait ProfileRegistry {
    fn resolve(&self, id: &str) -> Option<&Profile>;
}

impl ProfileRegistry for IndexMap<String, Profile> {
    fn resolve(&self, id: &str) -> Option<&Profile> {
        self.get(id)
    }
}

enum FileEntry {
    Properties(IndexMap<String, String>),
    Opaque(Vec<u8>),
}

impl FileEntry {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            FileEntry::Opaque(b) => b,
            FileEntry::Properties(props) => serialize_properties(&props),
        }
    }
}

/// Parse a `.properties` file's bytes as `key=value` lines (`#`-prefixed
/// lines and blank lines ignored).
pub fn parse_properties(bytes: &[u8]) -> IndexMap<String, String> {
    let text = String::from_utf8_lossy(bytes);
    let mut map = IndexMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}

pub fn serialize_properties(props: &IndexMap<String, String>) -> Vec<u8> {
    let mut out = String::new();
    for (k, v) in props {
        out.push_str(k);
        out.push('=');
        out.push_str(v);
        out.push('\n');
    }
    out.into_bytes()
}

/// Flatten `id`'s parent chain and merge files per §4.6's per-key rules.
pub fn overlay(
    registry: &dyn ProfileRegistry,
    id: &str,
    environment: Option<&str>,
) -> ShellResult<Profile> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    collect_order(registry, id, &mut visited, &mut order)?;

    let mut acc: IndexMap<String, FileEntry> = IndexMap::new();
    for pid in &order {
        let profile = registry.resolve(pid).ok_or_else(|| ShellError::MissingProfile(pid.clone()))?;
        merge_profile_files(profile, environment, &mut acc);
    }

    let root = registry.resolve(id).ok_or_else(|| ShellError::MissingProfile(id.to_string()))?;
    let files = acc.into_iter().map(|(k, v)| (k, v.into_bytes())).collect();
    Ok(Profile { id: root.id.clone(), parent_ids: root.parent_ids.clone(), files, is_overlay: true })
}

fn collect_order(
    registry: &dyn ProfileRegistry,
    id: &str,
    visited: &mut HashSet<String>,
    order: &mut Vec<String>,
) -> ShellResult<()> {
    if visited.contains(id) {
        return Ok(());
    }
    visited.insert(id.to_string());
    let profile = registry.resolve(id).ok_or_else(|| ShellError::MissingProfile(id.to_string()))?;
    for parent in &profile.parent_ids {
        collect_order(registry, parent, visited, order)?;
    }
    order.push(id.to_string());
    Ok(())
}

fn merge_profile_files(profile: &Profile, environment: Option<&str>, acc: &mut IndexMap<String, FileEntry>) {
    for (key, bytes) in &profile.files {
        if key.contains('#') {
            continue;
        }

        let effective: &[u8] = match environment {
            Some(env) => {
                let qualified = format!("{}#{}", key, env);
                profile.files.get(&qualified).map(Vec::as_slice).unwrap_or(bytes)
            }
            None => bytes,
        };

        if key.ends_with(".properties") {
            let incoming = parse_properties(effective);
            match acc.get_mut(key) {
                None => {
                    acc.insert(key.clone(), FileEntry::Properties(incoming));
                }
                Some(FileEntry::Properties(existing)) => {
                    if incoming.contains_key(DELETED_SENTINEL) {
                        existing.clear();
                    }
                    for (k, v) in incoming {
                        if k == DELETED_SENTINEL {
                            continue;
                        }
                        if v == DELETED_SENTINEL {
                            existing.shift_remove(&k);
                        } else {
                            existing.insert(k, v);
                        }
                    }
                }
                Some(slot @ FileEntry::Opaque(_)) => {
                    *slot = FileEntry::Properties(incoming);
                }
            }
        } else {
            acc.insert(key.clone(), FileEntry::Opaque(effective.to_vec()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(profiles: Vec<Profile>) -> IndexMap<String, Profile> {
        profiles.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    #[test]
    fn overlay_merges_properties_and_honours_the_delete_sentinel() {
        // §8 scenario 7: shared file key "app.properties".
        let parent = Profile::new("parent").with_file("app.properties", "k=v\nd=x\n");
        let child = Profile::new("child")
            .with_parent("parent")
            .with_file("app.properties", "d=#deleted#\nk2=v2\n");
        let registry = registry_with(vec![parent, child]);

        let result = overlay(&registry, "child", None).unwrap();
        let props = parse_properties(result.files.get("app.properties").unwrap());
        assert_eq!(props.get("k"), Some(&"v".to_string()));
        assert_eq!(props.get("k2"), Some(&"v2".to_string()));
        assert_eq!(props.get("d"), None);
    }

    #[test]
    fn overlay_overwrites_opaque_files_wholesale() {
        let parent = Profile::new("parent").with_file("banner.txt", "old");
        let child = Profile::new("child").with_parent("parent").with_file("banner.txt", "new");
        let registry = registry_with(vec![parent, child]);

        let result = overlay(&registry, "child", None).unwrap();
        assert_eq!(result.files.get("banner.txt").unwrap(), b"new");
    }

    #[test]
    fn missing_parent_fails_with_missing_profile() {
        let child = Profile::new("child").with_parent("ghost");
        let registry = registry_with(vec![child]);
        let err = overlay(&registry, "child", None).unwrap_err();
        assert!(matches!(err, ShellError::MissingProfile(id) if id == "ghost"));
    }

    #[test]
    fn overlay_is_idempotent_over_the_same_registry() {
        let parent = Profile::new("parent").with_file("app.properties", "k=v\n");
        let child = Profile::new("child").with_parent("parent").with_file("app.properties", "k2=v2\n");
        let registry = registry_with(vec![parent, child]);

        let once = overlay(&registry, "child", None).unwrap();
        let twice = overlay(&registry, "child", None).unwrap();
        assert_eq!(once.files, twice.files);
    }

    #[test]
    fn environment_qualified_sibling_overrides_the_base_key_during_merge() {
        let mut child = Profile::new("child").with_file("app.properties", "k=base\n");
        child.files.insert("app.properties#prod".to_string(), b"k=prod\n".to_vec());
        let registry = registry_with(vec![child]);

        let result = overlay(&registry, "child", Some("prod")).unwrap();
        let props = parse_properties(result.files.get("app.properties").unwrap());
        assert_eq!(props.get("k"), Some(&"prod".to_string()));
    }

    #[test]
    fn cyclic_parent_chain_terminates() {
        let a = Profile::new("a").with_parent("b");
        let b = Profile::new("b").with_parent("a");
        let registry = registry_with(vec![a, b]);
        assert!(overlay(&registry, "a", None).is_ok());
    }
}
