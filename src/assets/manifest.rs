//! Raw manifest shapes and their normalization.
//!
//! Bundler plugins disagree on the manifest layout. Observed variants:
//!
//! ```json
//! { "home": ["home.js", "home.css"] }
//! { "home": { "js": "home.js", "css": ["home.css"] } }
//! { "home": { "scripts": ["home.js"], "styles": ["home.css"] } }
//! ```
//!
//! Every value is parsed into a [`ManifestEntry`] and reduced by one
//! recursive [`ManifestEntry::flatten`]; anything that is not a string is
//! dropped rather than rejected.

use super::{AssetManifest, PageAssetSet};
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    Path(String),
    List(Vec<ManifestEntry>),
    Group(EntryGroup),
    /// Numbers, booleans, nulls: carried through parsing, dropped on flatten.
    Ignored(IgnoredAny),
}

impl ManifestEntry {
    /// All string paths reachable from this entry, in document order.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<String>) {
        match self {
            ManifestEntry::Path(path) => out.push(path.clone()),
            ManifestEntry::List(items) => items.iter().for_each(|item| item.flatten_into(out)),
            ManifestEntry::Group(group) => group.values().for_each(|item| item.flatten_into(out)),
            ManifestEntry::Ignored(_) => {}
        }
    }
}

/// Keyed entries in the order the document lists them.
///
/// Bundlers emit chunks in load order (`vendor` before `app`), so the keys
/// must not be sorted.
#[derive(Debug, Clone, Default)]
pub struct EntryGroup(Vec<(String, ManifestEntry)>);

impl EntryGroup {
    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.0.iter().map(|(_, v)| v)
    }
}

struct EntryGroupVisitor;

impl<'de> Visitor<'de> for EntryGroupVisitor {
    type Value = EntryGroup;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of manifest entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<EntryGroup, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, ManifestEntry>()? {
            // A repeated key replaces the earlier value in place.
            match entries.iter_mut().find(|entry: &&mut (String, ManifestEntry)| entry.0 == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
        }
        Ok(EntryGroup(entries))
    }
}

impl<'de> Deserialize<'de> for EntryGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntryGroupVisitor)
    }
}

/// Parse a manifest document whose top-level keys are page names.
pub fn parse_manifest(source: &str) -> serde_json::Result<AssetManifest> {
    let raw: BTreeMap<String, ManifestEntry> = serde_json::from_str(source)?;
    Ok(normalize(raw))
}

pub fn normalize(raw: BTreeMap<String, ManifestEntry>) -> AssetManifest {
    raw.into_iter()
        .map(|(page, entry)| {
            let assets = PageAssetSet::from_paths(entry.flatten());
            (page, assets)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_nested_groups() {
        let entry: ManifestEntry = serde_json::from_str(
            r#"{"scripts": ["a.js", ["b.js"]], "styles": "a.css", "size": 42, "x": null}"#,
        )
        .unwrap();
        assert_eq!(entry.flatten(), vec!["a.js", "b.js", "a.css"]);
    }

    #[test]
    fn test_group_keeps_document_order() {
        let manifest =
            parse_manifest(r#"{"home": {"vendor": ["vendor.js"], "app": ["app.js"]}}"#).unwrap();
        let home = manifest.get("home").unwrap();
        assert_eq!(home.scripts, vec!["vendor.js", "app.js"]);
    }

    #[test]
    fn test_group_lookup() {
        let entry: ManifestEntry =
            serde_json::from_str(r#"{"name": "home", "assets": ["z.js", "a.js"]}"#).unwrap();
        match entry {
            ManifestEntry::Group(group) => {
                assert!(group.get("missing").is_none());
                assert_eq!(group.get("assets").unwrap().flatten(), vec!["z.js", "a.js"]);
            }
            other => panic!("expected a group, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_flat_list_manifest() {
        let manifest = parse_manifest(r#"{"home": ["home.js", "home.css", "home.js.map"]}"#).unwrap();
        let home = manifest.get("home").unwrap();
        assert_eq!(home.scripts, vec!["home.js"]);
        assert_eq!(home.styles, vec!["home.css"]);
    }

    #[test]
    fn test_parse_single_string_values() {
        let manifest = parse_manifest(r#"{"admin": {"js": "/admin.js", "css": "/admin.css"}}"#).unwrap();
        let admin = manifest.get("admin").unwrap();
        assert_eq!(admin.scripts, vec!["/admin.js"]);
        assert_eq!(admin.styles, vec!["/admin.css"]);
    }

    #[test]
    fn test_top_level_must_be_object() {
        assert!(parse_manifest(r#"["home.js"]"#).is_err());
    }
}
