//! # Plugin Descriptors
//!
//! Configuration data naming a loadable plugin. A descriptor is identified by
//! `(name, kind)`; `src` decides which module implements it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Actions offered from the menu, run on demand
    Menu,
    /// Editor views shown while a document is open
    Editor,
}

impl PluginKind {
    pub const ALL: [PluginKind; 2] = [PluginKind::Menu, PluginKind::Editor];
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(match self {
            PluginKind::Menu => "menu",
            PluginKind::Editor => "editor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    pub name: String,

    /// Display name per locale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<BTreeMap<String, String>>,

    /// Module locator, absolute or relative to the host base URL
    pub src: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_doc: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translations: None,
            src: src.into(),
            icon: String::new(),
            require_doc: None,
            active: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn requiring_doc(mut self) -> Self {
        self.require_doc = Some(true);
        self
    }

    pub fn requires_doc(&self) -> bool {
        self.require_doc.unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }

    /// Name to show for `locale`, falling back to `name`
    pub fn display_name(&self, locale: &str) -> &str {
        self.translations
            .as_ref()
            .and_then(|t| t.get(locale))
            .map(String::as_str)
            .unwrap_or(&self.name)
    }
}

/// Declared plugin configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSet {
    #[serde(default)]
    pub menu: Vec<PluginDescriptor>,

    #[serde(default)]
    pub editor: Vec<PluginDescriptor>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: PluginKind) -> &[PluginDescriptor] {
        match kind {
            PluginKind::Menu => &self.menu,
            PluginKind::Editor => &self.editor,
        }
    }

    pub fn get_mut(&mut self, kind: PluginKind) -> &mut Vec<PluginDescriptor> {
        match kind {
            PluginKind::Menu => &mut self.menu,
            PluginKind::Editor => &mut self.editor,
        }
    }

    pub fn find(&self, kind: PluginKind, name: &str) -> Option<&PluginDescriptor> {
        self.get(kind).iter().find(|d| d.name == name)
    }

    /// Replace the descriptor named `name` in place, or append
    pub fn upsert(&mut self, kind: PluginKind, name: &str, descriptor: PluginDescriptor) {
        let list = self.get_mut(kind);
        match list.iter_mut().find(|d| d.name == name) {
            Some(slot) => *slot = descriptor,
            None => list.push(descriptor),
        }
    }

    pub fn remove(&mut self, kind: PluginKind, name: &str) -> Option<PluginDescriptor> {
        let list = self.get_mut(kind);
        let index = list.iter().position(|d| d.name == name)?;
        Some(list.remove(index))
    }

    /// Every descriptor, menu plugins first
    pub fn iter(&self) -> impl Iterator<Item = (PluginKind, &PluginDescriptor)> {
        PluginKind::ALL
            .into_iter()
            .flat_map(move |kind| self.get(kind).iter().map(move |d| (kind, d)))
    }

    pub fn len(&self) -> usize {
        self.menu.len() + self.editor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity tags assigned to loaded plugins, parallel to [`PluginSet`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginTags {
    pub menu: Vec<String>,
    pub editor: Vec<String>,
}

impl PluginTags {
    fn get_mut(&mut self, kind: PluginKind) -> &mut Vec<String> {
        match kind {
            PluginKind::Menu => &mut self.menu,
            PluginKind::Editor => &mut self.editor,
        }
    }

    fn get(&self, kind: PluginKind) -> &[String] {
        match kind {
            PluginKind::Menu => &self.menu,
            PluginKind::Editor => &self.editor,
        }
    }
}

/// Plugins that finished loading, each with the tag its module is bound under
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedPlugins {
    pub plugins: PluginSet,
    pub tags: PluginTags,
}

impl LoadedPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `descriptor` as loaded under `tag`, replacing its slot
    pub fn insert(&mut self, kind: PluginKind, descriptor: PluginDescriptor, tag: String) {
        let position = self.plugins.get(kind).iter().position(|d| d.name == descriptor.name);
        match position {
            Some(index) => {
                self.plugins.get_mut(kind)[index] = descriptor;
                self.tags.get_mut(kind)[index] = tag;
            }
            None => {
                self.plugins.get_mut(kind).push(descriptor);
                self.tags.get_mut(kind).push(tag);
            }
        }
    }

    /// Drop the slot `(name, kind)`, returning the tag it was loaded under
    pub fn remove(&mut self, kind: PluginKind, name: &str) -> Option<String> {
        let index = self.plugins.get(kind).iter().position(|d| d.name == name)?;
        self.plugins.get_mut(kind).remove(index);
        Some(self.tags.get_mut(kind).remove(index))
    }

    pub fn get(&self, kind: PluginKind, name: &str) -> Option<(&PluginDescriptor, &str)> {
        let index = self.plugins.get(kind).iter().position(|d| d.name == name)?;
        Some((&self.plugins.get(kind)[index], self.tags.get(kind)[index].as_str()))
    }

    pub fn tag_of(&self, kind: PluginKind, name: &str) -> Option<&str> {
        self.get(kind, name).map(|(_, tag)| tag)
    }

    pub fn contains(&self, kind: PluginKind, name: &str) -> bool {
        self.tag_of(kind, name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PluginKind, &PluginDescriptor, &str)> {
        PluginKind::ALL.into_iter().flat_map(move |kind| {
            self.plugins
                .get(kind)
                .iter()
                .zip(self.tags.get(kind))
                .map(move |(d, tag)| (kind, d, tag.as_str()))
        })
    }

    /// Keep only slots still present in `declared`
    pub fn retain_declared(&mut self, declared: &PluginSet) {
        for kind in PluginKind::ALL {
            let stale: Vec<String> = self
                .plugins
                .get(kind)
                .iter()
                .filter(|d| declared.find(kind, &d.name).is_none())
                .map(|d| d.name.clone())
                .collect();
            for name in stale {
                self.remove(kind, &name);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_json() {
        let json = r#"{
            "name": "Substation",
            "src": "plugins/substation.js",
            "icon": "margin",
            "requireDoc": true,
            "translations": { "de": "Schaltanlage" }
        }"#;
        let descriptor: PluginDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(descriptor.name, "Substation");
        assert!(descriptor.requires_doc());
        assert!(!descriptor.is_active());
        assert_eq!(descriptor.display_name("de"), "Schaltanlage");
        assert_eq!(descriptor.display_name("en"), "Substation");
    }

    #[test]
    fn test_plugin_set_upsert_and_remove() {
        let mut set = PluginSet::new();
        set.upsert(PluginKind::Menu, "Open", PluginDescriptor::new("Open", "a.js"));
        set.upsert(PluginKind::Menu, "Save", PluginDescriptor::new("Save", "b.js"));
        set.upsert(PluginKind::Menu, "Open", PluginDescriptor::new("Open", "c.js"));

        assert_eq!(set.menu.len(), 2);
        assert_eq!(set.menu[0].src, "c.js");

        assert!(set.remove(PluginKind::Menu, "Open").is_some());
        assert!(set.remove(PluginKind::Editor, "Save").is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_loaded_tags_stay_parallel() {
        let mut loaded = LoadedPlugins::new();
        loaded.insert(PluginKind::Editor, PluginDescriptor::new("A", "a.js"), "tag-a".into());
        loaded.insert(PluginKind::Editor, PluginDescriptor::new("B", "b.js"), "tag-b".into());
        loaded.insert(PluginKind::Menu, PluginDescriptor::new("A", "a.js"), "tag-a".into());

        assert_eq!(loaded.remove(PluginKind::Editor, "A"), Some("tag-a".to_string()));
        assert_eq!(loaded.tags.editor, vec!["tag-b"]);
        assert_eq!(loaded.tag_of(PluginKind::Menu, "A"), Some("tag-a"));

        let kinds: Vec<_> = loaded.iter().map(|(kind, d, _)| (kind, d.name.as_str())).collect();
        assert_eq!(kinds, vec![(PluginKind::Menu, "A"), (PluginKind::Editor, "B")]);
    }

    #[test]
    fn test_retain_declared() {
        let mut declared = PluginSet::new();
        declared.menu.push(PluginDescriptor::new("Keep", "k.js"));

        let mut loaded = LoadedPlugins::new();
        loaded.insert(PluginKind::Menu, PluginDescriptor::new("Keep", "k.js"), "k".into());
        loaded.insert(PluginKind::Menu, PluginDescriptor::new("Gone", "g.js"), "g".into());

        loaded.retain_declared(&declared);
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains(PluginKind::Menu, "Keep"));
    }
}
