//! Plugins compiled into the `quire` binary, served under `builtin:` locators

use quire_editor::{Edit, EditorEvent};
use quire_plugins::{PluginComponent, PluginContext, PluginDescriptor, StaticModuleLoader};
use std::sync::Arc;

pub const STRIP_WHITESPACE: &str = "builtin:strip-whitespace";

/// Removes whitespace-only text nodes left behind by indentation
pub struct StripWhitespace;

impl PluginComponent for StripWhitespace {
    fn run(&self, cx: &mut PluginContext<'_>) {
        let Some(doc) = cx.document() else { return };

        let blanks: Vec<Edit> = doc
            .descendants(doc.root())
            .filter(|id| doc.is_text(*id) && doc.text_content(*id).trim().is_empty())
            .map(Edit::remove)
            .collect();
        if blanks.is_empty() {
            return;
        }

        tracing::debug!(nodes = blanks.len(), "stripping whitespace");
        cx.dispatch(EditorEvent::titled_edit(Edit::compound(blanks), "Strip whitespace"));
    }
}

pub fn loader() -> StaticModuleLoader {
    StaticModuleLoader::new().with_module(STRIP_WHITESPACE, Arc::new(StripWhitespace))
}

/// Descriptors written by `quire init`
pub fn default_plugins() -> Vec<PluginDescriptor> {
    vec![PluginDescriptor::new("Strip whitespace", STRIP_WHITESPACE)
        .with_icon("format_clear")
        .requiring_doc()]
}
