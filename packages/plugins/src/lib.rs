//! # Quire Plugins
//!
//! Plugin configuration and loading for the Quire editor.
//!
//! ## Architecture
//!
//! ```text
//! PluginSet (declared)
//!     ↓ set_plugins / configure
//! PluginRegistry ── resolve src, derive tag ── ModuleLoader
//!     ↓                                            ↓
//! LoadedPlugins (watch) ←── bind first-wins ── ComponentRegistry
//! ```
//!
//! A [`Host`] pairs the registry with an edit session so that plugins can be
//! activated against the open document and their edits committed.

pub mod components;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod host;
pub mod identity;
pub mod loader;
pub mod registry;

pub use components::{ComponentRegistry, PluginComponent, PluginContext};
pub use config::{Config, DEFAULT_CONFIG_NAME};
pub use descriptor::{LoadedPlugins, PluginDescriptor, PluginKind, PluginSet, PluginTags};
pub use error::{LoadError, PluginError, PluginResult};
pub use host::{Host, HostEvent};
pub use identity::{plugin_tag, resolve_locator, TagCache};
pub use loader::{LoadResult, ModuleLoader, StaticModuleLoader};
pub use registry::{LoadFailure, PendingLoads, PluginRegistry};
