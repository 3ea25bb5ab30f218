pub mod apply;
pub mod init;
pub mod plugins;

pub use apply::{apply, ApplyArgs};
pub use init::{init, InitArgs};
pub use plugins::{plugins, PluginsArgs};
