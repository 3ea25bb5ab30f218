use crate::builtins;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use quire_plugins::{resolve_locator, Config, Host};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct PluginsArgs {
    /// Directory holding quire.config.json (defaults to current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Load every configured plugin and report what happened
pub async fn plugins(args: PluginsArgs, cwd: &Path) -> Result<()> {
    let dir = args.config.unwrap_or_else(|| cwd.to_path_buf());
    let config = Config::load(&dir)?;

    if config.plugins.is_empty() {
        println!("{}", "⚠️  No plugins configured".yellow());
        return Ok(());
    }

    let mut host = Host::from_config(&config, Arc::new(builtins::loader()))?;
    host.settle().await;

    let registry = host.registry();
    let loaded = registry.loaded();
    let failures = registry.failures();

    println!("{}", "🔌 Plugins".bright_blue().bold());
    for (kind, descriptor) in registry.declared().iter() {
        match loaded.tag_of(kind, &descriptor.name) {
            Some(tag) => println!(
                "  {} {:<6} {} {}",
                "✓".green(),
                kind,
                descriptor.name,
                tag.dimmed()
            ),
            None => {
                let locator = resolve_locator(registry.base_url(), &descriptor.src)
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| descriptor.src.clone());
                let reason = failures
                    .iter()
                    .rev()
                    .find(|f| f.locator == locator)
                    .map(|f| f.error.to_string())
                    .unwrap_or_else(|| "not loaded".to_string());
                println!("  {} {:<6} {} {}", "✗".red(), kind, descriptor.name, reason.red());
            }
        }
    }

    println!();
    println!("{} of {} loaded", loaded.len(), config.plugins.len());
    Ok(())
}
