use crate::builtins;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use quire_plugins::{Config, DEFAULT_CONFIG_NAME};
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Base URL for relative plugin locators
    #[arg(long)]
    pub base_url: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let mut config = Config {
        base_url: args.base_url,
        history_titles: true,
        ..Config::default()
    };
    config.plugins.menu = builtins::default_plugins();
    config.base_url()?;
    config.save(cwd)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    Ok(())
}
