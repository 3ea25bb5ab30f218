use crate::builtins;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quire_dom::Serializer;
use quire_editor::{Edit, EditorEvent, WizardRequest};
use quire_plugins::{Config, Host, HostEvent, PluginDescriptor, PluginKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// XML document to edit
    pub document: PathBuf,

    /// JSON edit script
    pub script: PathBuf,

    /// Menu plugins to run before the script
    #[arg(short, long = "plugin")]
    pub plugins: Vec<String>,

    /// Undo this many entries after the script
    #[arg(long, default_value_t = 0)]
    pub undo: usize,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Sort attributes by name when writing
    #[arg(long)]
    pub sorted: bool,
}

/// One step of an edit script
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptStep {
    Commit {
        edit: Edit,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        squash: bool,
    },
    Undo(usize),
    Redo(usize),
    Wizard(WizardRequest),
    CloseWizard,
    ConfigurePlugin {
        name: String,
        kind: PluginKind,
        #[serde(default)]
        config: Option<PluginDescriptor>,
    },
}

impl ScriptStep {
    fn into_event(self, host: &Host) -> Option<HostEvent> {
        let event = match self {
            ScriptStep::Commit { edit, title, squash } => EditorEvent::Edit { edit, title, squash },
            ScriptStep::Undo(n) => EditorEvent::Undo(n),
            ScriptStep::Redo(n) => EditorEvent::Redo(n),
            ScriptStep::Wizard(request) => EditorEvent::Wizard(request),
            ScriptStep::CloseWizard => {
                EditorEvent::CloseWizard(host.session().active_wizard()?.clone())
            }
            ScriptStep::ConfigurePlugin { name, kind, config } => {
                return Some(HostEvent::ConfigurePlugin { name, kind, config })
            }
        };
        Some(event.into())
    }
}

pub fn parse_script(source: &str) -> Result<Vec<ScriptStep>> {
    Ok(serde_json::from_str(source)?)
}

pub async fn apply(args: ApplyArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mut host = Host::from_config(&config, Arc::new(builtins::loader()))?;
    host.settle().await;

    host.session_mut()
        .load(&args.document)
        .with_context(|| format!("Cannot open {}", args.document.display()))?;

    for name in &args.plugins {
        host.activate(name)
            .with_context(|| format!("Plugin '{}' failed", name))?;
    }

    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("Cannot read {}", args.script.display()))?;
    for (index, step) in parse_script(&source)?.into_iter().enumerate() {
        let Some(event) = step.into_event(&host) else {
            continue;
        };
        host.handle(event)
            .with_context(|| format!("Step {} of {}", index + 1, args.script.display()))?;
    }
    host.settle().await;

    if args.undo > 0 {
        host.session_mut().undo(args.undo)?;
    }

    let session = host.session();
    let doc = session.document().context("No document open")?;
    let xml = Serializer::new().sort_attributes(args.sorted).serialize(doc);
    match &args.output {
        Some(path) => fs::write(path, &xml)?,
        None => println!("{}", xml),
    }

    let history = session.history();
    eprintln!(
        "{} {} of {} entries applied",
        "📜".bright_blue(),
        history.edit_count(),
        history.len()
    );
    if config.history_titles {
        for (index, entry) in history.entries().iter().enumerate() {
            let marker = if index < history.edit_count() { "✓".green() } else { "↶".yellow() };
            eprintln!(
                "   {} {} {}",
                marker,
                entry.title.as_deref().unwrap_or("(untitled)"),
                entry.time.format("%H:%M:%S").to_string().dimmed()
            );
        }
    }
    if let Some(wizard) = session.active_wizard() {
        eprintln!("{} wizard pending: {:?}", "🪄".yellow(), wizard);
    }
    for diagnostic in session.diagnostics() {
        eprintln!("{} {}: {}", "⚠️".yellow(), diagnostic.kind, diagnostic.title);
    }

    Ok(())
}
