use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::Level;

use crate::cipher::Key;
use crate::config::{FILE_EXTENSION, Settings, TEMPLATE_DIR_ENV, VERSION, VERSION_URL};
use crate::file::WalkOptions;
use crate::processor::Processor;
use crate::store::Store;
use crate::ui;
use crate::update::{self, UpdateStatus};

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a directory tree as a template.
    Create {
        /// Template name.
        name: String,

        /// Include directories whose name starts with a dot.
        #[arg(long)]
        hidden: bool,

        /// Leave the root's .tdmignore out of the template.
        #[arg(long)]
        exclude_ignore: bool,

        /// Directory to capture (defaults to the current directory).
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Apply a template.
    Get {
        /// Template name.
        name: String,

        /// Destination directory (defaults to the current directory).
        #[arg(long)]
        into: Option<PathBuf>,
    },

    /// Delete a template.
    Delete { name: String },

    /// Show all templates.
    List,

    /// Import an external template file.
    Import {
        input: PathBuf,

        /// Name to store it under (defaults to the file name).
        name: Option<String>,
    },

    /// Export a template into a directory.
    Export { name: String, output_dir: PathBuf },

    /// Show the directory where templates are stored.
    ShowDir,

    /// Change the directory where templates are stored.
    ChangeDir {
        dir: PathBuf,

        /// Move the existing templates into the new directory.
        #[arg(long)]
        move_existing: bool,
    },

    /// Show the current version.
    Version,

    /// Check for a newer release.
    Update,
}

#[derive(Parser)]
#[command(name = "tdmcli", version, about = "Capture directory trees as templates and apply them anywhere.", args_conflicts_with_subcommands = true)]
pub struct App {
    #[command(subcommand)]
    command: Option<Commands>,

    /// A .tdmcli file to import directly.
    file: Option<PathBuf>,

    /// Number of worker threads (defaults to a multiple of the CPU count).
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Obfuscation key (defaults to the shared tdmcli key).
    #[arg(long, global = true)]
    key: Option<String>,

    /// Verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl App {
    pub fn init() -> Result<Self> {
        let app = Self::parse();

        let level = if app.verbose { Level::DEBUG } else { Level::WARN };
        let subscriber = tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).with_target(false).finish();
        tracing::subscriber::set_global_default(subscriber)?;

        Ok(app)
    }

    pub async fn execute(self) -> Result<()> {
        let config_path = Settings::default_path();
        let settings = match &config_path {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        let invocation = Invocation { settings, config_path, workers: self.workers, key: self.key };

        match (self.command, self.file) {
            (Some(command), _) => command.run(&invocation).await,
            (None, Some(file)) => {
                if file.extension().is_none_or(|ext| ext != FILE_EXTENSION) {
                    anyhow::bail!("not a .{FILE_EXTENSION} file: {}", file.display());
                }
                ui::show_info(&format!("Detected .{FILE_EXTENSION} file, importing..."));
                Commands::Import { input: file, name: None }.run(&invocation).await
            }
            (None, None) => {
                Self::command().print_help()?;
                Ok(())
            }
        }
    }
}

/// Settings and flags every command resolves against.
struct Invocation {
    settings: Settings,
    config_path: Option<PathBuf>,
    workers: Option<usize>,
    key: Option<String>,
}

impl Invocation {
    fn store(&self) -> Result<Store> {
        Store::resolve(env::var_os(TEMPLATE_DIR_ENV), &self.settings).context("cannot open the template directory")
    }

    fn processor(&self) -> Result<Processor> {
        let key = match self.key.as_deref().or(self.settings.key.as_deref()) {
            Some(key) => Key::new(key)?,
            None => Key::default(),
        };
        let workers = self.workers.filter(|&n| n > 0).unwrap_or_else(|| self.settings.workers());

        Ok(Processor::new(key, workers)?.with_progress(true))
    }
}

impl Commands {
    async fn run(self, invocation: &Invocation) -> Result<()> {
        match self {
            Self::Create { name, hidden, exclude_ignore, root } => {
                let root = match root {
                    Some(root) => root,
                    None => env::current_dir().context("cannot read the current directory")?,
                };
                let store = invocation.store()?;
                let destination = store.path_of(&name)?;
                let options = WalkOptions { include_hidden: hidden, include_ignore_file: !exclude_ignore };

                println!("Creating template '{name}' from {}.", root.display());
                let summary = invocation.processor()?.create(&root, &destination, &options).await.with_context(|| format!("failed to create template '{name}'"))?;
                ui::show_created(&name, &destination, &summary);
            }
            Self::Get { name, into } => {
                let destination = match into {
                    Some(dir) => dir,
                    None => env::current_dir().context("cannot read the current directory")?,
                };
                let archive = invocation.store()?.path_of(&name)?;

                println!("Applying template '{name}'.");
                let summary = invocation.processor()?.apply(&archive, &destination).await.with_context(|| format!("failed to apply template '{name}'"))?;
                ui::show_applied(&name, &destination, &summary);
            }
            Self::Delete { name } => {
                invocation.store()?.delete(&name).with_context(|| format!("cannot delete template '{name}'"))?;
                ui::show_info(&format!("Template '{name}' deleted successfully."));
            }
            Self::List => ui::show_templates(&invocation.store()?.list()?),
            Self::Import { input, name } => {
                let (name, _) = invocation.store()?.import(&input, name.as_deref()).with_context(|| format!("cannot import {}", input.display()))?;
                ui::show_info(&format!("Template imported from '{}' as '{name}'.", input.display()));
            }
            Self::Export { name, output_dir } => {
                let target = invocation.store()?.export(&name, &output_dir).with_context(|| format!("cannot export template '{name}'"))?;
                ui::show_info(&format!("Template '{name}' exported to '{}'.", target.display()));
            }
            Self::ShowDir => println!("Templates directory: {}", invocation.store()?.dir().display()),
            Self::ChangeDir { dir, move_existing } => change_dir(invocation, &dir, move_existing)?,
            Self::Version => println!("tdmcli version: {VERSION}"),
            Self::Update => match update::check(VERSION_URL).await {
                UpdateStatus::UpToDate => ui::show_info(&format!("You are using the latest version ({VERSION}).")),
                UpdateStatus::Available { latest } => {
                    println!("Latest version available: {latest}");
                    println!("Your current version: {VERSION}");
                    ui::show_warning("A new version is available! Download it from GitHub.");
                }
                UpdateStatus::Unknown => ui::show_warning("Failed to check for updates."),
            },
        }

        Ok(())
    }
}

fn change_dir(invocation: &Invocation, dir: &Path, move_existing: bool) -> Result<()> {
    let config_path = invocation.config_path.as_deref().context("no configuration directory on this platform")?;

    let (store, moved) = invocation.store()?.relocate(dir, move_existing)?;

    let mut settings = invocation.settings.clone();
    settings.template_dir = Some(store.dir().to_path_buf());
    settings.save(config_path).context("cannot save the configuration")?;

    if move_existing {
        ui::show_info(&format!("{moved} template(s) moved."));
    }
    ui::show_info(&format!("Template directory changed to {}", store.dir().display()));

    if env::var_os(TEMPLATE_DIR_ENV).is_some() {
        ui::show_warning(&format!("{TEMPLATE_DIR_ENV} is set and still takes precedence."));
    }

    Ok(())
}
