use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use heatprof::{
    commands,
    config::Config,
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "heatprof")]
#[command(about = "Need for Speed Heat profile switcher - keep several save games side by side")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Installation root to use instead of the configured one
    #[arg(long, global = true, value_name = "DIR")]
    save_path: Option<PathBuf>,

    /// Log each step of an operation to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved profiles
    List {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active profile and the live save folders
    Current,

    /// Switch the live save data to a saved profile
    Use {
        /// Name of the profile to activate
        name: String,

        /// Print the switch result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Snapshot the live save data into a profile
    Save {
        /// Profile to save as (defaults to the active profile)
        name: Option<String>,
    },

    /// Rename a saved profile
    Rename {
        old_name: String,
        new_name: String,
    },

    /// Delete a saved profile
    Remove {
        name: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Clear the live save data and start a new profile
    Fresh {
        name: String,

        /// Discard unsaved live data without asking
        #[arg(long)]
        force: bool,
    },

    /// Show or change the installation root
    Path {
        #[command(subcommand)]
        action: Option<PathAction>,
    },

    /// Run diagnostics on the installation
    Doctor,

    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PathAction {
    /// Set the installation root; profiles move to <dir>/Profiles
    Set { dir: String },
}

fn init_logging(verbose: bool) {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = if verbose {
        EnvFilter::new("heatprof=debug")
    } else {
        EnvFilter::try_from_env("HEATPROF_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry().with(layer).with(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ui = Ui::new(cli.color, cli.no_color);

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "heatprof", &mut std::io::stdout());
        return Ok(());
    }

    let config_path = Config::default_path();
    let config = match &config_path {
        Some(path) => Config::read(path)?,
        None => Config::default(),
    };

    if let Commands::Path {
        action: Some(PathAction::Set { dir }),
    } = &cli.command
    {
        let config_path = config_path.context("No config directory available on this platform")?;
        return commands::set_path(&config_path, dir, &ui);
    }

    let paths = Paths::resolve(&config, cli.save_path.as_deref())?;

    match cli.command {
        Commands::List { json } => commands::list(&paths, &ui, json),
        Commands::Current => commands::current(&paths, &ui),
        Commands::Use { name, json } => commands::use_profile(&paths, &name, &ui, json),
        Commands::Save { name } => commands::save(&paths, name.as_deref(), &ui),
        Commands::Rename { old_name, new_name } => {
            commands::rename(&paths, &old_name, &new_name, &ui)
        }
        Commands::Remove { name, force } => commands::remove(&paths, &name, &ui, force),
        Commands::Fresh { name, force } => commands::fresh(&paths, &name, &ui, force),
        Commands::Path { .. } => commands::show_path(&paths, config_path.as_deref(), &ui),
        Commands::Doctor => commands::doctor(&paths, &ui),
        Commands::Completions { .. } => Ok(()),
    }
}
