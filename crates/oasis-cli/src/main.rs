//! Oasis CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use oasis_core::Settings;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "oasis")]
#[command(about = "Per-commit preview environments on the local Docker daemon", long_about = None)]
struct Cli {
    /// Name prefix for derived containers, images and workspaces
    #[arg(long)]
    app: Option<String>,

    /// Directory holding per-commit checkouts
    #[arg(long)]
    workspaces_dir: Option<PathBuf>,

    /// Base URL repositories are cloned from
    #[arg(long)]
    git_base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and launch the preview for a commit, following its log
    Preview {
        /// Repository owner
        #[arg(long)]
        owner: String,
        /// Repository name
        #[arg(long)]
        repo: String,
        /// Commit hash (full or short)
        #[arg(long)]
        commit: String,
    },
    /// Report the container state of a commit's preview
    Status {
        /// Repository owner
        #[arg(long)]
        owner: String,
        /// Repository name
        #[arg(long)]
        repo: String,
        /// Commit hash (full or short)
        #[arg(long)]
        commit: String,
    },
}

impl Cli {
    /// Environment-derived settings with command-line overrides applied.
    fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        if let Some(app) = &self.app {
            settings.app_name = app.clone();
        }
        if let Some(dir) = &self.workspaces_dir {
            settings.workspaces_root = dir.clone();
        }
        if let Some(base) = &self.git_base_url {
            settings.git_base_url = base.clone();
        }
        settings
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Workers log through tracing; default to warnings only so the build
    // log printed by `preview` stays readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();

    match cli.command {
        Commands::Preview {
            owner,
            repo,
            commit,
        } => {
            commands::preview::run(settings, owner, repo, commit).await?;
        }
        Commands::Status {
            owner,
            repo,
            commit,
        } => {
            commands::status::run(settings, owner, repo, commit).await?;
        }
    }

    Ok(())
}
