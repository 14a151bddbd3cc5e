#![forbid(unsafe_code)]

//! `foothold-checkpoint`: save, restore and manage Foothold campaign
//! checkpoints for configured DCS servers.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use foothold_checkpoint::checkpoint::{CheckpointLabel, DeletePolicy, RestoreOptions};
use foothold_checkpoint::hooks::JsonlEventWriter;
use foothold_checkpoint::models::CheckpointMetadata;
use foothold_checkpoint::{AppError, CheckpointManager, GlobalConfig, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "foothold-checkpoint",
    about = "Checkpoint manager for DCS Foothold campaigns",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Suppress progress output.
    #[arg(long, short)]
    quiet: bool,

    /// Append checkpoint events as JSONL to files in this directory.
    #[arg(long)]
    event_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save one campaign (or all campaigns) from a server.
    Save {
        /// Server name from the configuration.
        #[arg(long)]
        server: String,
        /// Campaign to save.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        campaign: Option<String>,
        /// Save every campaign found on the server.
        #[arg(long)]
        all: bool,
        /// Short checkpoint name.
        #[arg(long)]
        name: Option<String>,
        /// Free-text comment.
        #[arg(long)]
        comment: Option<String>,
    },

    /// Restore a checkpoint into a server directory.
    Restore {
        /// Archive path, or a filename inside the checkpoints directory.
        archive: PathBuf,
        /// Server name from the configuration.
        #[arg(long)]
        server: String,
        /// Also restore the shared ranks file.
        #[arg(long)]
        restore_ranks: bool,
        /// Overwrite existing files without asking.
        #[arg(long, short)]
        yes: bool,
    },

    /// List checkpoints, most recent first.
    List {
        /// Only show checkpoints from this server.
        #[arg(long)]
        server: Option<String>,
        /// Only show checkpoints of this campaign.
        #[arg(long)]
        campaign: Option<String>,
    },

    /// Delete a checkpoint archive.
    Delete {
        /// Archive path, or a filename inside the checkpoints directory.
        archive: PathBuf,
        /// Delete without asking.
        #[arg(long, short)]
        force: bool,
    },

    /// Import a directory of loose campaign files as a checkpoint.
    Import {
        /// Directory holding the campaign files.
        source: PathBuf,
        /// Campaign to import.
        #[arg(long)]
        campaign: String,
        /// Server name recorded in the checkpoint.
        #[arg(long)]
        server: String,
        /// Short checkpoint name.
        #[arg(long)]
        name: Option<String>,
        /// Free-text comment.
        #[arg(long)]
        comment: Option<String>,
    },

    /// Show campaign files on a server that no configured campaign claims.
    Unknown {
        /// Server name from the configuration.
        #[arg(long)]
        server: String,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    let config = GlobalConfig::load_from_path(&args.config)?;
    info!(config = %args.config.display(), "configuration loaded");

    let mut manager = CheckpointManager::new(config);
    if let Some(dir) = args.event_log.clone() {
        manager = manager.with_observer(Box::new(JsonlEventWriter::new(dir)?));
    }

    run(&manager, args)
}

fn run(manager: &CheckpointManager, args: Cli) -> Result<()> {
    let quiet = args.quiet;
    let mut progress = |stage: &str, current: usize, total: usize| -> Result<()> {
        if !quiet {
            eprintln!("[{current}/{total}] {stage}");
        }
        Ok(())
    };

    match args.command {
        Command::Save {
            server,
            campaign,
            all,
            name,
            comment,
        } => {
            let label = label(name, comment);
            if all {
                let saved = manager.save_all(&server, &label, true, &mut progress)?;
                for (campaign, archive) in &saved {
                    println!("{campaign}: {}", archive.display());
                }
            } else {
                let campaign = campaign.ok_or_else(|| {
                    AppError::InvalidArgument("a campaign or --all is required".into())
                })?;
                let archive = manager.save(&server, &campaign, &label, &mut progress)?;
                println!("{}", archive.display());
            }
        }

        Command::Restore {
            archive,
            server,
            restore_ranks,
            yes,
        } => {
            let mut confirm = |files: &[String]| {
                println!("The following files will be overwritten:");
                for file in files {
                    println!("  {file}");
                }
                prompt_yes_no("Continue?")
            };
            let mut options = RestoreOptions::default()
                .with_ranks(restore_ranks)
                .with_progress(&mut progress);
            options = if yes {
                options.skip_overwrite_check()
            } else {
                options.with_confirmation(&mut confirm)
            };

            let written = manager.restore(&archive, &server, options)?;
            println!("restored {} file(s)", written.len());
        }

        Command::List { server, campaign } => {
            let summaries = manager.list(server.as_deref(), campaign.as_deref())?;
            if summaries.is_empty() {
                println!("no checkpoints found");
            }
            for summary in summaries {
                println!(
                    "{}  {}  {}  {}  {}{}",
                    summary.filename,
                    summary.campaign,
                    summary.server,
                    summary.created_at.format("%Y-%m-%d %H:%M:%S"),
                    summary.size_human,
                    summary
                        .name
                        .as_deref()
                        .map(|n| format!("  \"{n}\""))
                        .unwrap_or_default()
                );
            }
        }

        Command::Delete { archive, force } => {
            let mut confirm = |metadata: &CheckpointMetadata| {
                prompt_yes_no(&format!(
                    "Delete checkpoint of '{}' from '{}' ({})?",
                    metadata.campaign_name(),
                    metadata.server_name(),
                    metadata.created_at().format("%Y-%m-%d %H:%M:%S")
                ))
            };
            let policy = if force {
                DeletePolicy::Force
            } else {
                DeletePolicy::Confirm(&mut confirm)
            };
            match manager.delete(&archive, policy)? {
                Some(_) => println!("deleted {}", archive.display()),
                None => println!("kept {}", archive.display()),
            }
        }

        Command::Import {
            source,
            campaign,
            server,
            name,
            comment,
        } => {
            let label = label(name, comment);
            let report = manager.import(&source, &campaign, &server, &label, &mut progress)?;
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            println!("{}", report.archive.display());
        }

        Command::Unknown { server } => {
            let unknown = manager.unknown_files(&server)?;
            if unknown.is_empty() {
                println!("all campaign files on '{server}' are configured");
            } else {
                for file in &unknown {
                    println!("{file}");
                }
                println!();
                print!("{}", manager.config_suggestion(&server)?);
            }
        }
    }

    Ok(())
}

fn label(name: Option<String>, comment: Option<String>) -> CheckpointLabel {
    CheckpointLabel {
        created_at: None,
        name,
        comment,
    }
}

/// Ask a yes/no question on stdout; anything but `y`/`yes` is a no.
fn prompt_yes_no(question: &str) -> bool {
    print!("{question} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
