mod batch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indy_config::IndyConfig;

use crate::batch::{BatchSummary, FileStatus, Mode};

#[derive(Parser)]
#[command(
    name = "indy",
    version,
    about = "Migrates ByteBuddy advice to the @Advice.AssignReturned style"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate every advice class under a directory (prints diffs unless --write)
    Migrate(MigrateArgs),
    /// Fail if any file under a directory still needs migrating
    Check(CheckArgs),
}

#[derive(Args)]
struct MigrateArgs {
    /// Source tree to migrate
    path: PathBuf,
    /// Write migrated files back instead of printing diffs
    #[arg(long)]
    write: bool,
    /// Emit the summary as JSON
    #[arg(long)]
    json: bool,
    /// Config file (defaults to `indy.toml` in the source tree)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Source tree to check
    path: PathBuf,
    /// Emit the summary as JSON
    #[arg(long)]
    json: bool,
    /// Config file (defaults to `indy.toml` in the source tree)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Migrate(args) => {
            let config = load_config(&args.path, args.config.as_deref())?;
            let mode = if args.write { Mode::Write } else { Mode::Diff };
            let summary = batch::run(&args.path, &config, mode)?;
            if mode == Mode::Diff && !args.json {
                for file in &summary.files {
                    if let Some(diff) = &file.diff {
                        print!("{diff}");
                    }
                }
            }
            print_summary(&summary, args.json)?;
            Ok(if summary.failed > 0 { 1 } else { 0 })
        }
        Command::Check(args) => {
            let config = load_config(&args.path, args.config.as_deref())?;
            let summary = batch::run(&args.path, &config, Mode::Check)?;
            if !args.json {
                for file in &summary.files {
                    if file.status == FileStatus::Migrated {
                        println!("needs migration: {}", file.path.display());
                    }
                }
            }
            print_summary(&summary, args.json)?;
            let exit = if summary.migrated > 0 || summary.failed > 0 {
                1
            } else {
                0
            };
            Ok(exit)
        }
    }
}

fn load_config(root: &Path, explicit: Option<&Path>) -> Result<IndyConfig> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }
    let (config, path) = match explicit {
        Some(path) => {
            let config = IndyConfig::load_from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            (config, Some(path.to_path_buf()))
        }
        None => indy_config::load_for_root(root)
            .with_context(|| format!("failed to load config for {}", root.display()))?,
    };
    indy_config::init_tracing(&config.logging);
    if let Some(path) = path {
        tracing::debug!(target = "indy.cli", config = %path.display(), "using config file");
    }
    Ok(config)
}

fn print_summary(summary: &BatchSummary, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(summary)?;
        println!("{out}");
        return Ok(());
    }

    for file in &summary.files {
        if let Some(error) = &file.error {
            eprintln!("error: {}: {error}", file.path.display());
        }
    }
    println!("summary:");
    println!("  files_scanned: {}", summary.files_scanned);
    println!("  migrated: {}", summary.migrated);
    println!("  unchanged: {}", summary.unchanged);
    println!("  failed: {}", summary.failed);
    Ok(())
}
