//! dbvault operator CLI and daemon entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dbvault::{Scheduler, Vault, VaultConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daily backup scheduler in the foreground
    Run,
    /// Create a snapshot of the primary database now
    Snapshot,
    /// List local snapshots
    List {
        #[arg(long)]
        json: bool,
    },
    /// Verify a snapshot (filename in the backup directory, or a path)
    Verify { file: String },
    /// Delete a local snapshot
    Delete { file: String },
    /// Restore the primary database from a snapshot
    Restore { file: String },
    /// Prune local snapshots older than the retention window
    Prune {
        /// Override the configured retention window
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show local snapshot statistics
    Stats,
    /// Remote store operations
    Remote {
        #[command(subcommand)]
        command: RemoteCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RemoteCommand {
    /// List snapshots in the remote folder
    List,
    /// Upload a local snapshot
    Upload { file: String },
    /// Download a remote snapshot by id
    Download { id: String, dest: PathBuf },
    /// Delete a remote snapshot by id
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = VaultConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .init();

    let vault = Arc::new(Vault::new(config));

    match cli.command {
        Command::Run => run_daemon(vault).await?,
        Command::Snapshot => {
            let rec = vault.create_snapshot()?;
            println!(
                "{}  {} bytes  verified={}",
                rec.filename, rec.size, rec.verified
            );
        }
        Command::List { json } => {
            let records = vault.list_local()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for rec in records {
                    println!(
                        "{}  {} bytes  verified={}",
                        rec.filename, rec.size, rec.verified
                    );
                }
            }
        }
        Command::Verify { file } => {
            let path = resolve(&vault, &file);
            let ok = vault.verify(&path);
            println!("{}: {}", path.display(), if ok { "ok" } else { "FAILED" });
            if !ok {
                std::process::exit(1);
            }
        }
        Command::Delete { file } => {
            vault.delete_local(&file)?;
            println!("deleted {file}");
        }
        Command::Restore { file } => {
            let safety = vault.restore(&file)?;
            println!("restored from {file}");
            println!("safety snapshot: {}", safety.filename);
            println!("note: restart anything holding the database open");
        }
        Command::Prune { days } => {
            let days = days.unwrap_or(vault.config().retention_days);
            let pruned = vault.prune_older_than(days)?;
            println!("pruned {pruned} snapshot(s) older than {days} day(s)");
        }
        Command::Stats => {
            let stats = vault.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Remote { command } => match command {
            RemoteCommand::List => {
                for entry in vault.list_remote().await {
                    println!("{}  {}  {} bytes", entry.id, entry.name, entry.size);
                }
            }
            RemoteCommand::Upload { file } => {
                let path = resolve(&vault, &file);
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.clone());
                match vault.upload_remote(&path, &name).await {
                    Some(id) => println!("uploaded as {id}"),
                    None => {
                        println!("upload failed (see logs)");
                        std::process::exit(1);
                    }
                }
            }
            RemoteCommand::Download { id, dest } => {
                if vault.download_remote(&id, &dest).await {
                    println!("downloaded to {}", dest.display());
                } else {
                    println!("download failed (see logs)");
                    std::process::exit(1);
                }
            }
            RemoteCommand::Delete { id } => {
                if vault.delete_remote(&id).await {
                    println!("deleted {id}");
                } else {
                    println!("delete failed (see logs)");
                    std::process::exit(1);
                }
            }
        },
    }

    Ok(())
}

/// Bare snapshot names resolve inside the backup directory; anything with a
/// path separator is taken as-is.
fn resolve(vault: &Vault, file: &str) -> PathBuf {
    if file.contains(['/', '\\']) {
        PathBuf::from(file)
    } else {
        vault.config().backup_dir.join(file)
    }
}

async fn run_daemon(vault: Arc<Vault>) -> Result<()> {
    tracing::info!(
        db = %vault.config().db_path.display(),
        backups = %vault.config().backup_dir.display(),
        "Starting dbvault v{}",
        env!("CARGO_PKG_VERSION"),
    );

    let scheduler = Scheduler::start(vault);
    shutdown_signal().await;

    tracing::info!("Shutting down...");
    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
