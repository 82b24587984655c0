//! pulpdeploy entry point.

mod config;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use pulpdeploy_api::{PulpClient, normalize_server};
use pulpdeploy_publish::{Publisher, SyncOutcome};
use pulpdeploy_transfer::{DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS, UploadConfig};
use tracing_subscriber::EnvFilter;

use crate::config::Credentials;

#[derive(Debug, Parser)]
#[clap(name = "pulpdeploy", version, about = "Upload, publish and distribute RPM packages on Pulp 3")]
struct Args {
    /// Credentials file.
    ///
    /// Defaults to `~/.pulp/admin.conf`.
    #[clap(long, env = "PULPDEPLOY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log verbosity: once for "debug", twice for "trace".
    ///
    /// `RUST_LOG` takes precedence when set.
    #[clap(long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check the server and save the credentials.
    Config {
        #[clap(short, long)]
        user: String,
        #[clap(short, long)]
        pass: String,
        /// Server URL, e.g. `https://pulp.example.com`.
        url: String,
    },
    /// Add a package to a repository, then publish and distribute it.
    Add {
        #[clap(short, long)]
        repo: String,
        package: PathBuf,
        /// Chunk size in bytes; smaller files are uploaded in one request.
        #[clap(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
        /// Concurrent chunk uploads.
        #[clap(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },
    /// Remove a package from a repository (`-r REPO PKG`) or delete a
    /// publication (`-v N REPO`).
    Del {
        #[clap(short, long, conflicts_with = "version", required_unless_present = "version")]
        repo: Option<String>,
        #[clap(short, long)]
        version: Option<u64>,
        /// Package file name with `-r`, repository with `-v`.
        target: String,
    },
    /// List repositories, publications (`-v`) or active distributions (`-d`).
    List {
        #[clap(short, long, conflicts_with = "distributions", requires = "repo")]
        versions: bool,
        #[clap(short, long, requires = "repo")]
        distributions: bool,
        repo: Option<String>,
    },
    /// Point a distribution (`<repo>-<env>`) at a publication version.
    Set {
        #[clap(short, long)]
        version: u64,
        distribution: String,
    },
    /// Delete orphaned content and artifacts.
    Clean,
    /// Sync a repository with its remote, then publish and distribute it.
    Sync { repo: String },
    /// Print the program version.
    Version,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    if let Command::Version = args.cmd {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let path = match args.config {
        Some(path) => path,
        None => config::default_path()?,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(execute(args.cmd, &path))
}

async fn execute(cmd: Command, config_path: &Path) -> anyhow::Result<()> {
    if let Command::Config { user, pass, url } = cmd {
        return configure(config_path, user, pass, &url).await;
    }

    let creds = Credentials::load(config_path)?;
    let client = PulpClient::new(creds.client_config())?;
    let publisher = Publisher::new(&client);
    publisher.ensure_online().await?;

    match cmd {
        Command::Add {
            repo,
            package,
            chunk_size,
            workers,
        } => {
            let upload = UploadConfig {
                chunk_size,
                workers,
                ..UploadConfig::default()
            };
            let publisher = publisher.with_upload_config(upload);
            let added = publisher.add_package(&repo, &package).await?;
            if let Some(report) = added.chunked {
                tracing::info!(chunks = report.chunks, bytes = report.bytes, "chunked upload finished");
            }
            println!("Content added to repository.");
            print_lines(output::released(&publisher.release(&repo).await?));
        }
        Command::Del {
            repo: Some(repo),
            target,
            ..
        } => {
            publisher.repository(&repo).await?;
            publisher.remove_package(&repo, &target).await?;
            println!("Content removed from repository.");
            print_lines(output::released(&publisher.release(&repo).await?));
        }
        Command::Del {
            version: Some(version),
            target,
            ..
        } => {
            publisher.delete_publication(&target, version).await?;
            println!("Publication version {version} deleted from repository {target}.");
        }
        Command::Del { .. } => bail!("either -r or -v is required"),
        Command::List {
            versions: true,
            repo: Some(repo),
            ..
        } => {
            for publication in publisher.publications(&repo).await? {
                println!("{}", output::publication(&repo, &publication));
            }
        }
        Command::List {
            distributions: true,
            repo: Some(repo),
            ..
        } => {
            for active in publisher.active_distributions(&repo).await? {
                println!("{}", output::active_distribution(&active));
            }
        }
        Command::List { .. } => {
            for name in publisher.repository_names().await? {
                println!("{name}");
            }
        }
        Command::Set {
            version,
            distribution,
        } => {
            publisher.set_version(&distribution, version).await?;
            println!("Distribution {distribution} set to version {version}.");
        }
        Command::Clean => {
            for report in publisher.clean().await? {
                println!("{}", output::progress(&report));
            }
        }
        Command::Sync { repo } => {
            let outcome = publisher.sync(&repo).await?;
            println!("Repository {repo} synced with remote.");
            match outcome {
                SyncOutcome::AlreadyInSync => println!("Repository was already in sync."),
                SyncOutcome::Released(released) => print_lines(output::released(&released)),
            }
        }
        Command::Config { .. } | Command::Version => {}
    }
    Ok(())
}

/// Checks `url` with the given credentials and saves them on success.
async fn configure(path: &Path, user: String, pass: String, url: &str) -> anyhow::Result<()> {
    let url = normalize_server(url)?;
    let creds = Credentials { user, pass, url };

    let client = PulpClient::new(creds.client_config())?;
    let status = client
        .status()
        .await
        .with_context(|| format!("could not reach {}", creds.url))?;
    println!("Pulp API Status Check: {status}");
    if status != 200 {
        bail!("server {} refused the credentials, nothing saved", creds.url);
    }

    creds.save(path)?;
    println!("Credentials saved to '{}'", path.display());
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_defaults() {
        let args = Args::try_parse_from(["pulpdeploy", "add", "-r", "tools-co8-x86_64", "tool.rpm"]).unwrap();
        match args.cmd {
            Command::Add {
                chunk_size, workers, ..
            } => {
                assert_eq!(chunk_size, DEFAULT_CHUNK_SIZE);
                assert_eq!(workers, DEFAULT_WORKERS);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn del_needs_exactly_one_mode() {
        assert!(Args::try_parse_from(["pulpdeploy", "del", "repo"]).is_err());
        assert!(Args::try_parse_from(["pulpdeploy", "del", "-r", "repo", "-v", "2", "x"]).is_err());
        let args = Args::try_parse_from(["pulpdeploy", "del", "-v", "2", "repo"]).unwrap();
        assert!(matches!(
            args.cmd,
            Command::Del {
                version: Some(2),
                repo: None,
                ..
            }
        ));
    }

    #[test]
    fn list_flags_need_repository() {
        assert!(Args::try_parse_from(["pulpdeploy", "list", "-v"]).is_err());
        assert!(Args::try_parse_from(["pulpdeploy", "list", "-v", "-d", "repo"]).is_err());
        assert!(Args::try_parse_from(["pulpdeploy", "list", "-d", "repo"]).is_ok());
        assert!(Args::try_parse_from(["pulpdeploy", "list"]).is_ok());
    }

    #[test]
    fn global_config_path() {
        let args =
            Args::try_parse_from(["pulpdeploy", "clean", "--config", "/etc/pulp.conf"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/pulp.conf")));
    }
}
