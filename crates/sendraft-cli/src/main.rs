use miette::{IntoDiagnostic, Result, WrapErr};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sendraft_common::telemetry::{self, TelemetryConfig};
use sendraft_common::{Config, FileStore, ReqwestClient, ResizeMode};
use sendraft_renderer::{Pipeline, VaultStore};

use clap::{Parser, Subcommand};

mod notice;

use notice::Notice;

#[derive(Parser)]
#[command(version, about = "Sendraft - send markdown notes to Buttondown as drafts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the settings file (.json or .toml)
    #[arg(long, global = true, env = "SENDRAFT_CONFIG")]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a note's images and create a draft email from it
    Draft {
        /// Markdown file to send
        file: PathBuf,

        /// Email subject, defaults to the file name
        #[arg(long)]
        title: Option<String>,

        /// Directory that image links resolve against, defaults to the note's directory
        #[arg(long)]
        vault: Option<PathBuf>,

        /// Write the rewritten body to stdout
        #[arg(long)]
        print: bool,
    },
    /// Show or change the stored settings
    Config {
        /// Buttondown API key
        #[arg(long)]
        api_key: Option<String>,

        /// Which side the resize limit applies to: longest, width or height
        #[arg(long)]
        side: Option<ResizeMode>,

        /// Resize limit in pixels
        #[arg(long)]
        limit: Option<NonZeroU32>,

        /// API base URL
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_miette();

    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    telemetry::init(TelemetryConfig::from_env("sendraft").with_level(level));

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let store = FileStore::new(config_path);

    match cli.command {
        Commands::Draft {
            file,
            title,
            vault,
            print,
        } => {
            let published = send_draft(&store, &file, title, vault, print).await?;
            Ok(if published {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Config {
            api_key,
            side,
            limit,
            endpoint,
        } => {
            edit_config(&store, api_key, side, limit, endpoint).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Prints notices to stdout, or to stderr when stdout carries the document.
struct Console {
    stdout_is_document: bool,
}

impl Console {
    fn notice(&self, notice: &Notice) {
        if self.stdout_is_document || notice.is_error() {
            eprintln!("{notice}");
        } else {
            println!("{notice}");
        }
    }
}

async fn send_draft(
    store: &FileStore,
    file: &Path,
    title: Option<String>,
    vault: Option<PathBuf>,
    print: bool,
) -> Result<bool> {
    let console = Console {
        stdout_is_document: print,
    };
    let config = Config::load(store).await?.with_env_overrides()?;
    tracing::debug!(?config, "loaded settings");
    if !config.has_api_key() {
        console.notice(&Notice::MissingKey);
        return Ok(false);
    }

    let body = tokio::fs::read_to_string(file)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("could not read {}", file.display()))?;
    let title = title.unwrap_or_else(|| default_title(file));
    let vault_root = vault.unwrap_or_else(|| default_vault(file));

    let vault = VaultStore::open(&vault_root)?;
    tracing::debug!(root = %vault.root().display(), files = vault.contents().len(), "opened vault");

    let client = ReqwestClient::new(config.endpoint.as_str());
    let pipeline = Pipeline::new(&config, vault, client);

    let result = pipeline.run(&title, &body).await?;

    for report in &result.references {
        for notice in notice::for_reference(report) {
            console.notice(&notice);
        }
    }
    console.notice(&notice::for_publish(&result.publish));

    if print {
        print!("{}", result.body);
    }

    Ok(result.is_published())
}

fn default_title(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn default_vault(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn edit_config(
    store: &FileStore,
    api_key: Option<String>,
    side: Option<ResizeMode>,
    limit: Option<NonZeroU32>,
    endpoint: Option<String>,
) -> Result<()> {
    let mut config = Config::load(store).await?;
    let changed = api_key.is_some() || side.is_some() || limit.is_some() || endpoint.is_some();

    if let Some(key) = api_key {
        config.api_key = key.trim().to_owned();
    }
    if let Some(side) = side {
        config.side_preference = side;
    }
    if let Some(limit) = limit {
        config.resize_limit = limit;
    }
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }

    if changed {
        config.save(store).await?;
        println!("✓ Saved settings to {}", store.path().display());
    } else {
        println!("Settings file: {}", store.path().display());
    }
    println!("{}", describe(&config));
    Ok(())
}

fn describe(config: &Config) -> String {
    let key = if config.has_api_key() {
        "set"
    } else {
        "not set"
    };
    format!(
        "  API key:  {key}\n  Resize:   {} side to {}px\n  Endpoint: {}",
        config.side_preference, config.resize_limit, config.endpoint
    )
}

fn init_miette() {
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    miette::set_panic_hook();
}
