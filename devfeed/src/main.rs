//! Terminal client for the developer matching feed.
//!
//! `devfeed swipe` runs an interactive session against the configured
//! backend; `devfeed peek` prints one raw page; `devfeed config` shows or
//! initialises `devfeed.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use devfeed::core::types::PAGE_SIZE;
use devfeed::exit_codes;
use devfeed::io::api::ApiClient;
use devfeed::io::config::{DEFAULT_CONFIG_FILE, FeedConfig, load_config, write_config};
use devfeed::io::credentials::SessionCredentials;
use devfeed::io::profile_source::ProfileSource;
use devfeed::session::spawn_session;
use devfeed::swipe::run_swipe;

#[derive(Parser)]
#[command(name = "devfeed", version, about = "Swipe through developer profiles")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session: decide on developers one card at a time.
    Swipe,
    /// Fetch one page of the feed and print it as JSON.
    Peek {
        /// Page number (1-based).
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Print the resolved config, or write the default one.
    Config {
        /// Write the default config file.
        #[arg(long)]
        init: bool,
        /// Overwrite an existing file with `--init`.
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    devfeed::logging::init();
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Swipe => cmd_swipe(&cli.config).await,
        Command::Peek { page } => cmd_peek(&cli.config, page).await,
        Command::Config { init, force } => cmd_config(&cli.config, init, force),
    }
}

async fn cmd_swipe(config_path: &Path) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let api = api_client(&cfg)?;
    info!(
        base_url = api.base_url(),
        user_id = api.user_id().unwrap_or("unknown"),
        "starting swipe session"
    );

    let handle = spawn_session(api.clone(), api, cfg.controller_options());
    let input = BufReader::new(tokio::io::stdin());
    let summary = run_swipe(&handle, input, tokio::io::stdout()).await?;
    handle.shutdown().await;

    println!("liked {}, passed {}", summary.liked, summary.passed);
    Ok(exit_codes::OK)
}

async fn cmd_peek(config_path: &Path, page: u32) -> Result<i32> {
    if page == 0 {
        bail!("--page must be >= 1");
    }
    let cfg = load_config(config_path)?;
    let api = api_client(&cfg)?;
    let profiles = api
        .fetch_page(page, PAGE_SIZE)
        .await
        .with_context(|| format!("fetch page {}", page))?;

    let json = serde_json::to_string_pretty(&profiles).context("serialize profiles")?;
    println!("{}", json);
    if profiles.is_empty() {
        return Ok(exit_codes::EXHAUSTED);
    }
    Ok(exit_codes::OK)
}

fn cmd_config(config_path: &Path, init: bool, force: bool) -> Result<i32> {
    if init {
        if config_path.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            );
        }
        write_config(config_path, &FeedConfig::default())?;
        println!("wrote {}", config_path.display());
        return Ok(exit_codes::OK);
    }

    let cfg = load_config(config_path)?;
    let rendered = toml::to_string_pretty(&cfg).context("serialize config")?;
    print!("{}", rendered);
    Ok(exit_codes::OK)
}

fn api_client(cfg: &FeedConfig) -> Result<ApiClient> {
    let credentials = SessionCredentials::resolve(&cfg.session);
    if !credentials.is_authenticated() {
        bail!(
            "no session token: set session.token in the config or {}",
            devfeed::io::credentials::TOKEN_ENV
        );
    }
    ApiClient::new(cfg, credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_swipe_with_default_config() {
        let cli = Cli::parse_from(["devfeed", "swipe"]);
        assert!(matches!(cli.command, Command::Swipe));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn parse_peek_page() {
        let cli = Cli::parse_from(["devfeed", "--config", "x.toml", "peek", "--page", "3"]);
        assert!(matches!(cli.command, Command::Peek { page: 3 }));
        assert_eq!(cli.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn parse_config_init_force() {
        let cli = Cli::parse_from(["devfeed", "config", "--init", "--force"]);
        assert!(matches!(
            cli.command,
            Command::Config {
                init: true,
                force: true
            }
        ));
    }
}
