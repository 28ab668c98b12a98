// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use podservice::{MetadataStore, Settings, UrlQueue, default_config_path, resolve_config_path};

/// Turn local audio and video links into a podcast feed
#[derive(Parser, Debug)]
#[command(name = "podservice")]
#[command(about = "Serve a podcast feed built from uploads and downloaded videos")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server and URL watcher (default)
    Serve,
    /// Write a config file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show the effective configuration and stored episodes
    Info,
}

fn config_path(args: &Args) -> Option<PathBuf> {
    args.config.clone().or_else(resolve_config_path)
}

fn init_logging(settings: &Settings, verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        settings
            .log_level
            .as_str()
            .parse()
            .unwrap_or(LevelFilter::INFO)
    };

    // Fails only when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init();
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let Some(path) = path.or_else(default_config_path) else {
        bail!("Cannot determine a config location, pass --config");
    };

    if path.exists() && !force {
        bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Settings::default()
        .save(&path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    println!(
        "{} {}",
        "Created config file:".bold().green(),
        path.display().to_string().cyan()
    );
    Ok(())
}

fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<14} {}", format!("{}:", label).dimmed(), value);
}

fn print_dir(label: &str, path: &Path) {
    let shown = path.display().to_string();
    if path.is_dir() {
        print_field(label, shown.cyan());
    } else {
        print_field(label, format!("{} {}", shown.cyan(), "(missing)".yellow()));
    }
}

async fn show_info(settings: &Settings, path: Option<&Path>) -> Result<()> {
    println!(
        "\n{} {}\n",
        "podservice".bold().magenta(),
        env!("CARGO_PKG_VERSION").dimmed()
    );

    match path {
        Some(path) if path.is_file() => print_field("Config", path.display().to_string().cyan()),
        Some(path) => print_field(
            "Config",
            format!("{} {}", path.display(), "(not found, using defaults)".yellow()),
        ),
        None => print_field("Config", "defaults".yellow()),
    }
    print_field("Podcast", settings.podcast.title.bold());
    print_field(
        "Feed",
        format!("{}/feed.xml", settings.server.base_url.trim_end_matches('/')).cyan(),
    );
    print_field(
        "Listen",
        format!("{}:{}", settings.server.host, settings.server.port),
    );

    let storage = &settings.storage;
    print_dir("Audio", &storage.audio_dir());
    print_dir("Metadata", &storage.metadata_dir());
    print_dir("Thumbnails", &storage.thumbnails_dir());

    let store = MetadataStore::new(storage.metadata_dir(), &settings.server.base_url);
    let mut episodes = store.load_all();
    episodes.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
    print_field("Episodes", episodes.len().to_string().green().bold());

    if settings.watch.enabled {
        let queue = UrlQueue::new(&settings.watch.file);
        let pending = queue
            .read_urls()
            .await
            .context("Failed to read URL file")?;
        print_field(
            "Watching",
            format!(
                "{} ({} pending)",
                settings.watch.file.display().to_string().cyan(),
                pending.len().to_string().yellow()
            ),
        );
    } else {
        print_field("Watching", "disabled".yellow());
    }

    if !episodes.is_empty() {
        println!("\n{}", "Latest episodes:".bold());
        for episode in episodes.iter().take(10) {
            println!(
                "  {} {}",
                episode.pub_date.format("%Y-%m-%d").to_string().dimmed(),
                episode.title
            );
        }
    }
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let path = config_path(&args);

    if let Some(Command::Init { force }) = args.command {
        return init_config(path, force);
    }

    let settings = Settings::load(path.as_deref())
        .with_context(|| match &path {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load config".to_string(),
        })?;

    match args.command {
        Some(Command::Info) => show_info(&settings, path.as_deref()).await,
        _ => {
            init_logging(&settings, args.verbose);
            podservice::run(settings)
                .await
                .context("Service failed")
        }
    }
}
