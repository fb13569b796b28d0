mod api;
mod cache;
mod commands;
mod config;
mod logging;
mod render;
mod shell;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "examkit")]
#[command(about = "A terminal client for exam authoring, grading and appeals")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/examkit/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend base URL, overriding the config file
  #[arg(long)]
  url: Option<String>,

  /// Always go to the backend, never reuse cached responses
  #[arg(long)]
  no_cache: bool,

  /// Run one command (e.g. `grades s-104`) instead of starting the shell
  #[arg(trailing_var_arg = true)]
  command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line overrides
  if let Some(url) = args.url {
    config.backend.url = url;
  }
  if args.no_cache {
    config.cache.enabled = false;
  }

  let _log_guard = logging::init(&config.log)?;

  // One cache for the whole process, handed to the client
  let cache = cache::ApiCache::new().with_default_ttl(config.cache.default_ttl());
  let shell = shell::Shell::new(config, cache)?;

  if args.command.is_empty() {
    shell.run().await?;
  } else {
    shell.run_once(&args.command.join(" ")).await?;
  }

  Ok(())
}
