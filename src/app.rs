use crate::cli::Cli;
use crate::commands;
use crate::config::Config;
use crate::state::AppState;
use crate::types::Reply;
use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "photoshare_lib=warn";

/// `PHOTOSHARE_LOG`, then `RUST_LOG`, then the config file. Logs go to stderr;
/// stdout carries only the JSON reply.
fn init_tracing(config: &Config) {
  let directive = std::env::var("PHOTOSHARE_LOG")
    .or_else(|_| std::env::var("RUST_LOG"))
    .ok()
    .or_else(|| config.log.filter.clone())
    .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
  let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

fn print_reply(reply: &Reply<Value>, pretty: bool) -> anyhow::Result<()> {
  let text = if pretty {
    serde_json::to_string_pretty(reply)?
  } else {
    serde_json::to_string(reply)?
  };
  let mut stdout = std::io::stdout().lock();
  writeln!(stdout, "{text}").context("failed to write reply")?;
  Ok(())
}

fn try_run(cli: Cli) -> anyhow::Result<ExitCode> {
  let Cli {
    config: config_path,
    api_url,
    pretty,
    command,
  } = cli;

  let mut config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
  if let Some(url) = api_url {
    config.api.base_url = url;
    config.validate().context("invalid --api-url")?;
  }
  init_tracing(&config);

  let runtime = tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
    .context("failed to start async runtime")?;

  runtime.block_on(async move {
    let state = AppState::from_config(config).context("failed to initialize client")?;
    let session = state.session.restore();
    tracing::debug!(?session, "session restored");

    let reply = commands::dispatch(&state, command).await;
    print_reply(&reply, pretty)?;
    let code = if reply.is_ok() {
      ExitCode::SUCCESS
    } else {
      ExitCode::FAILURE
    };
    Ok::<_, anyhow::Error>(code)
  })
}

pub fn run() -> ExitCode {
  match try_run(Cli::parse()) {
    Ok(code) => code,
    Err(e) => {
      eprintln!("photoshare: {e:#}");
      ExitCode::FAILURE
    }
  }
}
