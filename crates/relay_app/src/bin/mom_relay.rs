use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chat_session::cancel_signal;
use clap::Parser;
use relay_app::config::DEFAULT_CONFIG_FILE;
use relay_app::logging::init_logging;
use relay_app::setup::{build_pipeline, build_session};
use relay_app::{RelayConfig, RelayError, RunOptions};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "mom_relay",
    version,
    about = "Rewrite spreadsheet meeting notes into minutes and post them to a WhatsApp group."
)]
struct Args {
    /// JSON configuration file (default: ./mom_relay.json when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Read a saved `spreadsheets.get` response instead of calling the Sheets API.
    #[arg(long, value_name = "PATH")]
    grid_file: Option<PathBuf>,

    /// Directory for the `MoM_*.md` copies.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Target conversation title.
    #[arg(long)]
    conversation: Option<String>,

    /// Stop after writing the markdown copy; print the chunks instead of sending.
    #[arg(long)]
    dry_run: bool,

    /// Skip the language model and send the notes as written.
    #[arg(long)]
    passthrough: bool,

    /// Debug logging (overridden by MOM_RELAY_LOG).
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            grid_file: self.grid_file.clone(),
            output_dir: self.output_dir.clone(),
            conversation: self.conversation.clone(),
            dry_run: self.dry_run,
            passthrough: self.passthrough,
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<RelayConfig> {
    match explicit {
        Some(path) => RelayConfig::load(path)
            .map_err(RelayError::from)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            RelayConfig::load(Path::new(DEFAULT_CONFIG_FILE))
                .map_err(RelayError::from)
                .with_context(|| format!("loading configuration from {DEFAULT_CONFIG_FILE}"))
        }
        None => Ok(RelayConfig::default()),
    }
}

fn run(args: &Args) -> Result<()> {
    let options = args.run_options();
    let mut config = load_config(args.config.as_deref())?;
    options.apply(&mut config);
    config
        .validate(options.dry_run)
        .map_err(RelayError::from)
        .context("invalid configuration")?;

    let cancel = cancel_signal();
    #[cfg(unix)]
    let _signals = relay_app::signals::cancel_on_signal(cancel.clone())
        .context("installing interrupt handlers")?;

    let pipeline = build_pipeline(&config, options.dry_run)?;

    if options.dry_run {
        let (prepared, report) = pipeline.dry_run(&cancel)?;
        for chunk in &prepared.chunks {
            println!("----- chunk {} of {} -----", chunk.index + 1, report.chunk_count);
            println!("{}", chunk.text);
        }
        info!(
            artifact = %report.artifact.display(),
            chunks = report.chunk_count,
            "dry run finished"
        );
        return Ok(());
    }

    let mut session = build_session(&config)?;
    let report = pipeline.run(&mut session, &cancel)?;
    info!(
        artifact = %report.artifact.display(),
        sent = report.chunks_sent,
        conversation = %config.delivery.conversation,
        "minutes delivered"
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let stage = err
                .downcast_ref::<RelayError>()
                .map(|relay| relay.stage().as_str())
                .unwrap_or("setup");
            error!(stage, "{err:#}");
            let cancelled = err
                .downcast_ref::<RelayError>()
                .is_some_and(RelayError::is_cancelled);
            if cancelled {
                ExitCode::from(130)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
