use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use userdeck::api::DirectoryApi;
use userdeck::cli::{Cli, Command};
use userdeck::clipboard::SystemClipboard;
use userdeck::commands::page::Format;
use userdeck::error::exit_code;
use userdeck::logging::{self, LogTarget};
use userdeck::query::QueryClient;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(deck_err) = e.downcast_ref::<userdeck::Error>() {
                ExitCode::from(deck_err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Validate CLI arguments
    cli.validate()
        .map_err(userdeck::Error::InvalidArgument)
        .context("Invalid arguments")?;

    if let Some(Command::Completions { shell }) = &cli.command {
        use clap::CommandFactory;
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "userdeck", &mut std::io::stdout());
        return Ok(());
    }

    // The viewer owns the terminal, so it only logs to a file
    let target = match (&cli.command, cli.log_file.as_deref()) {
        (_, Some(path)) => LogTarget::File(path),
        (None, None) => LogTarget::Discard,
        (Some(_), None) => LogTarget::Stderr,
    };
    logging::init(target, cli.verbose).context("Failed to open log file")?;

    let config = cli.config()?;
    tracing::debug!(base_url = %config.base_url, "configured");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let api: Arc<dyn DirectoryApi> = Arc::new(userdeck::api::client(&config)?);

    match cli.command {
        Some(Command::Page { page, json, csv }) => {
            userdeck::commands::page::run(api.as_ref(), &runtime, page, Format::from_flags(json, csv))?;
        }
        Some(Command::Claim { id, page }) => {
            let mut clipboard = SystemClipboard::new();
            userdeck::commands::claim::run(api, &runtime, &mut clipboard, page, &id)?;
        }
        Some(Command::Completions { .. }) => unreachable!("handled above"),
        None => {
            let client = QueryClient::new(api, runtime.handle().clone(), config.stale_time);
            userdeck::tui::run(client, Box::new(SystemClipboard::new()), cli.page)?;
        }
    }

    Ok(())
}
