//! meshkit - provision a node identity for the mesh overlay

mod args;

use anyhow::{Context, Result};
use args::{Cli, Command};
use clap::Parser;
use meshkit_auth::OneTimeToken;
use meshkit_core::{ClientSettings, ConfigDir, ProvisionMode, Provisioner};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(args::usage_exit_code(&e));
        }
    };

    let default_filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let exit_code = match run(cli, &cancel).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    let settings = ClientSettings::from_env()
        .with_request_timeout(cli.request_timeout)
        .with_login_timeout(cli.login_timeout)
        .with_template(cli.template);

    let mode = match cli.command {
        Command::Login => ProvisionMode::Login {
            server_url: cli.server,
        },
        Command::Enroll { token } => ProvisionMode::Enroll {
            server_url: cli.server.unwrap_or_default(),
            token: OneTimeToken::new(&token).context("Invalid enrollment token")?,
        },
    };

    mode.validate()?;

    let config_dir = ConfigDir::open(&cli.config_path)?;
    tracing::info!(dir = %config_dir.path().display(), "Using config directory");

    let outcome = Provisioner::new(settings)
        .run(mode, &config_dir, cancel)
        .await?;

    tracing::info!(fingerprint = %outcome.fingerprint, "Node identity ready");
    println!("Successfully obtained mesh config");
    Ok(())
}
