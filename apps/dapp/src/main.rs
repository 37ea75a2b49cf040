use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use dapp_core::{Screen, ScreenKind};
use tracing_subscriber::EnvFilter;

mod render;
mod settings;

#[derive(Parser, Debug)]
#[command(about = "Wallet connection and donation screen")]
struct Args {
    /// `viewer` or `donate`.
    #[arg(long, default_value = "donate")]
    screen: ScreenKind,
    #[arg(long, default_value = "dapp.toml")]
    config: PathBuf,
    /// Overrides the configured wallet endpoint.
    #[arg(long)]
    wallet_url: Option<String>,
    /// Ask the wallet for account access.
    #[arg(long)]
    connect: bool,
    /// Donation amount in ETH; clamped to the balance.
    #[arg(long)]
    amount: Option<String>,
    /// Send the donation and wait for confirmations.
    #[arg(long)]
    donate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let mut settings = settings::load_settings(&args.config);
    if let Some(url) = args.wallet_url {
        settings.wallet_url = Some(url);
    }
    let environment = settings.environment()?;
    let screen_settings = settings.screen_settings()?;

    let mut screen = Screen::mount(args.screen, screen_settings, Arc::new(environment));
    screen.run_until_idle().await;

    if args.connect {
        screen.request_connect();
        screen.run_until_idle().await;
    }
    if let Some(amount) = &args.amount {
        screen
            .set_donate_amount(amount)
            .with_context(|| format!("invalid donation amount '{amount}'"))?;
    }

    print!("{}", render::render_view(&screen.view()));

    if args.donate {
        match screen.donate().await {
            Some(receipt) => println!("{}", render::render_receipt(&receipt)),
            None => println!("donation was not confirmed"),
        }
    }

    screen.unmount();
    Ok(())
}
