mod cli;
mod config;
mod terminal;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use certwatch_connector::{AlertService, HttpCustomerSource};
use certwatch_core::{Config, Customer};
use certwatch_notify::{unread_count, visible_to, ExpiryWatcher, SystemClock};

use crate::cli::{CliArgs, Command};
use crate::config::CliConfig;
use crate::terminal::Terminal;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    certwatch_core::config::load_dotenv();
    let args = CliArgs::parse();
    let terminal = Terminal::new();

    let cli_config = CliConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;

    let mut config = Config::from_env();
    if let Some(ref dir) = args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(ref url) = args.api_url {
        config.api.base_url = url.clone();
    }
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let kv = certwatch_storage::open_from_config(&config)
        .with_context(|| format!("failed to open data dir {}", config.storage.data_dir.display()))?;
    let source = HttpCustomerSource::from_config(&config.api)
        .context("failed to configure customer API client")?;
    let watcher = ExpiryWatcher::new(config.watcher.horizon_days)
        .with_templates(cli_config.expiry_templates()?);
    let mut service = AlertService::new(kv, Arc::new(SystemClock), Arc::new(source), watcher);

    match args.command {
        Command::List { user, role, json } => {
            let viewer = cli_config.resolve_viewer(user.as_deref(), role.as_deref());
            let list = service.store().list();
            match (viewer, json) {
                (Some(v), true) => {
                    let visible: Vec<_> = visible_to(list, &v).collect();
                    println!("{}", serde_json::to_string_pretty(&visible)?);
                }
                (None, true) => println!("{}", serde_json::to_string_pretty(list)?),
                (Some(v), false) => terminal.print_notifications(visible_to(list, &v))?,
                (None, false) => terminal.print_notifications(list)?,
            }
        }
        Command::Unread { user, role } => {
            let viewer = cli_config
                .resolve_viewer(user.as_deref(), role.as_deref())
                .context("unread needs --user and --role (or a [viewer] in the config file)")?;
            println!("{}", unread_count(service.store().list(), &viewer));
        }
        Command::Add(add) => {
            let ids = service.add(add.into_spec());
            if ids.is_empty() {
                terminal.print_error("Nothing stored (no recipients, or the write failed; see logs).")?;
            } else {
                for id in ids {
                    println!("{id}");
                }
            }
        }
        Command::Read { id } => {
            if !service.mark_read(&id) {
                terminal.print_info(&format!("No notification with id {id}."))?;
            }
        }
        Command::ReadAll => service.mark_all_read(),
        Command::Remove { id } => {
            if !service.remove(&id) {
                terminal.print_info(&format!("No notification with id {id}."))?;
            }
        }
        Command::Clear => service.clear(),
        Command::Refresh => {
            let outcome = service.refresh().await;
            terminal.print_refresh(&outcome)?;
        }
        Command::Watch { interval } => {
            let period = Duration::from_secs(interval.max(1));
            info!(interval_secs = period.as_secs(), "Watching customer expiries");
            loop {
                let outcome = service.refresh().await;
                terminal.print_refresh(&outcome)?;
                tokio::select! {
                    _ = tokio::time::sleep(period) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted, stopping watch");
                        break;
                    }
                }
            }
        }
        Command::Scan { customers } => {
            let list = Customer::list_from_json_file(&customers)
                .with_context(|| format!("failed to read customers from {}", customers.display()))?;
            let report = service.scan(&list);
            terminal.print_report(&report)?;
        }
        Command::Status { user, role } => {
            let last_fetch = service
                .last_successful_fetch()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            terminal.print_info(&format!("Data dir:        {}", config.storage.data_dir.display()))?;
            terminal.print_info(&format!("Cached customers: {}", service.customers().len()))?;
            terminal.print_info(&format!("Last fetch:      {last_fetch}"))?;
            terminal.print_info(&format!("Notifications:   {}", service.store().len()))?;
            if let Some(viewer) = cli_config.resolve_viewer(user.as_deref(), role.as_deref()) {
                terminal.print_info(&format!(
                    "Unread for {}:  {}",
                    viewer.username,
                    unread_count(service.store().list(), &viewer)
                ))?;
            }
        }
    }

    Ok(())
}
