//! Command-line interface for feedrelay.
//!
//! Running without a subcommand starts the relay loop. Every flag can also
//! be given through its FEEDRELAY_* environment variable.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::adapters::TelegramClient;
use crate::config::{self, ConfigOverrides, RelayConfig};
use crate::core::{
    shutdown_signal, IdentityKind, IdentityStore, Relay, RelayPolicy, Scheduler, StateLock,
};
use crate::domain::CycleOutcome;
use crate::feed::HttpFeedSource;

/// feedrelay - Relay new feed items to a Telegram channel
#[derive(Parser, Debug)]
#[command(name = "feedrelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./feedrelay.yaml if present)
    #[arg(short, long, env = "FEEDRELAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Settings that override the config file
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Telegram bot token
    #[arg(long, env = "FEEDRELAY_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Destination channel (@name or numeric id)
    #[arg(long, env = "FEEDRELAY_CHANNEL_ID", global = true)]
    pub channel_id: Option<String>,

    /// Feed URL
    #[arg(long, env = "FEEDRELAY_FEED_URL", global = true)]
    pub feed_url: Option<String>,

    /// Seconds to sleep between cycles
    #[arg(long, env = "FEEDRELAY_POLL_INTERVAL", global = true)]
    pub poll_interval: Option<u64>,

    /// Network timeout in seconds for feed and Telegram requests
    #[arg(long, env = "FEEDRELAY_REQUEST_TIMEOUT", global = true)]
    pub request_timeout: Option<u64>,

    /// Sent-items state file
    #[arg(long, env = "FEEDRELAY_STATE", global = true)]
    pub state: Option<PathBuf>,

    /// Item identity: title, link or guid
    #[arg(long, env = "FEEDRELAY_IDENTITY", global = true)]
    pub identity: Option<IdentityKind>,

    /// Stop retrying an item after this many failed deliveries
    #[arg(long, env = "FEEDRELAY_MAX_ATTEMPTS", global = true)]
    pub max_attempts: Option<u32>,
}

impl From<SettingsArgs> for ConfigOverrides {
    fn from(args: SettingsArgs) -> Self {
        Self {
            bot_token: args.token,
            channel_id: args.channel_id,
            feed_url: args.feed_url,
            poll_interval_seconds: args.poll_interval,
            request_timeout_seconds: args.request_timeout,
            state_path: args.state,
            identity: args.identity,
            max_delivery_attempts: args.max_attempts,
        }
    }
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the relay until interrupted (default)
    Run,

    /// Run a single cycle and exit
    Once,

    /// Show items that would be delivered, without sending anything
    Pending,

    /// Show resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let command = self.command.unwrap_or(Commands::Run);
        let config = config::load(self.settings.into(), self.config.as_deref())
            .context("Invalid configuration")?;

        match command {
            Commands::Run => run_relay(&config).await,
            Commands::Once => run_once(&config).await,
            Commands::Pending => show_pending(&config).await,
            Commands::Config => show_config(&config),
        }
    }
}

/// Build the relay from resolved configuration.
///
/// With `verify_token`, the bot token is checked against Telegram first;
/// a rejected token is fatal.
async fn build_relay(config: &RelayConfig, verify_token: bool) -> Result<Relay> {
    let telegram = TelegramClient::new(
        config.bot_token.clone(),
        config.channel_id.clone(),
        config.request_timeout,
    )
    .context("Failed to create Telegram client")?;

    if verify_token {
        let me = telegram
            .get_me()
            .await
            .context("Telegram rejected the bot token")?;
        info!(
            "Authorized on account {}",
            me.username.unwrap_or_else(|| me.id.to_string())
        );
    }

    let source = HttpFeedSource::new(config.feed_url.clone(), config.request_timeout)
        .context("Failed to create feed client")?;

    Ok(Relay::new(
        Box::new(source),
        Box::new(telegram),
        config.identity.build(),
        IdentityStore::new(&config.state_path),
    )
    .with_policy(RelayPolicy {
        max_delivery_attempts: config.max_delivery_attempts,
    }))
}

/// Take the state lock, verify credentials and load the record
async fn start(config: &RelayConfig) -> Result<(StateLock, Scheduler)> {
    let lock = StateLock::acquire(&config.state_path)?;
    let relay = build_relay(config, true).await?;
    let record = relay.store().load_or_empty().await;

    Ok((lock, Scheduler::new(relay, record, config.poll_interval)))
}

async fn run_relay(config: &RelayConfig) -> Result<()> {
    let shutdown = shutdown_signal().context("Failed to install signal handlers")?;
    let (_lock, mut scheduler) = start(config).await?;

    info!(
        feed = %config.feed_url,
        channel = %config.channel_id,
        interval_secs = config.poll_interval.as_secs(),
        identity = %config.identity,
        "Relay started"
    );

    let cycles = scheduler.run_until(shutdown).await;

    info!(cycles, sent = scheduler.record().len(), "Relay stopped");
    Ok(())
}

async fn run_once(config: &RelayConfig) -> Result<()> {
    let (_lock, mut scheduler) = start(config).await?;
    let report = scheduler.run_once().await;

    println!("Fetched:      {}", report.fetched);
    println!("Delivered:    {}", report.delivered.len());
    println!("Failed:       {}", report.failed.len());
    println!("Already sent: {}", report.already_sent);
    println!("Persisted:    {}", report.persisted);

    if let CycleOutcome::FetchFailed { error } = report.outcome {
        anyhow::bail!("Feed fetch failed: {}", error);
    }

    Ok(())
}

async fn show_pending(config: &RelayConfig) -> Result<()> {
    let relay = build_relay(config, false).await?;
    let record = relay.store().load_or_empty().await;

    let pending = relay
        .pending(&record)
        .await
        .with_context(|| format!("Failed to fetch {}", config.feed_url))?;

    if pending.is_empty() {
        println!("Nothing new ({} items already sent)", record.len());
        return Ok(());
    }

    println!("{} new item(s):", pending.len());
    for candidate in &pending {
        println!("  {}  {}", candidate.identity, candidate.item.link);
    }

    Ok(())
}

fn show_config(config: &RelayConfig) -> Result<()> {
    println!("feedrelay configuration");
    println!();
    println!(
        "Config file:      {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using flags/env/defaults)".to_string())
    );
    println!("Bot token:        {}", config.redacted_token());
    println!("Channel:          {}", config.channel_id);
    println!("Feed URL:         {}", config.feed_url);
    println!("Poll interval:    {}s", config.poll_interval.as_secs());
    println!("Request timeout:  {}s", config.request_timeout.as_secs());
    println!("State file:       {}", config.state_path.display());
    println!("Identity:         {}", config.identity);
    println!(
        "Max attempts:     {}",
        config
            .max_delivery_attempts
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unlimited".to_string())
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["feedrelay", "--feed-url", "https://x/rss"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.settings.feed_url.as_deref(), Some("https://x/rss"));
    }

    #[test]
    fn test_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "feedrelay",
            "once",
            "--identity",
            "guid",
            "--max-attempts",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Commands::Once));
        assert_eq!(cli.settings.identity, Some(IdentityKind::Guid));

        let overrides: ConfigOverrides = cli.settings.into();
        assert_eq!(overrides.max_delivery_attempts, Some(3));
    }

    #[test]
    fn test_bad_identity_rejected() {
        assert!(Cli::try_parse_from(["feedrelay", "--identity", "hash"]).is_err());
    }
}
