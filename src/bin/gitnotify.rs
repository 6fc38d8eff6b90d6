use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{self, EnvFilter};

use gitnotify::account::{
    Account, AuthMethod, GITHUB_HOSTNAME, PassthroughCipher, Token, is_valid_hostname,
    is_valid_token, refresh_account, supports_answered_discussions, supports_mark_as_done,
};
use gitnotify::config::{GroupBy, Settings, default_settings_path};
use gitnotify::errors::GlobalError;
use gitnotify::notifications::filters::{FilterMode, SearchToken, StateCategory};
use gitnotify::notifications::format::{formatted_title, formatted_type, generate_web_url};
use gitnotify::notifications::group::flattened_notifications_by_repo;
use gitnotify::notifications::{Reason, SubjectType, UserType};
use gitnotify::providers::{ClientCache, GithubClient};
use gitnotify::store::{AlertSink, NativeAlert, NotificationsStore, Status, TraySink};

#[derive(Parser)]
#[command(author, version, about = "Aggregate and enrich GitHub notifications", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// GitHub personal access token
    #[arg(short = 't', long, global = true, env = "GITNOTIFY_GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub host, e.g. github.com or an Enterprise Server hostname
    #[arg(long, global = true, default_value = GITHUB_HOSTNAME)]
    hostname: String,

    /// Settings file (defaults to the platform config directory)
    #[arg(short = 's', long, global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PollArgs {
    /// Only threads you participate in
    #[arg(long)]
    participating: bool,

    /// Include notifications already marked as read
    #[arg(long)]
    all: bool,

    /// Skip subject detail enrichment
    #[arg(long)]
    no_details: bool,

    /// Group by repository or date
    #[arg(long)]
    group_by: Option<GroupBy>,

    /// Subject types to keep, e.g. Issue, PullRequest
    #[arg(long = "type")]
    subject_types: Vec<String>,

    /// Reasons to keep, e.g. mention, review_requested
    #[arg(long = "reason")]
    reasons: Vec<String>,

    /// States to keep: draft, open, merged, closed, other
    #[arg(long = "state")]
    states: Vec<String>,

    /// User types to keep: User, Bot, Organization
    #[arg(long = "user-type")]
    user_types: Vec<String>,

    /// Keep notifications matching a token such as author:octocat, org:rust-lang or repo:owner/name
    #[arg(long = "include")]
    include: Vec<String>,

    /// Drop notifications matching a token
    #[arg(long = "exclude")]
    exclude: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch notifications once and print them
    Poll {
        #[command(flatten)]
        args: PollArgs,
    },
    /// Poll on the configured interval and log new notifications
    Watch {
        #[command(flatten)]
        args: PollArgs,
    },
    /// Show the host version and the features it supports
    Version,
}

/// Alerts are written to the log.
struct LogAlerts;

impl AlertSink for LogAlerts {
    fn play_sound(&self, volume: f32) {
        tracing::debug!(volume, "Alert sound");
    }

    fn raise_native(&self, alert: &NativeAlert) {
        tracing::info!(
            url = alert.url.as_deref().unwrap_or("-"),
            "{}: {}",
            alert.title,
            alert.body
        );
    }
}

struct LogTray;

impl TraySink for LogTray {
    fn set_count(&self, count: usize) {
        tracing::debug!(count, "Tray count updated");
    }
}

impl PollArgs {
    fn apply(&self, settings: &mut Settings) -> Result<()> {
        if self.participating {
            settings.participating = true;
        }
        if self.all {
            settings.fetch_read_notifications = true;
        }
        if self.no_details {
            settings.detailed_notifications = false;
        }
        if let Some(group_by) = self.group_by {
            settings.group_by = group_by;
        }

        let filters = &mut settings.filters;
        filters
            .subject_types
            .extend(self.subject_types.iter().map(|t| SubjectType::from(t.clone())));
        filters
            .reasons
            .extend(self.reasons.iter().map(|r| Reason::from(r.clone())));
        for state in &self.states {
            let state: StateCategory = state
                .parse()
                .map_err(|_| anyhow!("Unknown state filter: {}", state))?;
            filters.states.push(state);
        }
        for user_type in &self.user_types {
            let user_type: UserType = user_type
                .parse()
                .map_err(|_| anyhow!("Unknown user type: {}", user_type))?;
            filters.user_types.push(user_type);
        }
        for (mode, raw) in self
            .include
            .iter()
            .map(|t| (FilterMode::Include, t))
            .chain(self.exclude.iter().map(|t| (FilterMode::Exclude, t)))
        {
            let token: SearchToken = raw.parse()?;
            filters.add_search_token(mode, token)?;
        }
        Ok(())
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let path = match path {
        Some(path) => path,
        None => default_settings_path()?,
    };
    let settings = Settings::load(&path)?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

async fn signed_in_account(client: &GithubClient, cli: &Cli) -> Result<Account> {
    let Some(token) = cli.token.as_deref() else {
        bail!("A GitHub token is required (--token or GITNOTIFY_GITHUB_TOKEN)");
    };
    if !is_valid_hostname(&cli.hostname) {
        bail!("Invalid hostname: {}", cli.hostname);
    }
    if !is_valid_token(token) {
        tracing::warn!("Token does not look like a classic personal access token");
    }

    let account = Account::new(
        cli.hostname.clone(),
        AuthMethod::PersonalAccessToken,
        Token::from_stored(token),
    );
    let account = refresh_account(client, account).await;
    if account.user.is_none() {
        bail!("Could not authenticate against {}", cli.hostname);
    }
    Ok(account)
}

fn print_notifications(store_notifications: &[gitnotify::AccountNotifications], group_by: GroupBy) {
    for account in store_notifications {
        if let Some(error) = &account.error {
            println!("{}: {}", account.account.display_name(), error.title());
            continue;
        }
        for notification in flattened_notifications_by_repo(&account.notifications, group_by) {
            println!(
                "{}\t{}\t{}\t{}",
                notification.repository_full_name().unwrap_or("-"),
                formatted_type(notification),
                formatted_title(notification),
                generate_web_url(notification)
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .init();

    let cache = Arc::new(ClientCache::new(Arc::new(PassthroughCipher)));
    let client = Arc::new(GithubClient::new(Arc::clone(&cache)));
    let account = signed_in_account(&client, &cli).await?;
    tracing::info!(
        "Signed in as {} on {} ({})",
        account.display_name(),
        account.hostname,
        account.platform()
    );

    match &cli.command {
        Commands::Version => {
            let version = account
                .version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("host: {}", account.hostname);
            println!("platform: {}", account.platform());
            println!("version: {}", version);
            println!("mark as done: {}", supports_mark_as_done(&account));
            println!("answered discussions: {}", supports_answered_discussions(&account));
            if account.has_required_scopes == Some(false) {
                println!("warning: token is missing required scopes");
            }
        }
        Commands::Poll { args } => {
            let mut settings = load_settings(cli.settings.clone())?;
            args.apply(&mut settings)?;
            let group_by = settings.group_by;

            let store = NotificationsStore::new(
                client,
                cache,
                Arc::new(LogAlerts),
                Arc::new(LogTray),
                Settings {
                    play_sound: false,
                    show_notifications: false,
                    ..settings
                },
            );
            store.add_account(account).await;

            let status = store.refresh().await;
            print_notifications(&store.notifications().await, group_by);
            if status == Status::Error {
                let error = match store.global_error().await {
                    Some(GlobalError::Specific(kind)) => kind.title(),
                    _ => "Oops! Something went wrong",
                };
                bail!("Failed to fetch notifications: {}", error);
            }
        }
        Commands::Watch { args } => {
            let mut settings = load_settings(cli.settings.clone())?;
            args.apply(&mut settings)?;
            let interval = settings.fetch_interval();

            let store = NotificationsStore::new(
                client,
                cache,
                Arc::new(LogAlerts),
                Arc::new(LogTray),
                settings,
            );
            store.add_account(account).await;

            tracing::info!("Polling every {}s", interval.as_secs());
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let status = store.refresh().await;
                        tracing::info!(
                            status = %status,
                            "Poll complete"
                        );
                    }
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for ctrl-c")?;
                        tracing::info!("Shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
