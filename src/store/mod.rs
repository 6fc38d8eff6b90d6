//! Caller layer around the aggregator.
//!
//! [`NotificationsStore`] owns the current snapshot, applies only the most
//! recently started poll cycle, raises alerts for newly seen notifications
//! and runs the read/done/unsubscribe mutations.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use strum::Display;
use tokio::sync::Mutex;

use crate::account::{Account, AccountUuid, supports_mark_as_done};
use crate::aggregator::fetch_notifications;
use crate::config::Settings;
use crate::errors::{ApiError, GlobalError, does_all_accounts_have_errors, global_error};
use crate::notifications::format::generate_web_url;
use crate::notifications::group::{get_new_notifications, notification_count};
use crate::notifications::{AccountNotifications, Notification};
use crate::providers::{ClientCache, GitHubApi};

/// Title of an alert that summarizes several notifications.
pub const APP_NAME: &str = "gitnotify";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Status {
    Loading,
    Success,
    Error,
}

/// A native OS notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeAlert {
    pub title: String,
    pub body: String,
    /// Where clicking the alert navigates, if anywhere.
    pub url: Option<String>,
}

/// Sound and native notification output.
pub trait AlertSink: Send + Sync {
    /// `volume` is a 0.0 to 1.0 fraction.
    fn play_sound(&self, volume: f32);
    fn raise_native(&self, alert: &NativeAlert);
}

/// Tray or badge counter.
pub trait TraySink: Send + Sync {
    fn set_count(&self, count: usize);
}

/// Build the alert for newly arrived notifications.
///
/// One notification is shown on its own and links to its web page. Several
/// are summarized without a link.
pub fn format_alert(new_notifications: &[Notification]) -> Option<NativeAlert> {
    match new_notifications {
        [] => None,
        [notification] => Some(NativeAlert {
            title: notification
                .repository_full_name()
                .unwrap_or(APP_NAME)
                .to_string(),
            body: notification.subject.title.clone(),
            url: Some(generate_web_url(notification)),
        }),
        many => Some(NativeAlert {
            title: APP_NAME.to_string(),
            body: format!("You have {} notifications.", many.len()),
            url: None,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Read,
    Done,
}

impl Mutation {
    fn describe(self) -> &'static str {
        match self {
            Mutation::Read => "mark notification as read",
            Mutation::Done => "mark notification as done",
        }
    }
}

struct StoreState {
    accounts: Vec<Arc<Account>>,
    settings: Settings,
    notifications: Vec<AccountNotifications>,
    status: Status,
    global_error: Option<GlobalError>,
    applied_cycle: u64,
}

/// In-memory notification state of all signed-in accounts.
pub struct NotificationsStore {
    api: Arc<dyn GitHubApi>,
    cache: Arc<ClientCache>,
    alerts: Arc<dyn AlertSink>,
    tray: Arc<dyn TraySink>,
    state: Mutex<StoreState>,
    cycles: AtomicU64,
}

impl NotificationsStore {
    /// Create a store.
    ///
    /// # Parameters
    ///
    /// * `api` - Transport used for polls and mutations
    /// * `cache` - Client cache behind `api`, invalidated when accounts change
    /// * `alerts` - Receives sounds and native notifications
    /// * `tray` - Receives the notification count after every poll
    /// * `settings` - Initial settings
    pub fn new(
        api: Arc<dyn GitHubApi>,
        cache: Arc<ClientCache>,
        alerts: Arc<dyn AlertSink>,
        tray: Arc<dyn TraySink>,
        settings: Settings,
    ) -> Self {
        Self {
            api,
            cache,
            alerts,
            tray,
            state: Mutex::new(StoreState {
                accounts: Vec::new(),
                settings,
                notifications: Vec::new(),
                status: Status::Success,
                global_error: None,
                applied_cycle: 0,
            }),
            cycles: AtomicU64::new(0),
        }
    }

    /// Run one poll cycle and apply it if no later cycle has been applied.
    ///
    /// Returns the status after the cycle.
    pub async fn refresh(&self) -> Status {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;

        let (accounts, settings) = {
            let mut state = self.state.lock().await;
            state.status = Status::Loading;
            (state.accounts.clone(), state.settings.clone())
        };

        let current = fetch_notifications(self.api.as_ref(), &accounts, &settings).await;

        let mut state = self.state.lock().await;
        if cycle <= state.applied_cycle {
            tracing::debug!(
                "Discarding poll cycle {} superseded by cycle {}",
                cycle,
                state.applied_cycle
            );
            return state.status;
        }
        state.applied_cycle = cycle;

        if !does_all_accounts_have_errors(&current) {
            let new_notifications = get_new_notifications(&state.notifications, &current);
            self.raise_alerts(&new_notifications, &settings);
        }

        state.global_error = global_error(&current);
        state.status = if state.global_error.is_some() {
            Status::Error
        } else {
            Status::Success
        };
        state.notifications = current;
        self.tray.set_count(notification_count(&state.notifications));

        tracing::info!(
            "Poll cycle {} finished with status {}: {} notifications",
            cycle,
            state.status,
            notification_count(&state.notifications)
        );
        state.status
    }

    fn raise_alerts(&self, new_notifications: &[Notification], settings: &Settings) {
        if new_notifications.is_empty() {
            return;
        }

        if settings.play_sound {
            self.alerts.play_sound(settings.volume());
        }
        if settings.show_notifications {
            if let Some(alert) = format_alert(new_notifications) {
                self.alerts.raise_native(&alert);
            }
        }
    }

    /// Mark notifications as read on their hosts.
    ///
    /// Returns the number of notifications the host accepted.
    pub async fn mark_notifications_as_read(&self, notifications: &[Notification]) -> usize {
        self.mutate(notifications, Mutation::Read).await
    }

    /// Mark notifications as done on their hosts.
    ///
    /// Notifications of accounts whose host does not support marking as done
    /// are skipped without any request.
    pub async fn mark_notifications_as_done(&self, notifications: &[Notification]) -> usize {
        let (supported, unsupported): (Vec<&Notification>, Vec<&Notification>) = notifications
            .iter()
            .partition(|n| supports_mark_as_done(&n.account));

        for notification in &unsupported {
            tracing::debug!(
                notification_id = %notification.id,
                hostname = %notification.account.hostname,
                "Skipping mark as done: not supported by host version"
            );
        }
        if supported.is_empty() {
            return 0;
        }

        let supported: Vec<Notification> = supported.into_iter().cloned().collect();
        self.mutate(&supported, Mutation::Done).await
    }

    /// Ignore the thread subscription, then mark the thread as done or read
    /// depending on `mark_as_done_on_unsubscribe`.
    pub async fn unsubscribe_notification(&self, notification: &Notification) -> Result<(), ApiError> {
        if let Err(e) = self
            .api
            .ignore_thread_subscription(&notification.account, &notification.id)
            .await
        {
            log_mutation_failure(notification, "unsubscribe from thread", &e);
            return Err(e);
        }

        let mark_as_done = self.state.lock().await.settings.mark_as_done_on_unsubscribe;
        let single = std::slice::from_ref(notification);
        if mark_as_done {
            self.mark_notifications_as_done(single).await;
        } else {
            self.mark_notifications_as_read(single).await;
        }
        Ok(())
    }

    async fn mutate(&self, notifications: &[Notification], mutation: Mutation) -> usize {
        let results = join_all(notifications.iter().map(|notification| async move {
            let result = match mutation {
                Mutation::Read => {
                    self.api
                        .mark_thread_as_read(&notification.account, &notification.id)
                        .await
                }
                Mutation::Done => {
                    self.api
                        .mark_thread_as_done(&notification.account, &notification.id)
                        .await
                }
            };
            (notification, result)
        }))
        .await;

        let mut succeeded: HashSet<(AccountUuid, String)> = HashSet::new();
        for (notification, result) in results {
            match result {
                Ok(()) => {
                    succeeded.insert((notification.account.uuid(), notification.id.clone()));
                }
                Err(e) => log_mutation_failure(notification, mutation.describe(), &e),
            }
        }

        if !succeeded.is_empty() {
            self.apply_mutation(&succeeded).await;
        }
        succeeded.len()
    }

    /// Remove mutated notifications from the snapshot, or only mark them
    /// read when read notifications stay visible.
    async fn apply_mutation(&self, mutated: &HashSet<(AccountUuid, String)>) {
        let mut state = self.state.lock().await;
        let keep_visible =
            state.settings.delay_notification_state || state.settings.fetch_read_notifications;

        for account in state.notifications.iter_mut() {
            let uuid = account.account.uuid();
            if keep_visible {
                for notification in account.notifications.iter_mut() {
                    if mutated.contains(&(uuid.clone(), notification.id.clone())) {
                        notification.unread = false;
                    }
                }
            } else {
                account
                    .notifications
                    .retain(|n| !mutated.contains(&(uuid.clone(), n.id.clone())));
            }
        }

        let count = notification_count(&state.notifications);
        self.tray.set_count(count);
    }

    /// Add or replace an account. Cached clients for it, and for the
    /// account it replaces, are dropped.
    pub async fn add_account(&self, account: Account) {
        self.cache.invalidate(&account);
        let uuid = account.uuid();
        let mut state = self.state.lock().await;
        match state.accounts.iter().position(|a| a.uuid() == uuid) {
            Some(index) => {
                self.cache.invalidate(&state.accounts[index]);
                state.accounts[index] = Arc::new(account);
            }
            None => {
                tracing::info!("Added account {}", account.display_name());
                state.accounts.push(Arc::new(account));
            }
        }
    }

    /// Remove an account and its notifications.
    pub async fn remove_account(&self, uuid: &AccountUuid) {
        let mut state = self.state.lock().await;
        if let Some(index) = state.accounts.iter().position(|a| &a.uuid() == uuid) {
            let account = state.accounts.remove(index);
            self.cache.invalidate(&account);
            tracing::info!("Removed account {}", account.display_name());
        }
        state.notifications.retain(|n| &n.account.uuid() != uuid);
        let count = notification_count(&state.notifications);
        self.tray.set_count(count);
    }

    pub async fn accounts(&self) -> Vec<Arc<Account>> {
        self.state.lock().await.accounts.clone()
    }

    pub async fn notifications(&self) -> Vec<AccountNotifications> {
        self.state.lock().await.notifications.clone()
    }

    pub async fn status(&self) -> Status {
        self.state.lock().await.status
    }

    pub async fn global_error(&self) -> Option<GlobalError> {
        self.state.lock().await.global_error
    }

    pub async fn settings(&self) -> Settings {
        self.state.lock().await.settings.clone()
    }

    /// Replace the settings used by the next poll and mutation.
    pub async fn set_settings(&self, settings: Settings) {
        self.state.lock().await.settings = settings;
    }
}

fn log_mutation_failure(notification: &Notification, action: &str, err: &ApiError) {
    tracing::error!(
        notification_id = %notification.id,
        subject_type = %notification.subject.subject_type,
        repository = notification.repository_full_name().unwrap_or("-"),
        title = %notification.subject.title,
        account = %notification.account.display_name(),
        "Failed to {}: {}",
        action,
        err
    );
}
