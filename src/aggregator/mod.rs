//! Poll cycle across accounts.
//!
//! Each account is listed, filtered, enriched and filtered again on its own
//! task. A failing account yields an empty list tagged with its error and
//! never affects the others.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::account::{Account, supports_answered_discussions};
use crate::config::Settings;
use crate::errors::determine_failure_type;
use crate::notifications::filters::{filter_base_notifications, filter_detailed_notifications};
use crate::notifications::group::stabilize_notifications_order;
use crate::notifications::handlers::{EnrichContext, Enrichment, handler_for};
use crate::notifications::query::{MergeQueryBuilder, SharedVariables, execute_plan};
use crate::notifications::{AccountNotifications, Notification, transform_notification};
use crate::providers::{GitHubApi, ListParams};

/// Fetch the notifications of every account concurrently.
///
/// The result has one entry per account, in input order, with a global
/// display `order` assigned to every notification.
///
/// # Parameters
///
/// * `api` - Transport shared by all accounts
/// * `accounts` - Accounts to poll
/// * `settings` - Poll, filter and grouping preferences
pub async fn fetch_notifications(
    api: &dyn GitHubApi,
    accounts: &[Arc<Account>],
    settings: &Settings,
) -> Vec<AccountNotifications> {
    let mut results = join_all(
        accounts
            .iter()
            .map(|account| fetch_account_notifications(api, account, settings)),
    )
    .await;

    stabilize_notifications_order(&mut results, settings.group_by);
    results
}

/// Poll a single account.
pub async fn fetch_account_notifications(
    api: &dyn GitHubApi,
    account: &Arc<Account>,
    settings: &Settings,
) -> AccountNotifications {
    let raw = match api.list_notifications(account, ListParams::from(settings)).await {
        Ok(raw) => raw,
        Err(e) => {
            let kind = determine_failure_type(&e);
            tracing::error!(
                account = %account.display_name(),
                hostname = %account.hostname,
                error_kind = %kind,
                "Failed to fetch notifications: {}",
                e
            );
            return AccountNotifications {
                account: Arc::clone(account),
                notifications: Vec::new(),
                error: Some(kind),
            };
        }
    };

    let notifications: Vec<Notification> = raw
        .into_iter()
        .map(|r| transform_notification(r, account))
        .collect();
    let notifications = filter_base_notifications(notifications, &settings.filters);

    let notifications = if settings.detailed_notifications {
        enrich_notifications(api, notifications, settings).await
    } else {
        notifications
    };
    let notifications = filter_detailed_notifications(
        notifications,
        &settings.filters,
        settings.detailed_notifications,
    );

    tracing::debug!(
        "Fetched {} notifications for {}",
        notifications.len(),
        account.display_name()
    );

    AccountNotifications {
        account: Arc::clone(account),
        notifications,
        error: None,
    }
}

/// Enrich the notifications of one account.
///
/// Discussions, issues and pull requests are looked up with a single merged
/// GraphQL request; no request is made when there are none. If the merged
/// request fails each of them is looked up on its own. Handlers then run
/// concurrently. A failing handler leaves its notification un-enriched and
/// a handler reporting a filtered out state drops it.
pub async fn enrich_notifications(
    api: &dyn GitHubApi,
    notifications: Vec<Notification>,
    settings: &Settings,
) -> Vec<Notification> {
    let Some(account) = notifications.first().map(|n| Arc::clone(&n.account)) else {
        return notifications;
    };
    let include_is_answered = supports_answered_discussions(&account);

    let mut fragments: Vec<Option<Value>> = vec![None; notifications.len()];
    let mut unresolved = vec![false; notifications.len()];

    let mut builder = MergeQueryBuilder::new(SharedVariables::new(include_is_answered));
    for (i, notification) in notifications.iter().enumerate() {
        builder.add_notification(i, notification);
    }

    if let Some(plan) = builder.build() {
        match execute_plan(api, &account, &plan).await {
            Ok(data) => {
                for (target, fragment) in plan.redistribute(&data) {
                    match fragment {
                        Some(fragment) => fragments[target] = Some(fragment),
                        None => unresolved[target] = true,
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    account = %account.display_name(),
                    nodes = plan.len(),
                    "Merged detail request failed, falling back to individual lookups: {}",
                    e
                );
            }
        }
    }

    let ctx = EnrichContext {
        api,
        filters: &settings.filters,
        include_is_answered,
    };

    let results = join_all(notifications.iter().enumerate().map(|(i, notification)| {
        let ctx = &ctx;
        let fragment = fragments[i].as_ref();
        let skip = unresolved[i];
        async move {
            if skip {
                return Ok(Enrichment::NotApplicable);
            }
            handler_for(&notification.subject.subject_type)
                .enrich(ctx, notification, fragment)
                .await
        }
    }))
    .await;

    notifications
        .into_iter()
        .zip(results)
        .filter_map(|(mut notification, result)| match result {
            Ok(Enrichment::Enriched(details)) => {
                notification.subject.apply(details);
                Some(notification)
            }
            Ok(Enrichment::NotApplicable) => Some(notification),
            Ok(Enrichment::FilteredOut) => None,
            Err(e) => {
                tracing::error!(
                    notification_id = %notification.id,
                    subject_type = %notification.subject.subject_type,
                    repository = notification.repository_full_name().unwrap_or("-"),
                    account = %notification.account.display_name(),
                    "Failed to enrich notification: {}",
                    e
                );
                Some(notification)
            }
        })
        .collect()
}
