//! Poll cycle tests against the recording transport.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{RecordingApi, account, issue_fragment, raw_notification};
use gitnotify::aggregator::fetch_notifications;
use gitnotify::config::Settings;
use gitnotify::errors::{ApiError, GitifyError};
use gitnotify::notifications::filters::{FilterSettings, StateCategory};
use gitnotify::notifications::{NotificationState, SubjectType, UserType};

fn settings_with(filters: FilterSettings) -> Settings {
    Settings {
        filters,
        ..Default::default()
    }
}

#[tokio::test]
async fn failing_account_does_not_affect_others() {
    let api = RecordingApi::new()
        .with_list(
            "github.com",
            vec![
                raw_notification("1", "RepositoryInvitation", 1, "gitify-app/notifications-test"),
                raw_notification("2", "RepositoryInvitation", 2, "gitify-app/notifications-test"),
            ],
        )
        .with_list_error("github.gitify.io", ApiError::http(401, "Bad credentials"));
    let accounts = vec![
        Arc::new(account("github.com", "octocat", "1")),
        Arc::new(account("github.gitify.io", "enterprise", "2")),
    ];

    let results = fetch_notifications(&api, &accounts, &Settings::default()).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].error, None);
    assert_eq!(results[0].notifications.len(), 2);
    assert_eq!(results[1].error, Some(GitifyError::BadCredentials));
    assert!(results[1].notifications.is_empty());
    assert_eq!(results[1].account.hostname, "github.gitify.io");
}

#[tokio::test]
async fn network_failure_is_classified() {
    let api = RecordingApi::new()
        .with_list_error("github.com", ApiError::network("connection refused"));
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];

    let results = fetch_notifications(&api, &accounts, &Settings::default()).await;
    assert_eq!(results[0].error, Some(GitifyError::Network));
}

#[tokio::test]
async fn list_parameters_follow_settings() {
    let api = RecordingApi::new();
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];
    let settings = Settings {
        participating: true,
        fetch_read_notifications: true,
        ..Default::default()
    };

    fetch_notifications(&api, &accounts, &settings).await;
    assert_eq!(api.calls(), vec!["list:github.com:participating=true:all=true"]);
}

#[tokio::test]
async fn no_graphql_request_without_mergeable_notifications() {
    let mut check_suite =
        raw_notification("1", "CheckSuite", 1, "gitify-app/notifications-test");
    check_suite.subject.title = "Demo workflow run succeeded for main branch".to_string();
    check_suite.subject.url = None;
    let api = RecordingApi::new().with_list(
        "github.com",
        vec![
            check_suite,
            raw_notification("2", "RepositoryInvitation", 2, "gitify-app/notifications-test"),
        ],
    );
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];

    let results = fetch_notifications(&api, &accounts, &Settings::default()).await;

    assert_eq!(api.count("graphql"), 0);
    assert_eq!(api.count("follow"), 0);
    let notifications = &results[0].notifications;
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].subject.state, Some(NotificationState::Success));
}

#[tokio::test]
async fn mergeable_notifications_share_one_request() {
    let api = RecordingApi::new()
        .with_list(
            "github.com",
            vec![
                raw_notification("1", "Issue", 1, "gitify-app/notifications-test"),
                raw_notification("2", "Issue", 2, "gitify-app/notifications-test"),
                raw_notification("3", "Issue", 3, "gitify-app/notifications-test"),
            ],
        )
        .with_graphql(json!({
            "data": {
                "node0": { "issue": issue_fragment(1, "OPEN", "octocat", "User") },
                "node1": { "issue": issue_fragment(2, "CLOSED", "octocat", "User") },
                "node2": null
            }
        }));
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];

    let results = fetch_notifications(&api, &accounts, &Settings::default()).await;

    assert_eq!(api.count("graphql"), 1);
    assert_eq!(api.count("graphql:3"), 1);

    let notifications = &results[0].notifications;
    assert_eq!(notifications.len(), 3);
    assert_eq!(notifications[0].subject.state, Some(NotificationState::Open));
    assert_eq!(notifications[0].subject.number, Some(1));
    assert_eq!(notifications[1].subject.state, Some(NotificationState::Closed));
    assert_eq!(notifications[2].subject.state, None);
    assert_eq!(notifications[2].subject.user, None);
}

#[tokio::test]
async fn merged_failure_falls_back_to_individual_lookups() {
    let api = RecordingApi::new()
        .with_list(
            "github.com",
            vec![
                raw_notification("1", "Issue", 1, "gitify-app/notifications-test"),
                raw_notification("2", "Issue", 2, "gitify-app/notifications-test"),
            ],
        )
        .with_graphql_error(ApiError::http(502, "Bad Gateway"))
        .with_graphql(json!({
            "data": { "node0": { "issue": issue_fragment(7, "OPEN", "octocat", "User") } }
        }))
        .with_graphql(json!({
            "data": { "node0": { "issue": issue_fragment(7, "OPEN", "octocat", "User") } }
        }));
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];

    let results = fetch_notifications(&api, &accounts, &Settings::default()).await;

    assert_eq!(api.count("graphql:2"), 1);
    assert_eq!(api.count("graphql:1"), 2);
    let notifications = &results[0].notifications;
    assert_eq!(notifications.len(), 2);
    assert!(
        notifications
            .iter()
            .all(|n| n.subject.state == Some(NotificationState::Open))
    );
}

#[tokio::test]
async fn failed_enrichment_keeps_notification() {
    let api = RecordingApi::new().with_list(
        "github.com",
        vec![raw_notification("1", "Release", 1, "gitify-app/notifications-test")],
    );
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];

    let results = fetch_notifications(&api, &accounts, &Settings::default()).await;

    assert_eq!(api.count("follow"), 1);
    assert_eq!(results[0].error, None);
    assert_eq!(results[0].notifications.len(), 1);
    assert_eq!(results[0].notifications[0].subject.user, None);
}

#[tokio::test]
async fn state_filter_drops_enriched_notifications() {
    let api = RecordingApi::new()
        .with_list(
            "github.com",
            vec![
                raw_notification("1", "Issue", 1, "gitify-app/notifications-test"),
                raw_notification("2", "Issue", 2, "gitify-app/notifications-test"),
            ],
        )
        .with_graphql(json!({
            "data": {
                "node0": { "issue": issue_fragment(1, "OPEN", "octocat", "User") },
                "node1": { "issue": issue_fragment(2, "CLOSED", "octocat", "User") }
            }
        }));
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];
    let settings = settings_with(FilterSettings {
        states: vec![StateCategory::Closed],
        ..Default::default()
    });

    let results = fetch_notifications(&api, &accounts, &settings).await;

    let ids: Vec<&str> = results[0].notifications.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["2"]);
}

#[tokio::test]
async fn user_type_filter_applies_after_enrichment() {
    let api = RecordingApi::new()
        .with_list(
            "github.com",
            vec![
                raw_notification("1", "Issue", 1, "gitify-app/notifications-test"),
                raw_notification("2", "Issue", 2, "gitify-app/notifications-test"),
            ],
        )
        .with_graphql(json!({
            "data": {
                "node0": { "issue": issue_fragment(1, "OPEN", "octocat", "User") },
                "node1": { "issue": issue_fragment(2, "OPEN", "dependabot", "Bot") }
            }
        }));
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];
    let settings = settings_with(FilterSettings {
        user_types: vec![UserType::Bot],
        ..Default::default()
    });

    let results = fetch_notifications(&api, &accounts, &settings).await;

    let notifications = &results[0].notifications;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].subject.user.as_ref().unwrap().login, "dependabot");
}

#[tokio::test]
async fn base_filters_run_before_enrichment() {
    let api = RecordingApi::new().with_list(
        "github.com",
        vec![
            raw_notification("1", "Issue", 1, "gitify-app/notifications-test"),
            raw_notification("2", "RepositoryInvitation", 2, "gitify-app/notifications-test"),
        ],
    );
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];
    let settings = settings_with(FilterSettings {
        subject_types: vec![SubjectType::RepositoryInvitation],
        ..Default::default()
    });

    let results = fetch_notifications(&api, &accounts, &settings).await;

    assert_eq!(api.count("graphql"), 0);
    let ids: Vec<&str> = results[0].notifications.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["2"]);
}

#[tokio::test]
async fn without_details_nothing_is_enriched_or_state_filtered() {
    let api = RecordingApi::new().with_list(
        "github.com",
        vec![raw_notification("1", "Issue", 1, "gitify-app/notifications-test")],
    );
    let accounts = vec![Arc::new(account("github.com", "octocat", "1"))];
    let settings = Settings {
        detailed_notifications: false,
        filters: FilterSettings {
            states: vec![StateCategory::Merged],
            ..Default::default()
        },
        ..Default::default()
    };

    let results = fetch_notifications(&api, &accounts, &settings).await;

    assert_eq!(api.count("graphql"), 0);
    assert_eq!(results[0].notifications.len(), 1);
    assert_eq!(results[0].notifications[0].subject.state, None);
}

#[tokio::test]
async fn order_is_assigned_across_accounts() {
    let api = RecordingApi::new()
        .with_list(
            "github.com",
            vec![
                raw_notification("1", "RepositoryInvitation", 1, "a/one"),
                raw_notification("2", "RepositoryInvitation", 2, "b/two"),
                raw_notification("3", "RepositoryInvitation", 3, "a/one"),
            ],
        )
        .with_list(
            "github.gitify.io",
            vec![raw_notification("4", "RepositoryInvitation", 4, "c/three")],
        );
    let accounts = vec![
        Arc::new(account("github.com", "octocat", "1")),
        Arc::new(account("github.gitify.io", "enterprise", "2")),
    ];

    let results = fetch_notifications(&api, &accounts, &Settings::default()).await;

    let orders: Vec<(&str, usize)> = results
        .iter()
        .flat_map(|a| a.notifications.iter().map(|n| (n.id.as_str(), n.order)))
        .collect();
    assert_eq!(orders, vec![("1", 0), ("2", 2), ("3", 1), ("4", 3)]);
}
