//! Shared fixtures for the integration tests: accounts, raw notification
//! payloads and an in-memory `GitHubApi` that records every call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use gitnotify::account::{Account, AccountUser, AuthMethod, HostVersion, Token, Version};
use gitnotify::errors::ApiError;
use gitnotify::providers::models::UserDetails;
use gitnotify::providers::{
    AuthenticatedUser, GitHubApi, GraphQLResponse, ListParams, RawNotification,
};
use gitnotify::store::{AlertSink, NativeAlert, TraySink};

pub fn account(hostname: &str, login: &str, user_id: &str) -> Account {
    let mut account = Account::new(
        hostname,
        AuthMethod::PersonalAccessToken,
        Token::from_stored("token-123-456"),
    );
    account.user = Some(AccountUser {
        id: user_id.to_string(),
        login: login.to_string(),
        name: None,
        avatar: None,
    });
    account.version = Some(HostVersion::Latest);
    account
}

pub fn enterprise_account(version: &str) -> Account {
    let mut account = account("github.gitify.io", "enterprise-user", "42");
    account.version = Version::coerce(version).map(HostVersion::Release);
    account
}

pub fn raw_notification(
    id: &str,
    subject_type: &str,
    number: u64,
    full_name: &str,
) -> RawNotification {
    let (owner, name) = full_name.split_once('/').unwrap_or((full_name, full_name));
    let kind = match subject_type {
        "PullRequest" => "pulls",
        _ => "issues",
    };
    serde_json::from_value(json!({
        "id": id,
        "unread": true,
        "reason": "subscribed",
        "updated_at": "2017-05-20T17:51:57Z",
        "subject": {
            "title": format!("{} {}", subject_type, number),
            "type": subject_type,
            "url": format!("https://api.github.com/repos/{}/{}/{}", full_name, kind, number),
            "latest_comment_url": null
        },
        "repository": {
            "id": 57216596,
            "name": name,
            "full_name": full_name,
            "html_url": format!("https://github.com/{}", full_name),
            "private": false,
            "owner": {
                "login": owner,
                "avatar_url": null,
                "html_url": format!("https://github.com/{}", owner),
                "type": "Organization"
            }
        }
    }))
    .unwrap()
}

/// GraphQL `IssueDetails` fragment.
pub fn issue_fragment(number: u64, state: &str, author: &str, author_type: &str) -> Value {
    json!({
        "__typename": "Issue",
        "number": number,
        "title": "Issue",
        "url": format!("https://github.com/gitify-app/notifications-test/issues/{}", number),
        "state": state,
        "stateReason": null,
        "milestone": null,
        "author": {
            "login": author,
            "url": format!("https://github.com/{}", author),
            "avatarUrl": null,
            "__typename": author_type
        },
        "comments": { "totalCount": 0, "nodes": [] },
        "labels": { "nodes": [] }
    })
}

#[derive(Clone)]
struct ListResponse {
    delay: Duration,
    result: Result<Vec<RawNotification>, ApiError>,
}

/// In-memory transport.
///
/// List responses are queued per hostname; the last queued response is
/// repeated once the queue is down to one entry. GraphQL bodies are queued
/// and an empty queue answers with a 502.
#[derive(Default)]
pub struct RecordingApi {
    lists: Mutex<HashMap<String, VecDeque<ListResponse>>>,
    graphql: Mutex<VecDeque<Result<Value, ApiError>>>,
    follow: HashMap<String, Value>,
    failing_threads: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, hostname: &str, notifications: Vec<RawNotification>) -> Self {
        self.with_list_result(hostname, Duration::ZERO, Ok(notifications))
    }

    pub fn with_list_error(self, hostname: &str, error: ApiError) -> Self {
        self.with_list_result(hostname, Duration::ZERO, Err(error))
    }

    pub fn with_list_result(
        self,
        hostname: &str,
        delay: Duration,
        result: Result<Vec<RawNotification>, ApiError>,
    ) -> Self {
        self.lists
            .lock()
            .unwrap()
            .entry(hostname.to_string())
            .or_default()
            .push_back(ListResponse { delay, result });
        self
    }

    /// Queue a GraphQL response body such as `{ "data": { ... } }`.
    pub fn with_graphql(self, body: Value) -> Self {
        self.graphql.lock().unwrap().push_back(Ok(body));
        self
    }

    pub fn with_graphql_error(self, error: ApiError) -> Self {
        self.graphql.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_follow(mut self, url: &str, body: Value) -> Self {
        self.follow.insert(url.to_string(), body);
        self
    }

    pub fn with_failing_thread(mut self, thread_id: &str) -> Self {
        self.failing_threads.insert(thread_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn mutation(&self, kind: &str, thread_id: &str) -> Result<(), ApiError> {
        self.record(format!("{}:{}", kind, thread_id));
        if self.failing_threads.contains(thread_id) {
            return Err(ApiError::http(500, "Server Error"));
        }
        Ok(())
    }
}

#[async_trait]
impl GitHubApi for RecordingApi {
    async fn list_notifications(
        &self,
        account: &Account,
        params: ListParams,
    ) -> Result<Vec<RawNotification>, ApiError> {
        self.record(format!(
            "list:{}:participating={}:all={}",
            account.hostname, params.participating, params.all
        ));
        let response = {
            let mut lists = self.lists.lock().unwrap();
            let queue = lists.get_mut(&account.hostname);
            match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        let Some(response) = response else {
            return Ok(Vec::new());
        };
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        response.result
    }

    async fn mark_thread_as_read(&self, _account: &Account, thread_id: &str) -> Result<(), ApiError> {
        self.mutation("read", thread_id)
    }

    async fn mark_thread_as_done(&self, _account: &Account, thread_id: &str) -> Result<(), ApiError> {
        self.mutation("done", thread_id)
    }

    async fn ignore_thread_subscription(
        &self,
        _account: &Account,
        thread_id: &str,
    ) -> Result<(), ApiError> {
        self.mutation("unsubscribe", thread_id)
    }

    async fn follow_url(&self, _account: &Account, url: &str) -> Result<Value, ApiError> {
        self.record(format!("follow:{}", url));
        self.follow
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::http(404, "Not Found"))
    }

    async fn graphql_request_raw_string(
        &self,
        _account: &Account,
        query: &str,
        variables: Value,
    ) -> Result<GraphQLResponse, ApiError> {
        let nodes = variables
            .as_object()
            .map(|vars| vars.keys().filter(|k| k.starts_with("owner")).count())
            .unwrap_or(0);
        assert!(query.contains("query FetchMergedNotifications"));
        self.record(format!("graphql:{}", nodes));

        let next = self.graphql.lock().unwrap().pop_front();
        match next {
            Some(Ok(body)) => serde_json::from_value(body).map_err(ApiError::decode),
            Some(Err(e)) => Err(e),
            None => Err(ApiError::http(502, "Bad Gateway")),
        }
    }

    async fn fetch_authenticated_user(&self, account: &Account) -> Result<AuthenticatedUser, ApiError> {
        self.record(format!("user:{}", account.hostname));
        Ok(AuthenticatedUser {
            user: UserDetails {
                id: 123456789,
                login: "octocat".to_string(),
                name: None,
                avatar_url: None,
            },
            enterprise_version: None,
            scopes: vec![
                "notifications".to_string(),
                "read:user".to_string(),
                "repo".to_string(),
            ],
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    Sound(f32),
    Native(NativeAlert),
}

#[derive(Default)]
pub struct RecordingAlerts {
    pub events: Mutex<Vec<AlertEvent>>,
}

impl RecordingAlerts {
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingAlerts {
    fn play_sound(&self, volume: f32) {
        self.events.lock().unwrap().push(AlertEvent::Sound(volume));
    }

    fn raise_native(&self, alert: &NativeAlert) {
        self.events
            .lock()
            .unwrap()
            .push(AlertEvent::Native(alert.clone()));
    }
}

#[derive(Default)]
pub struct RecordingTray {
    pub counts: Mutex<Vec<usize>>,
}

impl RecordingTray {
    pub fn last(&self) -> Option<usize> {
        self.counts.lock().unwrap().last().copied()
    }
}

impl TraySink for RecordingTray {
    fn set_count(&self, count: usize) {
        self.counts.lock().unwrap().push(count);
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
