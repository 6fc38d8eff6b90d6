//! Subject type handler registry.
//!
//! Each subject type has a handler that knows how to enrich, draw and link
//! its notifications. [`handler_for`] is the lookup table; unknown types get
//! [`DefaultHandler`], which performs no enrichment.

mod check_suite;
mod commit;
mod default;
mod dependabot;
mod discussion;
mod issue;
mod pull_request;
mod release;
mod repository_invitation;
mod vulnerability;
mod workflow_run;

use async_trait::async_trait;
use serde_json::Value;
use strum::{AsRefStr, Display};

pub use check_suite::{CheckSuiteAttributes, CheckSuiteHandler, check_suite_attributes, check_suite_url};
pub use commit::CommitHandler;
pub use default::DefaultHandler;
pub use dependabot::DependabotAlertsHandler;
pub use discussion::{DiscussionHandler, closest_comment_or_reply, discussion_state};
pub use issue::IssueHandler;
pub use pull_request::{PullRequestHandler, latest_review_for_reviewers};
pub use release::ReleaseHandler;
pub use repository_invitation::RepositoryInvitationHandler;
pub use vulnerability::VulnerabilityAlertHandler;
pub use workflow_run::{WorkflowRunAttributes, WorkflowRunHandler, workflow_run_attributes};

use super::filters::FilterSettings;
use super::query::models::Author;
use super::{Notification, Subject, SubjectDetails, SubjectType, SubjectUser, UserType};
use crate::errors::ApiError;
use crate::providers::GitHubApi;
use crate::providers::models::RestUser;

/// Outcome of enriching one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    /// Subject details to merge into the notification.
    Enriched(SubjectDetails),
    /// Nothing could be derived; the notification renders with defaults.
    NotApplicable,
    /// The derived state is excluded by the active state filter, so the
    /// notification should be dropped.
    FilteredOut,
}

/// Everything a handler may need besides the notification itself.
#[derive(Clone, Copy)]
pub struct EnrichContext<'a> {
    pub api: &'a dyn GitHubApi,
    pub filters: &'a FilterSettings,
    /// Whether the host exposes `Discussion.isAnswered`.
    pub include_is_answered: bool,
}

/// Octicon drawn next to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum IconKind {
    Alert,
    Check,
    CommentDiscussion,
    DiscussionClosed,
    DiscussionDuplicate,
    DiscussionOutdated,
    GitCommit,
    GitMerge,
    GitMergeQueue,
    GitPullRequest,
    GitPullRequestClosed,
    GitPullRequestDraft,
    IssueClosed,
    IssueDraft,
    IssueOpened,
    IssueReopened,
    Mail,
    Question,
    Rocket,
    Skip,
    Stop,
    Tag,
    X,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum IconColor {
    Gray,
    Green,
    Purple,
    Red,
    Yellow,
}

/// Behavior of one subject type.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// The type this handler serves, `None` for the fallback.
    fn subject_type(&self) -> Option<SubjectType>;

    /// Whether details can be fetched through the merged query.
    fn supports_merged_query_enrichment(&self) -> bool {
        false
    }

    /// Derive subject details.
    ///
    /// `fetched` carries this notification's fragment of a merged query
    /// response when one is available. Handlers that support merged
    /// enrichment fetch the fragment themselves when it is `None`.
    async fn enrich(
        &self,
        _ctx: &EnrichContext<'_>,
        _notification: &Notification,
        _fetched: Option<&Value>,
    ) -> Result<Enrichment, ApiError> {
        Ok(Enrichment::NotApplicable)
    }

    fn icon_type(&self, _subject: &Subject) -> IconKind {
        IconKind::Question
    }

    fn icon_color(&self, _subject: &Subject) -> IconColor {
        IconColor::Gray
    }

    /// Where to send the user when no specific URL was resolved.
    fn default_url(&self, notification: &Notification) -> String {
        repository_url(notification)
    }

    fn default_user_type(&self) -> UserType {
        UserType::User
    }
}

static CHECK_SUITE: CheckSuiteHandler = CheckSuiteHandler;
static COMMIT: CommitHandler = CommitHandler;
static DEFAULT: DefaultHandler = DefaultHandler;
static DEPENDABOT: DependabotAlertsHandler = DependabotAlertsHandler;
static DISCUSSION: DiscussionHandler = DiscussionHandler;
static ISSUE: IssueHandler = IssueHandler;
static PULL_REQUEST: PullRequestHandler = PullRequestHandler;
static RELEASE: ReleaseHandler = ReleaseHandler;
static REPOSITORY_INVITATION: RepositoryInvitationHandler = RepositoryInvitationHandler;
static VULNERABILITY: VulnerabilityAlertHandler = VulnerabilityAlertHandler;
static WORKFLOW_RUN: WorkflowRunHandler = WorkflowRunHandler;

/// Look up the handler of a subject type.
pub fn handler_for(subject_type: &SubjectType) -> &'static dyn NotificationHandler {
    match subject_type {
        SubjectType::CheckSuite => &CHECK_SUITE,
        SubjectType::Commit => &COMMIT,
        SubjectType::Discussion => &DISCUSSION,
        SubjectType::Issue => &ISSUE,
        SubjectType::PullRequest => &PULL_REQUEST,
        SubjectType::Release => &RELEASE,
        SubjectType::RepositoryDependabotAlertsThread => &DEPENDABOT,
        SubjectType::RepositoryInvitation => &REPOSITORY_INVITATION,
        SubjectType::RepositoryVulnerabilityAlert => &VULNERABILITY,
        SubjectType::WorkflowRun => &WORKFLOW_RUN,
        SubjectType::Other(_) => &DEFAULT,
    }
}

/// Repository page of a notification, or the host root when the thread has
/// no repository.
pub fn repository_url(notification: &Notification) -> String {
    match &notification.repository {
        Some(repository) => repository.html_url.clone(),
        None => format!("https://{}", notification.account.hostname),
    }
}

/// Append a path segment to the repository page.
pub(crate) fn repository_subpage(notification: &Notification, segment: &str) -> String {
    format!("{}/{}", repository_url(notification).trim_end_matches('/'), segment)
}

/// Actions page of the repository filtered by `filters`.
///
/// The Actions UI cannot handle an encoded `+`, so the filters are joined
/// with `+` and left unencoded.
pub fn actions_url(notification: &Notification, filters: &[String]) -> String {
    let base = repository_subpage(notification, "actions");
    let Ok(mut url) = url::Url::parse(&base) else {
        return base;
    };
    if !filters.is_empty() {
        url.query_pairs_mut().append_pair("query", &filters.join("+"));
    }
    url.to_string().replace("%2B", "+")
}

/// Run the merged-template lookup for a notification that arrived without a
/// prefetched fragment.
pub(crate) async fn fetched_or_lookup(
    ctx: &EnrichContext<'_>,
    notification: &Notification,
    fetched: Option<&Value>,
) -> Result<Option<Value>, ApiError> {
    match fetched {
        Some(value) => Ok(Some(value.clone())),
        None => {
            super::query::fetch_node_details(ctx.api, notification, ctx.include_is_answered).await
        }
    }
}

/// First present author among `candidates`.
pub(crate) fn notification_author(candidates: &[Option<&Author>]) -> Option<SubjectUser> {
    candidates
        .iter()
        .flatten()
        .next()
        .map(|author| author.to_subject_user())
}

pub(crate) fn rest_user(user: &RestUser) -> SubjectUser {
    SubjectUser {
        login: user.login.clone(),
        html_url: user.html_url.clone(),
        avatar_url: user.avatar_url.clone(),
        user_type: UserType::from_type_name(&user.type_field),
    }
}

/// `GET` a URL from the notification payload and decode it.
pub(crate) async fn follow_typed<T: serde::de::DeserializeOwned>(
    ctx: &EnrichContext<'_>,
    notification: &Notification,
    url: &str,
) -> Result<T, ApiError> {
    let body = ctx.api.follow_url(&notification.account, url).await?;
    serde_json::from_value(body).map_err(ApiError::decode)
}

/// Decode a fetched fragment into its typed shape.
pub(crate) fn decode_fragment<T: serde::de::DeserializeOwned>(
    fragment: Value,
    kind: &str,
) -> Result<T, ApiError> {
    serde_json::from_value(fragment)
        .map_err(|e| ApiError::decode(format!("{} details: {}", kind, e)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    use crate::account::{Account, AccountUser, AuthMethod, HostVersion, Token};
    use crate::errors::ApiError;
    use crate::providers::{AuthenticatedUser, GitHubApi, GraphQLResponse, ListParams, RawNotification};
    use crate::notifications::{
        Notification, Reason, Repository, RepositoryOwner, Subject, SubjectType, SubjectUser,
        UserType,
    };

    pub fn account() -> Arc<Account> {
        let mut account = Account::new(
            "github.com",
            AuthMethod::PersonalAccessToken,
            Token::from_stored("token-123-456"),
        );
        account.user = Some(AccountUser {
            id: "123456789".to_string(),
            login: "octocat".to_string(),
            name: None,
            avatar: None,
        });
        account.version = Some(HostVersion::Latest);
        Arc::new(account)
    }

    /// In-memory API answering `follow_url` from a URL table and every
    /// GraphQL request with the same `data`.
    #[derive(Default)]
    pub struct StubApi {
        pub follow: HashMap<String, Value>,
        pub graphql_data: Option<Value>,
        pub follow_calls: Mutex<Vec<String>>,
        pub graphql_calls: Mutex<Vec<Value>>,
    }

    impl StubApi {
        pub fn with_follow(mut self, url: &str, body: Value) -> Self {
            self.follow.insert(url.to_string(), body);
            self
        }

        pub fn with_graphql(mut self, data: Value) -> Self {
            self.graphql_data = Some(data);
            self
        }

        pub fn graphql_call_count(&self) -> usize {
            self.graphql_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GitHubApi for StubApi {
        async fn list_notifications(
            &self,
            _account: &Account,
            _params: ListParams,
        ) -> Result<Vec<RawNotification>, ApiError> {
            Ok(Vec::new())
        }

        async fn mark_thread_as_read(&self, _: &Account, _: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn mark_thread_as_done(&self, _: &Account, _: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn ignore_thread_subscription(&self, _: &Account, _: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn follow_url(&self, _account: &Account, url: &str) -> Result<Value, ApiError> {
            self.follow_calls.lock().unwrap().push(url.to_string());
            self.follow
                .get(url)
                .cloned()
                .ok_or_else(|| ApiError::http(404, "Not Found"))
        }

        async fn graphql_request_raw_string(
            &self,
            _account: &Account,
            _query: &str,
            variables: Value,
        ) -> Result<GraphQLResponse, ApiError> {
            self.graphql_calls.lock().unwrap().push(variables);
            Ok(GraphQLResponse {
                data: self.graphql_data.clone(),
                errors: Vec::new(),
            })
        }

        async fn fetch_authenticated_user(
            &self,
            _account: &Account,
        ) -> Result<AuthenticatedUser, ApiError> {
            Err(ApiError::http(401, "Bad credentials"))
        }
    }

    pub fn user(login: &str) -> SubjectUser {
        SubjectUser {
            login: login.to_string(),
            html_url: Some(format!("https://github.com/{}", login)),
            avatar_url: None,
            user_type: UserType::User,
        }
    }

    pub fn notification(subject_type: &str, title: &str) -> Notification {
        Notification {
            id: "138661096".to_string(),
            unread: true,
            updated_at: Utc.with_ymd_and_hms(2017, 5, 20, 17, 51, 57).unwrap(),
            reason: Reason::Subscribed,
            subject: Subject {
                title: title.to_string(),
                subject_type: SubjectType::from(subject_type.to_string()),
                url: Some(
                    "https://api.github.com/repos/gitify-app/notifications-test/issues/1"
                        .to_string(),
                ),
                latest_comment_url: None,
                number: None,
                state: None,
                user: None,
                comment_count: None,
                labels: Vec::new(),
                milestone: None,
                reviews: Vec::new(),
                linked_issues: Vec::new(),
                html_url: None,
            },
            repository: Some(Repository {
                id: 57216596,
                name: "notifications-test".to_string(),
                full_name: "gitify-app/notifications-test".to_string(),
                html_url: "https://github.com/gitify-app/notifications-test".to_string(),
                private: true,
                owner: RepositoryOwner {
                    login: "gitify-app".to_string(),
                    avatar_url: None,
                    user_type: UserType::Organization,
                },
            }),
            account: account(),
            order: 0,
        }
    }
}
