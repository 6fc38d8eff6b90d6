//! Enriched notification model.
//!
//! [`transform_notification`] turns a wire thread into a [`Notification`].
//! Subject fields beyond title/type/url are filled in later by the handler
//! registry in [`handlers`].

pub mod filters;
pub mod format;
pub mod group;
pub mod handlers;
pub mod query;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::account::Account;
use crate::errors::GitifyError;
use crate::providers::models::{RawNotification, RawRepository};

/// GitHub's subject type of a notification thread.
///
/// Types this crate does not know about parse into `Other` and are handled
/// by the default handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubjectType {
    CheckSuite,
    Commit,
    Discussion,
    Issue,
    PullRequest,
    Release,
    RepositoryDependabotAlertsThread,
    RepositoryInvitation,
    RepositoryVulnerabilityAlert,
    WorkflowRun,
    #[strum(default)]
    Other(String),
}

impl SubjectType {
    pub fn as_str(&self) -> &str {
        match self {
            SubjectType::CheckSuite => "CheckSuite",
            SubjectType::Commit => "Commit",
            SubjectType::Discussion => "Discussion",
            SubjectType::Issue => "Issue",
            SubjectType::PullRequest => "PullRequest",
            SubjectType::Release => "Release",
            SubjectType::RepositoryDependabotAlertsThread => "RepositoryDependabotAlertsThread",
            SubjectType::RepositoryInvitation => "RepositoryInvitation",
            SubjectType::RepositoryVulnerabilityAlert => "RepositoryVulnerabilityAlert",
            SubjectType::WorkflowRun => "WorkflowRun",
            SubjectType::Other(name) => name,
        }
    }
}

impl std::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SubjectType {
    fn from(value: String) -> Self {
        value
            .parse()
            .unwrap_or_else(|_| SubjectType::Other(value))
    }
}

impl From<SubjectType> for String {
    fn from(value: SubjectType) -> Self {
        value.as_str().to_string()
    }
}

/// Why the user received a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "snake_case")]
pub enum Reason {
    ApprovalRequested,
    Assign,
    Author,
    CiActivity,
    Comment,
    Invitation,
    Manual,
    MemberFeatureRequested,
    Mention,
    ReviewRequested,
    SecurityAdvisoryCredit,
    SecurityAlert,
    StateChange,
    Subscribed,
    TeamMention,
    #[strum(default)]
    Unknown(String),
}

impl Reason {
    pub fn as_str(&self) -> &str {
        match self {
            Reason::ApprovalRequested => "approval_requested",
            Reason::Assign => "assign",
            Reason::Author => "author",
            Reason::CiActivity => "ci_activity",
            Reason::Comment => "comment",
            Reason::Invitation => "invitation",
            Reason::Manual => "manual",
            Reason::MemberFeatureRequested => "member_feature_requested",
            Reason::Mention => "mention",
            Reason::ReviewRequested => "review_requested",
            Reason::SecurityAdvisoryCredit => "security_advisory_credit",
            Reason::SecurityAlert => "security_alert",
            Reason::StateChange => "state_change",
            Reason::Subscribed => "subscribed",
            Reason::TeamMention => "team_mention",
            Reason::Unknown(raw) => raw,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Reason::ApprovalRequested => "Approval Requested",
            Reason::Assign => "Assigned",
            Reason::Author => "Authored",
            Reason::CiActivity => "Workflow Run Completed",
            Reason::Comment => "Commented",
            Reason::Invitation => "Invitation Received",
            Reason::Manual => "Updated",
            Reason::MemberFeatureRequested => "Member Feature Requested",
            Reason::Mention => "Mentioned",
            Reason::ReviewRequested => "Review Requested",
            Reason::SecurityAdvisoryCredit => "Security Advisory Credit Received",
            Reason::SecurityAlert => "Security Alert Received",
            Reason::StateChange => "State Changed",
            Reason::Subscribed => "Updated",
            Reason::TeamMention => "Team Mentioned",
            Reason::Unknown(_) => "Unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Reason::ApprovalRequested => "You were requested to review and approve a deployment.",
            Reason::Assign => "You were assigned to the issue.",
            Reason::Author => "You created the thread.",
            Reason::CiActivity => {
                "A GitHub Actions workflow run was triggered for your repository."
            }
            Reason::Comment => "You commented on the thread.",
            Reason::Invitation => "You accepted an invitation to contribute to the repository.",
            Reason::Manual => "You subscribed to the thread (via an issue or pull request).",
            Reason::MemberFeatureRequested => {
                "Organization members have requested to enable a feature such as Draft Pull Requests or Copilot."
            }
            Reason::Mention => "You were specifically @mentioned in the content.",
            Reason::ReviewRequested => {
                "You, or a team you're a member of, were requested to review a pull request."
            }
            Reason::SecurityAdvisoryCredit => {
                "You were credited for contributing to a security advisory."
            }
            Reason::SecurityAlert => "GitHub discovered a security vulnerability in your repository.",
            Reason::StateChange => {
                "You changed the thread state (for example, closing an issue or merging a pull request)."
            }
            Reason::Subscribed => "You're watching the repository.",
            Reason::TeamMention => "You were on a team that was mentioned.",
            Reason::Unknown(_) => "The reason for this notification is not supported by the app.",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Reason {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| Reason::Unknown(value))
    }
}

impl From<Reason> for String {
    fn from(value: Reason) -> Self {
        value.as_str().to_string()
    }
}

/// Subject state as derived during enrichment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum NotificationState {
    // Issues, pull requests and discussions
    Open,
    Closed,
    Merged,
    Draft,
    MergeQueue,
    Reopened,
    Completed,
    NotPlanned,
    Duplicate,
    Outdated,
    Resolved,
    Answered,
    // Check suites and workflow runs
    ActionRequired,
    Cancelled,
    Failure,
    InProgress,
    Pending,
    Queued,
    Requested,
    Skipped,
    Stale,
    Success,
    TimedOut,
    Waiting,
}

/// Kind of GitHub actor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum UserType {
    Bot,
    EnterpriseUserAccount,
    Mannequin,
    Organization,
    User,
    #[serde(other)]
    Unknown,
}

impl UserType {
    /// Map a REST `type` or GraphQL `__typename` value.
    pub fn from_type_name(name: &str) -> Self {
        name.parse().unwrap_or(UserType::Unknown)
    }
}

/// The user a notification is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectUser {
    pub login: String,
    pub html_url: Option<String>,
    pub avatar_url: Option<String>,
    pub user_type: UserType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub state: String,
}

/// Reviewers that share a review state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestReview {
    pub state: String,
    pub users: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub title: String,
    #[serde(rename = "type")]
    pub subject_type: SubjectType,
    pub url: Option<String>,
    pub latest_comment_url: Option<String>,
    pub number: Option<u64>,
    pub state: Option<NotificationState>,
    pub user: Option<SubjectUser>,
    pub comment_count: Option<u64>,
    pub labels: Vec<String>,
    pub milestone: Option<Milestone>,
    pub reviews: Vec<PullRequestReview>,
    pub linked_issues: Vec<String>,
    pub html_url: Option<String>,
}

impl Subject {
    /// Merge enrichment output. Fields the handler did not produce keep
    /// their current value.
    pub fn apply(&mut self, details: SubjectDetails) {
        if details.number.is_some() {
            self.number = details.number;
        }
        if details.state.is_some() {
            self.state = details.state;
        }
        if details.user.is_some() {
            self.user = details.user;
        }
        if details.comment_count.is_some() {
            self.comment_count = details.comment_count;
        }
        if let Some(labels) = details.labels {
            self.labels = labels;
        }
        if details.milestone.is_some() {
            self.milestone = details.milestone;
        }
        if let Some(reviews) = details.reviews {
            self.reviews = reviews;
        }
        if let Some(linked_issues) = details.linked_issues {
            self.linked_issues = linked_issues;
        }
        if details.html_url.is_some() {
            self.html_url = details.html_url;
        }
    }
}

/// Subject fields produced by a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectDetails {
    pub number: Option<u64>,
    pub state: Option<NotificationState>,
    pub user: Option<SubjectUser>,
    pub comment_count: Option<u64>,
    pub labels: Option<Vec<String>>,
    pub milestone: Option<Milestone>,
    pub reviews: Option<Vec<PullRequestReview>>,
    pub linked_issues: Option<Vec<String>>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
    pub avatar_url: Option<String>,
    pub user_type: UserType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub private: bool,
    pub owner: RepositoryOwner,
}

impl From<RawRepository> for Repository {
    fn from(raw: RawRepository) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            full_name: raw.full_name,
            html_url: raw.html_url,
            private: raw.private,
            owner: RepositoryOwner {
                login: raw.owner.login,
                avatar_url: raw.owner.avatar_url,
                user_type: raw
                    .owner
                    .type_field
                    .as_deref()
                    .map(UserType::from_type_name)
                    .unwrap_or(UserType::Unknown),
            },
        }
    }
}

/// A notification thread bound to the account that received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub unread: bool,
    pub updated_at: DateTime<Utc>,
    pub reason: Reason,
    pub subject: Subject,
    pub repository: Option<Repository>,
    pub account: Arc<Account>,
    /// Position in the display order of the last poll.
    pub order: usize,
}

impl Notification {
    pub fn repository_full_name(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.full_name.as_str())
    }

    pub fn owner_login(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.owner.login.as_str())
    }
}

/// One account's result for a poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountNotifications {
    pub account: Arc<Account>,
    pub notifications: Vec<Notification>,
    pub error: Option<GitifyError>,
}

pub fn transform_notification(raw: RawNotification, account: &Arc<Account>) -> Notification {
    Notification {
        id: raw.id,
        unread: raw.unread,
        updated_at: raw.updated_at,
        reason: Reason::from(raw.reason),
        subject: Subject {
            title: raw.subject.title,
            subject_type: SubjectType::from(raw.subject.subject_type),
            url: raw.subject.url,
            latest_comment_url: raw.subject.latest_comment_url,
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
        repository: raw.repository.map(Repository::from),
        account: Arc::clone(account),
        order: 0,
    }
}

/// Number at the end of an API URL such as `.../issues/42`.
pub fn number_from_url(url: &str) -> Option<u64> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}
