//! Response shapes of the detail fragments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::notifications::{Milestone, NotificationState, SubjectUser, UserType};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub login: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "__typename", default)]
    pub typename: Option<String>,
}

impl Author {
    pub fn to_subject_user(&self) -> SubjectUser {
        SubjectUser {
            login: self.login.clone(),
            html_url: self.url.clone(),
            avatar_url: self.avatar_url.clone(),
            user_type: self
                .typename
                .as_deref()
                .map(UserType::from_type_name)
                .unwrap_or(UserType::User),
        }
    }
}

/// A GraphQL connection. `null` entries in `nodes` (deleted or
/// inaccessible items) are dropped instead of failing the whole fragment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default = "Vec::new", deserialize_with = "present_nodes")]
    pub nodes: Vec<T>,
}

fn present_nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let nodes: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(nodes.unwrap_or_default().into_iter().flatten().collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelNode {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneNode {
    pub title: String,
    pub state: String,
}

impl From<MilestoneNode> for Milestone {
    fn from(node: MilestoneNode) -> Self {
        Milestone {
            title: node.title,
            state: node.state,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentNode {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionReplyNode {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionCommentNode {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub replies: Option<Connection<DiscussionReplyNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionDetails {
    pub number: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub state_reason: Option<String>,
    #[serde(default)]
    pub is_answered: Option<bool>,
    #[serde(default)]
    pub comments: Option<Connection<DiscussionCommentNode>>,
    #[serde(default)]
    pub labels: Option<Connection<LabelNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetails {
    pub number: u64,
    #[serde(default)]
    pub url: Option<String>,
    pub state: String,
    #[serde(default)]
    pub state_reason: Option<String>,
    #[serde(default)]
    pub milestone: Option<MilestoneNode>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub comments: Option<Connection<CommentNode>>,
    #[serde(default)]
    pub labels: Option<Connection<LabelNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewAuthor {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewNode {
    pub state: String,
    #[serde(default)]
    pub author: Option<ReviewAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClosingIssueNode {
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestDetails {
    pub number: u64,
    #[serde(default)]
    pub url: Option<String>,
    pub state: String,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_in_merge_queue: Option<bool>,
    #[serde(default)]
    pub milestone: Option<MilestoneNode>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub comments: Option<Connection<CommentNode>>,
    #[serde(default)]
    pub reviews: Option<Connection<ReviewNode>>,
    #[serde(default)]
    pub labels: Option<Connection<LabelNode>>,
    #[serde(default)]
    pub closing_issues_references: Option<Connection<ClosingIssueNode>>,
}

/// Parse a GraphQL enum value into a state, ignoring values this crate does
/// not model.
pub fn parse_state(raw: &str) -> Option<NotificationState> {
    raw.parse().ok()
}

pub fn label_names(labels: Option<Connection<LabelNode>>) -> Vec<String> {
    labels
        .map(|c| c.nodes.into_iter().map(|l| l.name).collect())
        .unwrap_or_default()
}
