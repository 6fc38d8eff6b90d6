//! Wire shapes of the GitHub REST responses the engine consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification thread as returned by `GET /notifications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNotification {
    pub id: String,
    pub unread: bool,
    pub reason: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_read_at: Option<DateTime<Utc>>,
    pub subject: RawSubject,
    #[serde(default)]
    pub repository: Option<RawRepository>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub subscription_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSubject {
    pub title: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub latest_comment_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub private: bool,
    pub owner: RawOwner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOwner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(rename = "type", default)]
    pub type_field: Option<String>,
}

/// A user object embedded in REST payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestUser {
    pub login: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "type")]
    pub type_field: String,
}

/// `GET /repos/{owner}/{repo}/commits/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitResponse {
    #[serde(default)]
    pub author: Option<RestUser>,
}

/// `GET /repos/{owner}/{repo}/comments/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitCommentResponse {
    #[serde(default)]
    pub user: Option<RestUser>,
}

/// `GET /repos/{owner}/{repo}/releases/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseResponse {
    #[serde(default)]
    pub author: Option<RestUser>,
}

/// `GET /user`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDetails {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// `GET /user` together with the headers the account refresh reads.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: UserDetails,
    /// `x-github-enterprise-version`, absent on cloud.
    pub enterprise_version: Option<String>,
    /// `x-oauth-scopes`, split and trimmed.
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQLErrorEntry {
    pub message: String,
}

/// Body of a GraphQL response before `errors` handling.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<GraphQLErrorEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_notification_thread() {
        let json = r#"{
            "id": "138661096",
            "unread": true,
            "reason": "subscribed",
            "updated_at": "2017-05-20T17:51:57Z",
            "last_read_at": "2017-05-20T16:59:03Z",
            "subject": {
                "title": "I am a robot and this is a test!",
                "url": "https://api.github.com/repos/gitify-app/notifications-test/issues/1",
                "latest_comment_url": "https://api.github.com/repos/gitify-app/notifications-test/issues/comments/302888448",
                "type": "Issue"
            },
            "repository": {
                "id": 57216596,
                "name": "notifications-test",
                "full_name": "gitify-app/notifications-test",
                "html_url": "https://github.com/gitify-app/notifications-test",
                "private": true,
                "owner": {"login": "gitify-app", "type": "Organization"}
            },
            "url": "https://api.github.com/notifications/threads/138661096"
        }"#;

        let raw: RawNotification = serde_json::from_str(json).unwrap();
        assert_eq!(raw.id, "138661096");
        assert_eq!(raw.subject.subject_type, "Issue");
        assert_eq!(
            raw.repository.as_ref().map(|r| r.owner.login.as_str()),
            Some("gitify-app")
        );
    }
}
