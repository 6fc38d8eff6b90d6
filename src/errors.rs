use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::notifications::AccountNotifications;

/// Failure raised by the transport layer.
///
/// `status` is the HTTP status code when a response was received. Errors
/// raised before any response (DNS, refused connections, TLS) carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Error raised before any HTTP response was received.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    /// A response arrived but its body did not match the expected shape.
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::new(Some(200), format!("Failed to decode response: {}", err))
    }

    /// A GraphQL response carried an `errors` array.
    pub fn graphql(messages: &[String]) -> Self {
        let message = if messages.is_empty() {
            "GraphQL request returned errors".to_string()
        } else {
            format!("GraphQL request returned errors: {}", messages.join("; "))
        };
        Self::new(Some(200), message)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

/// Per-account failure kind shown to the user.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GitifyError {
    BadCredentials,
    MissingScopes,
    Network,
    RateLimited,
    Unknown,
}

impl std::error::Error for GitifyError {}

impl GitifyError {
    pub fn title(&self) -> &'static str {
        match self {
            GitifyError::BadCredentials => "Bad Credentials",
            GitifyError::MissingScopes => "Missing Scopes",
            GitifyError::Network => "Network Error",
            GitifyError::RateLimited => "Rate Limited",
            GitifyError::Unknown => "Oops! Something went wrong",
        }
    }

    pub fn descriptions(&self) -> &'static [&'static str] {
        match self {
            GitifyError::BadCredentials => &["Your credentials are either invalid or expired."],
            GitifyError::MissingScopes => &["Your credentials are missing a required API scope."],
            GitifyError::Network => &[
                "Unable to connect to one or more of your GitHub environments.",
                "Please check your network connection, including whether you require a VPN, and try again.",
            ],
            GitifyError::RateLimited => &["Please wait a while before trying again."],
            GitifyError::Unknown => &["Please try again later."],
        }
    }

    pub fn emojis(&self) -> &'static [&'static str] {
        match self {
            GitifyError::BadCredentials => &["🔓"],
            GitifyError::MissingScopes => &["🔭"],
            GitifyError::Network => &["🛜"],
            GitifyError::RateLimited => &["😮‍💨"],
            GitifyError::Unknown => &["🤔", "🥲", "😳", "🫠", "🙃", "🙈"],
        }
    }
}

/// Classify a transport failure into a [`GitifyError`].
///
/// 401 is always bad credentials. 403 is split by message into missing
/// scopes and rate limiting. A missing or zero status is a network failure.
/// Everything else is unknown.
pub fn determine_failure_type(err: &ApiError) -> GitifyError {
    match err.status {
        Some(401) => GitifyError::BadCredentials,
        Some(403) if err.message.contains("Missing the 'notifications' scope") => {
            GitifyError::MissingScopes
        }
        Some(403)
            if err.message.contains("API rate limit exceeded")
                || err
                    .message
                    .contains("You have exceeded a secondary rate limit") =>
        {
            GitifyError::RateLimited
        }
        None | Some(0) => GitifyError::Network,
        Some(_) => GitifyError::Unknown,
    }
}

/// Error surfaced once every account failed during a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalError {
    /// Every account failed with the same kind.
    Specific(GitifyError),
    /// Accounts failed with different kinds.
    Mixed,
}

/// True when the list is non-empty and every account carries an error.
pub fn does_all_accounts_have_errors(account_notifications: &[AccountNotifications]) -> bool {
    !account_notifications.is_empty()
        && account_notifications
            .iter()
            .all(|account| account.error.is_some())
}

/// True when every account carries the same error (or no error). An empty
/// list counts as uniform.
pub fn are_all_account_errors_same(account_notifications: &[AccountNotifications]) -> bool {
    match account_notifications.first() {
        None => true,
        Some(first) => account_notifications
            .iter()
            .all(|account| account.error == first.error),
    }
}

pub fn global_error(account_notifications: &[AccountNotifications]) -> Option<GlobalError> {
    if !does_all_accounts_have_errors(account_notifications) {
        return None;
    }

    if are_all_account_errors_same(account_notifications) {
        account_notifications
            .first()
            .and_then(|account| account.error)
            .map(GlobalError::Specific)
    } else {
        Some(GlobalError::Mixed)
    }
}
