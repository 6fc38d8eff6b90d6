//! Accounts, host platforms and host feature gates.

pub mod credentials;
pub mod version;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub use credentials::{CredentialError, PassthroughCipher, Token, TokenCipher};
pub use version::{HostVersion, Version, extract_host_version};

use crate::providers::GitHubApi;

/// Hostname of GitHub cloud.
pub const GITHUB_HOSTNAME: &str = "github.com";

/// Scopes a classic token needs for full functionality.
pub const RECOMMENDED_SCOPES: &[&str] = &["read:user", "notifications", "repo"];

/// Reduced scope set that only covers public repositories.
pub const ALTERNATE_SCOPES: &[&str] = &["read:user", "notifications", "public_repo"];

static HOSTNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Z0-9]([A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}$")
        .expect("valid hostname regex")
});

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[A-Z0-9_]{40}$").expect("valid token regex"));

/// How an account authenticated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum AuthMethod {
    #[serde(rename = "GitHub App")]
    #[strum(serialize = "GitHub App")]
    GitHubApp,
    #[serde(rename = "Personal Access Token")]
    #[strum(serialize = "Personal Access Token")]
    PersonalAccessToken,
    #[serde(rename = "OAuth App")]
    #[strum(serialize = "OAuth App")]
    OAuthApp,
}

/// Hosting platform, derived from the hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum Platform {
    #[strum(serialize = "GitHub Cloud")]
    GitHubCloud,
    #[strum(serialize = "GitHub Enterprise Server")]
    GitHubEnterpriseServer,
}

impl Platform {
    pub fn from_hostname(hostname: &str) -> Self {
        if is_enterprise_server_host(hostname) {
            Platform::GitHubEnterpriseServer
        } else {
            Platform::GitHubCloud
        }
    }
}

/// Any host other than github.com is an Enterprise Server instance.
pub fn is_enterprise_server_host(hostname: &str) -> bool {
    !hostname.to_ascii_lowercase().ends_with(GITHUB_HOSTNAME)
}

/// Profile of the authenticated user behind an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: String,
    pub login: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// Stable identity of an account: base64 of `hostname-userId-method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountUuid(String);

impl AccountUuid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A GitHub identity on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub hostname: String,
    pub method: AuthMethod,
    pub token: Token,
    #[serde(default)]
    pub user: Option<AccountUser>,
    #[serde(default)]
    pub version: Option<HostVersion>,
    #[serde(default)]
    pub has_required_scopes: Option<bool>,
}

impl Account {
    pub fn new(hostname: impl Into<String>, method: AuthMethod, token: Token) -> Self {
        Self {
            hostname: hostname.into(),
            method,
            token,
            user: None,
            version: None,
            has_required_scopes: None,
        }
    }

    pub fn platform(&self) -> Platform {
        Platform::from_hostname(&self.hostname)
    }

    /// Identity used for deduplication and client caching.
    ///
    /// Accounts that have not been refreshed yet have no user id; they hash
    /// with an empty id segment.
    pub fn uuid(&self) -> AccountUuid {
        let user_id = self.user.as_ref().map(|u| u.id.as_str()).unwrap_or("");
        AccountUuid(STANDARD.encode(format!(
            "{}-{}-{}",
            self.hostname, user_id, self.method
        )))
    }

    /// Login of the authenticated user, or the hostname when unknown.
    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.login.as_str())
            .unwrap_or(self.hostname.as_str())
    }
}

/// Whether the host supports `DELETE /notifications/threads/{id}`.
///
/// Cloud always does. Enterprise Server needs 3.13 or later and an unknown
/// version is treated as unsupported.
pub fn supports_mark_as_done(account: &Account) -> bool {
    supports_feature(account, 3, 13)
}

/// Whether the host's GraphQL schema exposes `Discussion.isAnswered`.
/// Enterprise Server needs 3.12 or later.
pub fn supports_answered_discussions(account: &Account) -> bool {
    supports_feature(account, 3, 12)
}

fn supports_feature(account: &Account, major: u64, minor: u64) -> bool {
    if !is_enterprise_server_host(&account.hostname) {
        return true;
    }

    match account.version {
        Some(HostVersion::Latest) => true,
        Some(HostVersion::Release(version)) => version.at_least(major, minor),
        None => false,
    }
}

/// True when `scopes` covers either the recommended or the alternate set.
pub fn has_required_scopes(scopes: &[String]) -> bool {
    let covers = |required: &[&str]| {
        required
            .iter()
            .all(|needed| scopes.iter().any(|scope| scope == needed))
    };
    covers(RECOMMENDED_SCOPES) || covers(ALTERNATE_SCOPES)
}

pub fn is_valid_hostname(hostname: &str) -> bool {
    HOSTNAME_PATTERN.is_match(hostname)
}

pub fn is_valid_token(token: &str) -> bool {
    TOKEN_PATTERN.is_match(token)
}

/// URL that pre-fills the "new personal access token" form on `hostname`.
pub fn new_token_url(hostname: &str) -> Result<url::Url, url::ParseError> {
    let created = chrono::Local::now().format("%b %-d, %Y %-I:%M %p");
    let mut url = url::Url::parse(&format!("https://{}/settings/tokens/new", hostname))?;
    url.query_pairs_mut()
        .append_pair("description", &format!("gitnotify (Created on {})", created))
        .append_pair("scopes", &RECOMMENDED_SCOPES.join(","));
    Ok(url)
}

/// Re-validate an account against its host.
///
/// Refreshes the user profile, the host version and the scope check. A
/// failed request is logged and the account is returned unchanged.
pub async fn refresh_account(api: &dyn GitHubApi, mut account: Account) -> Account {
    match api.fetch_authenticated_user(&account).await {
        Ok(details) => {
            account.user = Some(AccountUser {
                id: details.user.id.to_string(),
                login: details.user.login,
                name: details.user.name,
                avatar: details.user.avatar_url,
            });
            account.version = extract_host_version(details.enterprise_version.as_deref());

            let has_scopes = has_required_scopes(&details.scopes);
            account.has_required_scopes = Some(has_scopes);
            if !has_scopes {
                tracing::warn!(
                    "Account for user {} is missing required scopes",
                    account.display_name()
                );
            }
        }
        Err(e) => {
            tracing::error!(
                "Failed to refresh account for user {}: {}",
                account.display_name(),
                e
            );
        }
    }

    account
}
