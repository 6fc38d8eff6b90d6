use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::FilterError;
use crate::notifications::Notification;

pub const AUTHOR_PREFIX: &str = "author:";
pub const ORG_PREFIX: &str = "org:";
pub const REPO_PREFIX: &str = "repo:";

pub const SEARCH_PREFIXES: &[&str] = &[AUTHOR_PREFIX, ORG_PREFIX, REPO_PREFIX];

/// Which qualifier a search token uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchQualifier {
    Author,
    Org,
    Repo,
}

/// A qualified search token such as `author:octocat` or `repo:owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SearchToken {
    pub qualifier: SearchQualifier,
    pub value: String,
}

impl SearchToken {
    pub fn author(value: impl Into<String>) -> Self {
        Self {
            qualifier: SearchQualifier::Author,
            value: value.into(),
        }
    }

    pub fn org(value: impl Into<String>) -> Self {
        Self {
            qualifier: SearchQualifier::Org,
            value: value.into(),
        }
    }

    pub fn repo(value: impl Into<String>) -> Self {
        Self {
            qualifier: SearchQualifier::Repo,
            value: value.into(),
        }
    }

    pub fn is_author(&self) -> bool {
        self.qualifier == SearchQualifier::Author
    }

    /// Exact, case-insensitive comparison against the field the qualifier
    /// names. A missing field never matches.
    pub fn matches(&self, notification: &Notification) -> bool {
        let field = match self.qualifier {
            SearchQualifier::Author => notification.subject.user.as_ref().map(|u| u.login.as_str()),
            SearchQualifier::Org => notification.owner_login(),
            SearchQualifier::Repo => notification.repository_full_name(),
        };

        field
            .map(|field| field.eq_ignore_ascii_case(&self.value))
            .unwrap_or(false)
    }
}

impl fmt::Display for SearchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.qualifier {
            SearchQualifier::Author => AUTHOR_PREFIX,
            SearchQualifier::Org => ORG_PREFIX,
            SearchQualifier::Repo => REPO_PREFIX,
        };
        write!(f, "{}{}", prefix, self.value)
    }
}

impl FromStr for SearchToken {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (prefix, value) = match trimmed.find(':') {
            Some(idx) => (&trimmed[..=idx], trimmed[idx + 1..].trim()),
            None => {
                return Err(FilterError::MissingQualifier {
                    token: s.to_string(),
                });
            }
        };

        if value.is_empty() {
            return Err(FilterError::EmptyValue {
                token: s.to_string(),
            });
        }

        match prefix.to_ascii_lowercase().as_str() {
            AUTHOR_PREFIX => Ok(Self::author(value)),
            ORG_PREFIX => Ok(Self::org(value)),
            REPO_PREFIX => Ok(Self::repo(value)),
            _ => Err(FilterError::UnknownQualifier {
                qualifier: prefix.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for SearchToken {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SearchToken> for String {
    fn from(value: SearchToken) -> Self {
        value.to_string()
    }
}
