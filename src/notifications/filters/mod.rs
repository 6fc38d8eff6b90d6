//! Two stage filter pipeline.
//!
//! The base stage only looks at fields present on the raw thread and runs
//! before enrichment so filtered threads never cost API quota. The detailed
//! stage needs enriched fields (user, state) and only runs when detailed
//! notifications are enabled. Empty predicate lists pass everything.

pub mod search;
pub mod state;

use serde::{Deserialize, Serialize};

pub use search::{SEARCH_PREFIXES, SearchQualifier, SearchToken};
pub use state::{StateCategory, map_state_to_filter};

use super::{AccountNotifications, Notification, NotificationState, Reason, SubjectType, SubjectUser, UserType};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Search token '{token}' must start with one of {}", SEARCH_PREFIXES.join(", "))]
    MissingQualifier { token: String },
    #[error("Search token '{token}' has no value")]
    EmptyValue { token: String },
    #[error("Unknown search qualifier '{qualifier}', expected one of {}", SEARCH_PREFIXES.join(", "))]
    UnknownQualifier { qualifier: String },
    /// Author tokens may only live on one side at a time.
    #[error("Cannot add '{token}': clear the {other} author filters first")]
    HandleConflict { token: SearchToken, other: &'static str },
}

/// Whether a search token narrows (include) or removes (exclude).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

/// Active filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub include_search_tokens: Vec<SearchToken>,
    pub exclude_search_tokens: Vec<SearchToken>,
    pub user_types: Vec<UserType>,
    pub subject_types: Vec<SubjectType>,
    pub reasons: Vec<Reason>,
    pub states: Vec<StateCategory>,
}

impl FilterSettings {
    /// Add a search token, ignoring duplicates.
    ///
    /// Include and exclude handle (`author:`) lists are mutually exclusive:
    /// adding an author token to one side while the other side holds author
    /// tokens is rejected.
    pub fn add_search_token(&mut self, mode: FilterMode, token: SearchToken) -> Result<(), FilterError> {
        if token.is_author() && !self.can_edit_handles(mode) {
            let other = match mode {
                FilterMode::Include => "exclude",
                FilterMode::Exclude => "include",
            };
            return Err(FilterError::HandleConflict { token, other });
        }

        let tokens = match mode {
            FilterMode::Include => &mut self.include_search_tokens,
            FilterMode::Exclude => &mut self.exclude_search_tokens,
        };
        if !tokens.contains(&token) {
            tokens.push(token);
        }
        Ok(())
    }

    pub fn remove_search_token(&mut self, mode: FilterMode, token: &SearchToken) {
        let tokens = match mode {
            FilterMode::Include => &mut self.include_search_tokens,
            FilterMode::Exclude => &mut self.exclude_search_tokens,
        };
        tokens.retain(|t| t != token);
    }

    /// Handles can be edited on one side only while the other side has none.
    pub fn can_edit_handles(&self, mode: FilterMode) -> bool {
        let other = match mode {
            FilterMode::Include => &self.exclude_search_tokens,
            FilterMode::Exclude => &self.include_search_tokens,
        };
        !other.iter().any(SearchToken::is_author)
    }

    pub fn include_handles(&self) -> impl Iterator<Item = &str> {
        tokens_with(&self.include_search_tokens, SearchQualifier::Author)
    }

    pub fn exclude_handles(&self) -> impl Iterator<Item = &str> {
        tokens_with(&self.exclude_search_tokens, SearchQualifier::Author)
    }

    pub fn include_organizations(&self) -> impl Iterator<Item = &str> {
        tokens_with(&self.include_search_tokens, SearchQualifier::Org)
    }

    pub fn exclude_organizations(&self) -> impl Iterator<Item = &str> {
        tokens_with(&self.exclude_search_tokens, SearchQualifier::Org)
    }

    pub fn clear(&mut self) {
        *self = FilterSettings::default();
    }
}

fn tokens_with(tokens: &[SearchToken], qualifier: SearchQualifier) -> impl Iterator<Item = &str> {
    tokens
        .iter()
        .filter(move |t| t.qualifier == qualifier)
        .map(|t| t.value.as_str())
}

/// True iff any predicate list is non-empty.
pub fn has_any_filters_set(filters: &FilterSettings) -> bool {
    !filters.user_types.is_empty()
        || !filters.include_search_tokens.is_empty()
        || !filters.exclude_search_tokens.is_empty()
        || !filters.subject_types.is_empty()
        || !filters.states.is_empty()
        || !filters.reasons.is_empty()
}

/// Pre-enrichment stage: organization and repository tokens, subject types
/// and reasons.
pub fn filter_base_notifications(
    notifications: Vec<Notification>,
    filters: &FilterSettings,
) -> Vec<Notification> {
    notifications
        .into_iter()
        .filter(|n| passes_base_filters(n, filters))
        .collect()
}

/// Post-enrichment stage: user types, author tokens and states. A no-op
/// unless `detailed` is set.
pub fn filter_detailed_notifications(
    notifications: Vec<Notification>,
    filters: &FilterSettings,
    detailed: bool,
) -> Vec<Notification> {
    if !detailed {
        return notifications;
    }

    notifications
        .into_iter()
        .filter(|n| passes_user_filters(n, filters) && passes_state_filter(n.subject.state, filters))
        .collect()
}

pub fn passes_base_filters(notification: &Notification, filters: &FilterSettings) -> bool {
    passes_search_tokens_for(notification, filters, SearchQualifier::Org)
        && passes_search_tokens_for(notification, filters, SearchQualifier::Repo)
        && (filters.subject_types.is_empty()
            || filters
                .subject_types
                .iter()
                .any(|t| subject_type_matches(notification, t)))
        && (filters.reasons.is_empty()
            || filters.reasons.iter().any(|r| reason_matches(notification, r)))
}

fn passes_user_filters(notification: &Notification, filters: &FilterSettings) -> bool {
    let user = notification.subject.user.as_ref();
    (filters.user_types.is_empty()
        || filters
            .user_types
            .iter()
            .any(|t| user_type_matches(user, *t)))
        && passes_search_tokens_for(notification, filters, SearchQualifier::Author)
}

fn passes_state_filter(state: Option<NotificationState>, filters: &FilterSettings) -> bool {
    filters.states.is_empty()
        || filters
            .states
            .iter()
            .any(|category| *category == map_state_to_filter(state))
}

/// Include tokens of one qualifier need at least one match, exclude tokens
/// of that qualifier must not match. Other qualifiers are ignored.
fn passes_search_tokens_for(
    notification: &Notification,
    filters: &FilterSettings,
    qualifier: SearchQualifier,
) -> bool {
    let mut includes = filters
        .include_search_tokens
        .iter()
        .filter(|t| t.qualifier == qualifier)
        .peekable();
    if includes.peek().is_some() && !includes.any(|t| t.matches(notification)) {
        return false;
    }

    !filters
        .exclude_search_tokens
        .iter()
        .filter(|t| t.qualifier == qualifier)
        .any(|t| t.matches(notification))
}

/// Whether a handler that derived `state` would have its notification
/// removed by the state filter.
pub fn is_state_filtered_out(state: Option<NotificationState>, filters: &FilterSettings) -> bool {
    !passes_state_filter(state, filters)
}

pub fn subject_type_matches(notification: &Notification, subject_type: &SubjectType) -> bool {
    &notification.subject.subject_type == subject_type
}

pub fn reason_matches(notification: &Notification, reason: &Reason) -> bool {
    &notification.reason == reason
}

/// `User` also covers enterprise managed accounts. A missing user never
/// matches.
pub fn user_type_matches(user: Option<&SubjectUser>, user_type: UserType) -> bool {
    match user {
        None => false,
        Some(user) => match user_type {
            UserType::User => matches!(
                user.user_type,
                UserType::User | UserType::EnterpriseUserAccount
            ),
            other => user.user_type == other,
        },
    }
}

pub fn state_matches(notification: &Notification, category: StateCategory) -> bool {
    map_state_to_filter(notification.subject.state) == category
}

fn count_matching(
    account_notifications: &[AccountNotifications],
    predicate: impl Fn(&Notification) -> bool,
) -> usize {
    account_notifications
        .iter()
        .map(|account| account.notifications.iter().filter(|n| predicate(n)).count())
        .sum()
}

pub fn subject_type_filter_count(
    account_notifications: &[AccountNotifications],
    subject_type: &SubjectType,
) -> usize {
    count_matching(account_notifications, |n| subject_type_matches(n, subject_type))
}

pub fn reason_filter_count(account_notifications: &[AccountNotifications], reason: &Reason) -> usize {
    count_matching(account_notifications, |n| reason_matches(n, reason))
}

pub fn user_type_filter_count(
    account_notifications: &[AccountNotifications],
    user_type: UserType,
) -> usize {
    count_matching(account_notifications, |n| {
        user_type_matches(n.subject.user.as_ref(), user_type)
    })
}

pub fn state_filter_count(
    account_notifications: &[AccountNotifications],
    category: StateCategory,
) -> usize {
    count_matching(account_notifications, |n| state_matches(n, category))
}

pub fn search_token_filter_count(
    account_notifications: &[AccountNotifications],
    token: &SearchToken,
) -> usize {
    count_matching(account_notifications, |n| token.matches(n))
}
