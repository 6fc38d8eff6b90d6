use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::notifications::NotificationState;

/// Coarse state buckets offered by the state filter.
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
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StateCategory {
    Draft,
    Open,
    Merged,
    Closed,
    Other,
}

impl StateCategory {
    pub fn title(&self) -> &'static str {
        match self {
            StateCategory::Draft => "Draft",
            StateCategory::Open => "Open",
            StateCategory::Merged => "Merged",
            StateCategory::Closed => "Closed",
            StateCategory::Other => "Other",
        }
    }

    pub fn description(&self) -> Option<&'static str> {
        match self {
            StateCategory::Open => Some("Open or reopened"),
            StateCategory::Closed => Some("Closed, completed, duplicate, resolved or not planned"),
            StateCategory::Other => Some("Catch all for any other notification states"),
            StateCategory::Draft | StateCategory::Merged => None,
        }
    }
}

/// Bucket a subject state. Missing and workflow states fall into `Other`.
pub fn map_state_to_filter(state: Option<NotificationState>) -> StateCategory {
    match state {
        Some(NotificationState::Open | NotificationState::Reopened) => StateCategory::Open,
        Some(
            NotificationState::Closed
            | NotificationState::Completed
            | NotificationState::Duplicate
            | NotificationState::NotPlanned
            | NotificationState::Resolved,
        ) => StateCategory::Closed,
        Some(NotificationState::MergeQueue | NotificationState::Merged) => StateCategory::Merged,
        Some(NotificationState::Draft) => StateCategory::Draft,
        _ => StateCategory::Other,
    }
}
