use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{EnrichContext, Enrichment, IconKind, NotificationHandler, actions_url, repository_subpage};
use crate::errors::ApiError;
use crate::notifications::filters::is_state_filtered_out;
use crate::notifications::{Notification, NotificationState, Subject, SubjectDetails, SubjectType};

// GitHub offers no API for the state of a check suite thread, so it is read
// from the title.
static CHECK_SUITE_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<workflow_name>.*?) workflow run(, Attempt #(?P<attempt_number>\d+))? (?P<status_display_name>.*?) for (?P<branch_name>.*?) branch$",
    )
    .unwrap()
});

/// Fields parsed from a check suite notification title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSuiteAttributes {
    pub workflow_name: String,
    pub attempt_number: Option<u32>,
    pub status_display_name: String,
    pub status: Option<NotificationState>,
    pub branch_name: String,
}

pub fn check_suite_attributes(notification: &Notification) -> Option<CheckSuiteAttributes> {
    let captures = CHECK_SUITE_TITLE.captures(&notification.subject.title)?;
    let status_display_name = captures["status_display_name"].to_string();

    Some(CheckSuiteAttributes {
        workflow_name: captures["workflow_name"].to_string(),
        attempt_number: captures
            .name("attempt_number")
            .and_then(|m| m.as_str().parse().ok()),
        status: check_suite_status(&status_display_name),
        status_display_name,
        branch_name: captures["branch_name"].to_string(),
    })
}

fn check_suite_status(status_display_name: &str) -> Option<NotificationState> {
    match status_display_name {
        "cancelled" => Some(NotificationState::Cancelled),
        "failed" | "failed at startup" => Some(NotificationState::Failure),
        "skipped" => Some(NotificationState::Skipped),
        "succeeded" => Some(NotificationState::Success),
        _ => None,
    }
}

/// Actions page filtered to the workflow, status and branch of the run.
pub fn check_suite_url(notification: &Notification) -> String {
    let mut filters = Vec::new();

    if let Some(attributes) = check_suite_attributes(notification) {
        if !attributes.workflow_name.is_empty() {
            filters.push(format!(
                "workflow:\"{}\"",
                attributes.workflow_name.replace(' ', "+")
            ));
        }
        if let Some(status) = attributes.status {
            filters.push(format!("is:{}", status));
        }
        if !attributes.branch_name.is_empty() {
            filters.push(format!("branch:{}", attributes.branch_name));
        }
    }

    actions_url(notification, &filters)
}

pub struct CheckSuiteHandler;

#[async_trait]
impl NotificationHandler for CheckSuiteHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::CheckSuite)
    }

    async fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        notification: &Notification,
        _fetched: Option<&Value>,
    ) -> Result<Enrichment, ApiError> {
        let Some(state) = check_suite_attributes(notification).and_then(|a| a.status) else {
            return Ok(Enrichment::NotApplicable);
        };

        if is_state_filtered_out(Some(state), ctx.filters) {
            return Ok(Enrichment::FilteredOut);
        }

        Ok(Enrichment::Enriched(SubjectDetails {
            state: Some(state),
            html_url: Some(check_suite_url(notification)),
            ..Default::default()
        }))
    }

    fn icon_type(&self, subject: &Subject) -> IconKind {
        match subject.state {
            Some(NotificationState::Cancelled) => IconKind::Stop,
            Some(NotificationState::Failure) => IconKind::X,
            Some(NotificationState::Skipped) => IconKind::Skip,
            Some(NotificationState::Success) => IconKind::Check,
            _ => IconKind::Rocket,
        }
    }

    fn default_url(&self, notification: &Notification) -> String {
        repository_subpage(notification, "actions")
    }
}
