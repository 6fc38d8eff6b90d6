use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{EnrichContext, Enrichment, IconKind, NotificationHandler, actions_url, repository_subpage};
use crate::errors::ApiError;
use crate::notifications::filters::is_state_filtered_out;
use crate::notifications::{Notification, NotificationState, Subject, SubjectDetails, SubjectType};

static WORKFLOW_RUN_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<user>.*?) requested your (?P<status_display_name>.*?) to deploy to an environment$",
    )
    .unwrap()
});

/// Fields parsed from a deployment review notification title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRunAttributes {
    pub user: String,
    pub status_display_name: String,
    pub status: Option<NotificationState>,
}

pub fn workflow_run_attributes(notification: &Notification) -> Option<WorkflowRunAttributes> {
    let captures = WORKFLOW_RUN_TITLE.captures(&notification.subject.title)?;
    let status_display_name = captures["status_display_name"].to_string();

    Some(WorkflowRunAttributes {
        user: captures["user"].to_string(),
        status: match status_display_name.as_str() {
            "review" => Some(NotificationState::Waiting),
            _ => None,
        },
        status_display_name,
    })
}

fn workflow_run_url(notification: &Notification) -> String {
    let filters: Vec<String> = workflow_run_attributes(notification)
        .and_then(|a| a.status)
        .map(|status| vec![format!("is:{}", status)])
        .unwrap_or_default();
    actions_url(notification, &filters)
}

pub struct WorkflowRunHandler;

#[async_trait]
impl NotificationHandler for WorkflowRunHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::WorkflowRun)
    }

    async fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        notification: &Notification,
        _fetched: Option<&Value>,
    ) -> Result<Enrichment, ApiError> {
        let Some(state) = workflow_run_attributes(notification).and_then(|a| a.status) else {
            return Ok(Enrichment::NotApplicable);
        };

        if is_state_filtered_out(Some(state), ctx.filters) {
            return Ok(Enrichment::FilteredOut);
        }

        Ok(Enrichment::Enriched(SubjectDetails {
            state: Some(state),
            html_url: Some(workflow_run_url(notification)),
            ..Default::default()
        }))
    }

    fn icon_type(&self, _subject: &Subject) -> IconKind {
        IconKind::Rocket
    }

    fn default_url(&self, notification: &Notification) -> String {
        repository_subpage(notification, "actions")
    }
}
