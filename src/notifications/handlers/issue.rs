use async_trait::async_trait;
use serde_json::Value;

use super::{
    EnrichContext, Enrichment, IconColor, IconKind, NotificationHandler, decode_fragment,
    fetched_or_lookup, notification_author,
};
use crate::errors::ApiError;
use crate::notifications::filters::is_state_filtered_out;
use crate::notifications::query::models::{IssueDetails, label_names, parse_state};
use crate::notifications::{Notification, NotificationState, Subject, SubjectDetails, SubjectType};

pub struct IssueHandler;

#[async_trait]
impl NotificationHandler for IssueHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::Issue)
    }

    fn supports_merged_query_enrichment(&self) -> bool {
        true
    }

    async fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        notification: &Notification,
        fetched: Option<&Value>,
    ) -> Result<Enrichment, ApiError> {
        let Some(fragment) = fetched_or_lookup(ctx, notification, fetched).await? else {
            return Ok(Enrichment::NotApplicable);
        };
        let issue: IssueDetails = decode_fragment(fragment, "issue")?;

        // stateReason refines a closed issue into completed/not planned/duplicate
        let state = issue
            .state_reason
            .as_deref()
            .and_then(parse_state)
            .or_else(|| parse_state(&issue.state));
        if is_state_filtered_out(state, ctx.filters) {
            return Ok(Enrichment::FilteredOut);
        }

        let latest_comment = issue.comments.as_ref().and_then(|c| c.nodes.last());

        Ok(Enrichment::Enriched(SubjectDetails {
            number: Some(issue.number),
            state,
            user: notification_author(&[
                latest_comment.and_then(|c| c.author.as_ref()),
                issue.author.as_ref(),
            ]),
            comment_count: issue.comments.as_ref().and_then(|c| c.total_count),
            html_url: latest_comment
                .and_then(|c| c.url.clone())
                .or_else(|| issue.url.clone()),
            milestone: issue.milestone.clone().map(Into::into),
            labels: Some(label_names(issue.labels)),
            ..Default::default()
        }))
    }

    fn icon_type(&self, subject: &Subject) -> IconKind {
        match subject.state {
            Some(NotificationState::Draft) => IconKind::IssueDraft,
            Some(NotificationState::Closed | NotificationState::Completed) => IconKind::IssueClosed,
            Some(NotificationState::Duplicate | NotificationState::NotPlanned) => IconKind::Skip,
            Some(NotificationState::Reopened) => IconKind::IssueReopened,
            _ => IconKind::IssueOpened,
        }
    }

    fn icon_color(&self, subject: &Subject) -> IconColor {
        match subject.state {
            Some(NotificationState::Open | NotificationState::Reopened) => IconColor::Green,
            Some(NotificationState::Closed) => IconColor::Red,
            Some(NotificationState::Completed) => IconColor::Purple,
            _ => IconColor::Gray,
        }
    }
}
