use async_trait::async_trait;
use serde_json::Value;

use super::{EnrichContext, Enrichment, IconKind, NotificationHandler, follow_typed, rest_user};
use crate::errors::ApiError;
use crate::notifications::filters::is_state_filtered_out;
use crate::notifications::{Notification, Subject, SubjectDetails, SubjectType};
use crate::providers::models::{CommitCommentResponse, CommitResponse};

pub struct CommitHandler;

#[async_trait]
impl NotificationHandler for CommitHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::Commit)
    }

    async fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        notification: &Notification,
        _fetched: Option<&Value>,
    ) -> Result<Enrichment, ApiError> {
        // Commits carry no state
        if is_state_filtered_out(None, ctx.filters) {
            return Ok(Enrichment::FilteredOut);
        }

        let user = if let Some(url) = &notification.subject.latest_comment_url {
            let comment: CommitCommentResponse = follow_typed(ctx, notification, url).await?;
            comment.user
        } else if let Some(url) = &notification.subject.url {
            let commit: CommitResponse = follow_typed(ctx, notification, url).await?;
            commit.author
        } else {
            return Ok(Enrichment::NotApplicable);
        };

        Ok(Enrichment::Enriched(SubjectDetails {
            user: user.as_ref().map(rest_user),
            ..Default::default()
        }))
    }

    fn icon_type(&self, _subject: &Subject) -> IconKind {
        IconKind::GitCommit
    }
}
