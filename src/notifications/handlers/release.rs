use async_trait::async_trait;
use serde_json::Value;

use super::{
    EnrichContext, Enrichment, IconKind, NotificationHandler, follow_typed, repository_subpage,
    rest_user,
};
use crate::errors::ApiError;
use crate::notifications::filters::is_state_filtered_out;
use crate::notifications::{Notification, Subject, SubjectDetails, SubjectType};
use crate::providers::models::{CommitCommentResponse, ReleaseResponse};

pub struct ReleaseHandler;

#[async_trait]
impl NotificationHandler for ReleaseHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::Release)
    }

    async fn enrich(
        &self,
        ctx: &EnrichContext<'_>,
        notification: &Notification,
        _fetched: Option<&Value>,
    ) -> Result<Enrichment, ApiError> {
        if is_state_filtered_out(None, ctx.filters) {
            return Ok(Enrichment::FilteredOut);
        }

        let commenter = match &notification.subject.latest_comment_url {
            Some(url) => {
                let comment: CommitCommentResponse = follow_typed(ctx, notification, url).await?;
                comment.user
            }
            None => None,
        };

        let user = match commenter {
            Some(user) => Some(user),
            None => {
                let Some(url) = &notification.subject.url else {
                    return Ok(Enrichment::NotApplicable);
                };
                let release: ReleaseResponse = follow_typed(ctx, notification, url).await?;
                release.author
            }
        };

        Ok(Enrichment::Enriched(SubjectDetails {
            user: user.as_ref().map(rest_user),
            ..Default::default()
        }))
    }

    fn icon_type(&self, _subject: &Subject) -> IconKind {
        IconKind::Tag
    }

    fn default_url(&self, notification: &Notification) -> String {
        repository_subpage(notification, "releases")
    }
}
