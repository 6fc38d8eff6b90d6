use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{
    EnrichContext, Enrichment, IconColor, IconKind, NotificationHandler, decode_fragment,
    fetched_or_lookup, notification_author, repository_subpage,
};
use crate::errors::ApiError;
use crate::notifications::filters::is_state_filtered_out;
use crate::notifications::query::models::{
    Author, DiscussionCommentNode, DiscussionDetails, label_names, parse_state,
};
use crate::notifications::{Notification, NotificationState, Subject, SubjectDetails, SubjectType};

/// A discussion comment or reply, flattened.
#[derive(Debug, Clone, Copy)]
pub struct CommentRef<'a> {
    pub created_at: DateTime<Utc>,
    pub author: Option<&'a Author>,
    pub url: Option<&'a str>,
}

/// The comment or reply created closest to `target`. Ties keep the earlier
/// entry in thread order.
pub fn closest_comment_or_reply(
    target: DateTime<Utc>,
    comments: &[DiscussionCommentNode],
) -> Option<CommentRef<'_>> {
    let candidates = comments.iter().flat_map(|comment| {
        let head = CommentRef {
            created_at: comment.created_at,
            author: comment.author.as_ref(),
            url: comment.url.as_deref(),
        };
        let replies = comment
            .replies
            .iter()
            .flat_map(|r| r.nodes.iter())
            .map(|reply| CommentRef {
                created_at: reply.created_at,
                author: reply.author.as_ref(),
                url: reply.url.as_deref(),
            });
        std::iter::once(head).chain(replies)
    });

    let distance = |c: &CommentRef<'_>| (c.created_at - target).num_milliseconds().abs();
    candidates.fold(None, |closest: Option<CommentRef<'_>>, current| match closest {
        Some(best) if distance(&best) <= distance(&current) => Some(best),
        _ => Some(current),
    })
}

/// A state reason wins over the answered flag, which wins over `OPEN`.
pub fn discussion_state(discussion: &DiscussionDetails) -> NotificationState {
    if let Some(state) = discussion.state_reason.as_deref().and_then(parse_state) {
        return state;
    }
    if discussion.is_answered == Some(true) {
        return NotificationState::Answered;
    }
    NotificationState::Open
}

pub struct DiscussionHandler;

#[async_trait]
impl NotificationHandler for DiscussionHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::Discussion)
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
        let discussion: DiscussionDetails = decode_fragment(fragment, "discussion")?;

        let state = discussion_state(&discussion);
        if is_state_filtered_out(Some(state), ctx.filters) {
            return Ok(Enrichment::FilteredOut);
        }

        let comments = discussion
            .comments
            .as_ref()
            .map(|c| c.nodes.as_slice())
            .unwrap_or_default();
        let closest = closest_comment_or_reply(notification.updated_at, comments);

        let details = SubjectDetails {
            number: Some(discussion.number),
            state: Some(state),
            user: notification_author(&[
                closest.and_then(|c| c.author),
                discussion.author.as_ref(),
            ]),
            comment_count: discussion.comments.as_ref().and_then(|c| c.total_count),
            html_url: closest
                .and_then(|c| c.url)
                .map(str::to_string)
                .or_else(|| discussion.url.clone()),
            labels: Some(label_names(discussion.labels)),
            ..Default::default()
        };
        Ok(Enrichment::Enriched(details))
    }

    fn icon_type(&self, subject: &Subject) -> IconKind {
        match subject.state {
            Some(NotificationState::Duplicate) => IconKind::DiscussionDuplicate,
            Some(NotificationState::Outdated) => IconKind::DiscussionOutdated,
            Some(NotificationState::Resolved) => IconKind::DiscussionClosed,
            _ => IconKind::CommentDiscussion,
        }
    }

    fn icon_color(&self, subject: &Subject) -> IconColor {
        match subject.state {
            Some(NotificationState::Answered) => IconColor::Green,
            Some(NotificationState::Resolved) => IconColor::Purple,
            _ => IconColor::Gray,
        }
    }

    fn default_url(&self, notification: &Notification) -> String {
        repository_subpage(notification, "discussions")
    }
}
