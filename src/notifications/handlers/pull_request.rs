use async_trait::async_trait;
use serde_json::Value;

use super::{
    EnrichContext, Enrichment, IconColor, IconKind, NotificationHandler, decode_fragment,
    fetched_or_lookup, notification_author, repository_subpage,
};
use crate::errors::ApiError;
use crate::notifications::filters::is_state_filtered_out;
use crate::notifications::format::format_github_number;
use crate::notifications::query::models::{PullRequestDetails, ReviewNode, label_names, parse_state};
use crate::notifications::{
    Notification, NotificationState, PullRequestReview, Subject, SubjectDetails, SubjectType,
};

/// Keep each reviewer's most recent review, group reviewers by review state
/// and order the groups by state name.
///
/// `reviews` is in chronological order, as returned by `reviews(last:)`.
pub fn latest_review_for_reviewers(reviews: &[ReviewNode]) -> Vec<PullRequestReview> {
    let mut latest: Vec<(&str, &str)> = Vec::new();
    for review in reviews.iter().rev() {
        let Some(author) = &review.author else {
            continue;
        };
        if !latest.iter().any(|(login, _)| *login == author.login) {
            latest.push((author.login.as_str(), review.state.as_str()));
        }
    }

    let mut grouped: Vec<PullRequestReview> = Vec::new();
    for (login, state) in latest {
        match grouped.iter_mut().find(|g| g.state == state) {
            Some(group) => group.users.push(login.to_string()),
            None => grouped.push(PullRequestReview {
                state: state.to_string(),
                users: vec![login.to_string()],
            }),
        }
    }

    grouped.sort_by(|a, b| a.state.cmp(&b.state));
    grouped
}

fn pull_request_state(pr: &PullRequestDetails) -> Option<NotificationState> {
    if pr.is_draft {
        Some(NotificationState::Draft)
    } else if pr.is_in_merge_queue == Some(true) {
        Some(NotificationState::MergeQueue)
    } else {
        parse_state(&pr.state)
    }
}

pub struct PullRequestHandler;

#[async_trait]
impl NotificationHandler for PullRequestHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::PullRequest)
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
        let pr: PullRequestDetails = decode_fragment(fragment, "pull request")?;

        let state = pull_request_state(&pr);
        if is_state_filtered_out(state, ctx.filters) {
            return Ok(Enrichment::FilteredOut);
        }

        let latest_comment = pr.comments.as_ref().and_then(|c| c.nodes.last());
        let reviews = pr
            .reviews
            .as_ref()
            .map(|r| latest_review_for_reviewers(&r.nodes))
            .unwrap_or_default();
        let linked_issues: Vec<String> = pr
            .closing_issues_references
            .as_ref()
            .map(|c| c.nodes.iter().map(|i| format_github_number(i.number)).collect())
            .unwrap_or_default();

        Ok(Enrichment::Enriched(SubjectDetails {
            number: Some(pr.number),
            state,
            user: notification_author(&[
                latest_comment.and_then(|c| c.author.as_ref()),
                pr.author.as_ref(),
            ]),
            comment_count: pr.comments.as_ref().and_then(|c| c.total_count),
            html_url: latest_comment
                .and_then(|c| c.url.clone())
                .or_else(|| pr.url.clone()),
            milestone: pr.milestone.clone().map(Into::into),
            reviews: Some(reviews),
            linked_issues: Some(linked_issues),
            labels: Some(label_names(pr.labels)),
        }))
    }

    fn icon_type(&self, subject: &Subject) -> IconKind {
        match subject.state {
            Some(NotificationState::Draft) => IconKind::GitPullRequestDraft,
            Some(NotificationState::Closed) => IconKind::GitPullRequestClosed,
            Some(NotificationState::MergeQueue) => IconKind::GitMergeQueue,
            Some(NotificationState::Merged) => IconKind::GitMerge,
            _ => IconKind::GitPullRequest,
        }
    }

    fn icon_color(&self, subject: &Subject) -> IconColor {
        match subject.state {
            Some(NotificationState::Open) => IconColor::Green,
            Some(NotificationState::Closed) => IconColor::Red,
            Some(NotificationState::MergeQueue) => IconColor::Yellow,
            Some(NotificationState::Merged) => IconColor::Purple,
            _ => IconColor::Gray,
        }
    }

    fn default_url(&self, notification: &Notification) -> String {
        repository_subpage(notification, "pulls")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::notifications::filters::{FilterSettings, StateCategory};
    use crate::notifications::handlers::test_support::{StubApi, notification};

    fn pr_fragment() -> Value {
        json!({
            "__typename": "PullRequest",
            "number": 123,
            "title": "Test PR",
            "url": "https://github.com/gitify-app/notifications-test/pull/123",
            "state": "OPEN",
            "merged": false,
            "isDraft": false,
            "isInMergeQueue": false,
            "milestone": null,
            "author": {
                "login": "pr-author",
                "url": "https://github.com/pr-author",
                "avatarUrl": null,
                "__typename": "User"
            },
            "comments": { "totalCount": 0, "nodes": [] },
            "reviews": {
                "totalCount": 3,
                "nodes": [
                    { "state": "CHANGES_REQUESTED", "author": { "login": "reviewer-a" } },
                    { "state": "APPROVED", "author": { "login": "reviewer-b" } },
                    { "state": "APPROVED", "author": { "login": "reviewer-a" } }
                ]
            },
            "labels": { "nodes": [] },
            "closingIssuesReferences": { "nodes": [{ "number": 789 }, { "number": 790 }] }
        })
    }

    async fn enrich(fragment: Value, filters: &FilterSettings) -> Enrichment {
        let api = StubApi::default();
        let ctx = EnrichContext {
            api: &api,
            filters,
            include_is_answered: true,
        };
        PullRequestHandler
            .enrich(&ctx, &notification("PullRequest", "Test PR"), Some(&fragment))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enriches_open_pull_request() {
        let Enrichment::Enriched(details) = enrich(pr_fragment(), &FilterSettings::default()).await
        else {
            panic!("expected enrichment");
        };

        assert_eq!(details.number, Some(123));
        assert_eq!(details.state, Some(NotificationState::Open));
        assert_eq!(details.user.unwrap().login, "pr-author");
        assert_eq!(
            details.html_url.as_deref(),
            Some("https://github.com/gitify-app/notifications-test/pull/123")
        );
        assert_eq!(
            details.reviews,
            Some(vec![PullRequestReview {
                state: "APPROVED".to_string(),
                users: vec!["reviewer-a".to_string(), "reviewer-b".to_string()],
            }])
        );
        assert_eq!(
            details.linked_issues,
            Some(vec!["#789".to_string(), "#790".to_string()])
        );
        assert_eq!(details.labels, Some(Vec::new()));
    }

    #[tokio::test]
    async fn draft_wins_over_merge_queue() {
        let mut fragment = pr_fragment();
        fragment["isDraft"] = json!(true);
        fragment["isInMergeQueue"] = json!(true);
        let Enrichment::Enriched(details) = enrich(fragment, &FilterSettings::default()).await
        else {
            panic!("expected enrichment");
        };
        assert_eq!(details.state, Some(NotificationState::Draft));

        let mut fragment = pr_fragment();
        fragment["isInMergeQueue"] = json!(true);
        let Enrichment::Enriched(details) = enrich(fragment, &FilterSettings::default()).await
        else {
            panic!("expected enrichment");
        };
        assert_eq!(details.state, Some(NotificationState::MergeQueue));
    }

    #[tokio::test]
    async fn state_filter_drops_pull_request() {
        let mut fragment = pr_fragment();
        fragment["state"] = json!("MERGED");
        let filters = FilterSettings {
            states: vec![StateCategory::Open],
            ..Default::default()
        };
        assert_eq!(enrich(fragment, &filters).await, Enrichment::FilteredOut);
    }

    #[test]
    fn groups_latest_reviews_by_state() {
        let reviews: Vec<ReviewNode> = serde_json::from_value(json!([
            { "state": "COMMENTED", "author": { "login": "c" } },
            { "state": "CHANGES_REQUESTED", "author": { "login": "b" } },
            { "state": "APPROVED", "author": { "login": "a" } },
            { "state": "APPROVED", "author": { "login": "c" } },
            { "state": "COMMENTED", "author": null }
        ]))
        .unwrap();

        assert_eq!(
            latest_review_for_reviewers(&reviews),
            vec![
                PullRequestReview {
                    state: "APPROVED".to_string(),
                    users: vec!["c".to_string(), "a".to_string()],
                },
                PullRequestReview {
                    state: "CHANGES_REQUESTED".to_string(),
                    users: vec!["b".to_string()],
                },
            ]
        );
        assert!(latest_review_for_reviewers(&[]).is_empty());
    }

    #[test]
    fn icons_and_colors_follow_state() {
        let mut n = notification("PullRequest", "title");
        n.subject.state = Some(NotificationState::MergeQueue);
        assert_eq!(PullRequestHandler.icon_type(&n.subject), IconKind::GitMergeQueue);
        assert_eq!(PullRequestHandler.icon_color(&n.subject), IconColor::Yellow);
        n.subject.state = Some(NotificationState::Merged);
        assert_eq!(PullRequestHandler.icon_type(&n.subject), IconKind::GitMerge);
        assert_eq!(PullRequestHandler.icon_color(&n.subject), IconColor::Purple);
        n.subject.state = None;
        assert_eq!(PullRequestHandler.icon_type(&n.subject), IconKind::GitPullRequest);
        assert_eq!(PullRequestHandler.icon_color(&n.subject), IconColor::Gray);
    }
}
