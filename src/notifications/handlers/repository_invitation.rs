use async_trait::async_trait;

use super::{IconKind, NotificationHandler, repository_subpage};
use crate::notifications::{Notification, Subject, SubjectType};

pub struct RepositoryInvitationHandler;

#[async_trait]
impl NotificationHandler for RepositoryInvitationHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::RepositoryInvitation)
    }

    fn icon_type(&self, _subject: &Subject) -> IconKind {
        IconKind::Mail
    }

    fn default_url(&self, notification: &Notification) -> String {
        repository_subpage(notification, "invitations")
    }
}
