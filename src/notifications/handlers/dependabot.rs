use async_trait::async_trait;

use super::{IconKind, NotificationHandler, repository_subpage};
use crate::notifications::{Notification, Subject, SubjectType};

pub struct DependabotAlertsHandler;

#[async_trait]
impl NotificationHandler for DependabotAlertsHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::RepositoryDependabotAlertsThread)
    }

    fn icon_type(&self, _subject: &Subject) -> IconKind {
        IconKind::Alert
    }

    fn default_url(&self, notification: &Notification) -> String {
        repository_subpage(notification, "security/dependabot")
    }
}
