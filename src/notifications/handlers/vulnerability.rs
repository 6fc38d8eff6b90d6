use async_trait::async_trait;

use super::{IconKind, NotificationHandler};
use crate::notifications::{Subject, SubjectType};

pub struct VulnerabilityAlertHandler;

#[async_trait]
impl NotificationHandler for VulnerabilityAlertHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        Some(SubjectType::RepositoryVulnerabilityAlert)
    }

    fn icon_type(&self, _subject: &Subject) -> IconKind {
        IconKind::Alert
    }
}
