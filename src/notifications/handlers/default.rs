use async_trait::async_trait;

use super::NotificationHandler;
use crate::notifications::SubjectType;

/// Fallback for subject types without a dedicated handler. Performs no
/// enrichment and draws a gray question mark.
pub struct DefaultHandler;

#[async_trait]
impl NotificationHandler for DefaultHandler {
    fn subject_type(&self) -> Option<SubjectType> {
        None
    }
}
