//! Display helpers for enriched notifications.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;

use super::Notification;
use super::handlers::handler_for;

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid camel case regex"));

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Join the parts, split camel case, turn underscores into spaces and title
/// case every word: `["MERGE_QUEUE", "PullRequest"]` becomes
/// `"Merge Queue Pull Request"`.
pub fn format_for_display(parts: &[&str]) -> String {
    let joined = parts.join(" ");
    let spaced = CAMEL_BOUNDARY.replace_all(&joined, "$1 $2").replace('_', " ");
    WORD.replace_all(&spaced, |caps: &regex::Captures| {
        let word = &caps[0];
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            }
            None => String::new(),
        }
    })
    .trim()
    .to_string()
}

/// "Open Issue", "Merged Pull Request", or just "Commit" when no state.
pub fn formatted_type(notification: &Notification) -> String {
    let state = notification.subject.state.map(|s| s.to_string());
    let mut parts: Vec<&str> = Vec::new();
    if let Some(state) = state.as_deref() {
        parts.push(state);
    }
    parts.push(notification.subject.subject_type.as_str());
    format_for_display(&parts)
}

pub fn format_github_number(number: u64) -> String {
    format!("#{}", number)
}

pub fn formatted_number(notification: &Notification) -> String {
    match notification.subject.number {
        Some(number) if number > 0 => format_github_number(number),
        _ => String::new(),
    }
}

/// Subject title with the number appended: `"Fix crash [#42]"`.
pub fn formatted_title(notification: &Notification) -> String {
    let number = formatted_number(notification);
    if number.is_empty() {
        notification.subject.title.clone()
    } else {
        format!("{} [{}]", notification.subject.title, number)
    }
}

/// Referrer id GitHub uses to mark a thread as read when it is opened.
pub fn notification_referrer_id(notification: &Notification) -> String {
    let user_id = notification
        .account
        .user
        .as_ref()
        .map(|u| u.id.as_str())
        .unwrap_or("");
    STANDARD.encode(format!(
        "018:NotificationThread{}:{}",
        notification.id, user_id
    ))
}

/// Browser URL for a notification.
///
/// Uses the URL resolved during enrichment, else the handler's default, and
/// always carries the referrer id.
pub fn generate_web_url(notification: &Notification) -> String {
    let base = notification
        .subject
        .html_url
        .clone()
        .unwrap_or_else(|| handler_for(&notification.subject.subject_type).default_url(notification));

    match url::Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(
                "notification_referrer_id",
                &notification_referrer_id(notification),
            );
            url.to_string()
        }
        Err(e) => {
            tracing::warn!("Could not parse notification URL {}: {}", base, e);
            base
        }
    }
}
