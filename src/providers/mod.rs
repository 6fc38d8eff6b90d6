pub mod cache;
pub mod github;
pub mod models;

use async_trait::async_trait;

pub use cache::{ApiKind, ClientCache};
pub use github::GithubClient;
pub use models::{AuthenticatedUser, GraphQLResponse, RawNotification};

use crate::account::Account;
use crate::config::Settings;
use crate::errors::ApiError;

/// Query parameters of `GET /notifications`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Only threads the user is directly participating in.
    pub participating: bool,
    /// Include threads already marked as read.
    pub all: bool,
    /// Follow `Link: rel="next"` until exhausted instead of stopping after
    /// the first page.
    pub paginate: bool,
}

impl From<&Settings> for ListParams {
    fn from(settings: &Settings) -> Self {
        Self {
            participating: settings.participating,
            all: settings.fetch_read_notifications,
            paginate: settings.fetch_all_notifications,
        }
    }
}

/// Transport boundary to a GitHub host.
///
/// Every call carries the owning account, which determines the host and
/// the token. Implementations must be safe to share across tasks.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn list_notifications(
        &self,
        account: &Account,
        params: ListParams,
    ) -> Result<Vec<RawNotification>, ApiError>;

    async fn mark_thread_as_read(&self, account: &Account, thread_id: &str) -> Result<(), ApiError>;

    async fn mark_thread_as_done(&self, account: &Account, thread_id: &str) -> Result<(), ApiError>;

    async fn ignore_thread_subscription(
        &self,
        account: &Account,
        thread_id: &str,
    ) -> Result<(), ApiError>;

    /// `GET` an absolute API URL found inside another payload.
    async fn follow_url(&self, account: &Account, url: &str) -> Result<serde_json::Value, ApiError>;

    /// Send a GraphQL document assembled at runtime.
    async fn graphql_request_raw_string(
        &self,
        account: &Account,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQLResponse, ApiError>;

    async fn fetch_authenticated_user(&self, account: &Account) -> Result<AuthenticatedUser, ApiError>;
}
