use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;

use super::cache::{ApiKind, ClientCache};
use super::models::{AuthenticatedUser, GraphQLResponse, RawNotification, UserDetails};
use super::{GitHubApi, ListParams};
use crate::account::{Account, is_enterprise_server_host};
use crate::errors::ApiError;

static NEXT_LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]+)>;\s*rel="next""#).expect("valid link regex"));

/// Number of threads requested per page.
const PAGE_SIZE: u32 = 50;

/// REST base URL for a host: cloud uses `api.github.com`, Enterprise Server
/// serves the API under `/api/v3/`.
pub fn api_base_url(hostname: &str) -> Result<url::Url, ApiError> {
    let raw = if is_enterprise_server_host(hostname) {
        format!("https://{}/api/v3/", hostname)
    } else {
        "https://api.github.com/".to_string()
    };
    url::Url::parse(&raw).map_err(|e| ApiError::network(format!("Invalid host {}: {}", hostname, e)))
}

/// GraphQL endpoint for a host.
pub fn graphql_url(hostname: &str) -> Result<url::Url, ApiError> {
    let raw = if is_enterprise_server_host(hostname) {
        format!("https://{}/api/graphql", hostname)
    } else {
        "https://api.github.com/graphql".to_string()
    };
    url::Url::parse(&raw).map_err(|e| ApiError::network(format!("Invalid host {}: {}", hostname, e)))
}

/// Extracts the `rel="next"` target of a `Link` header.
pub fn next_page_url(link_header: &str) -> Option<String> {
    NEXT_LINK_PATTERN
        .captures(link_header)
        .map(|caps| caps[1].to_string())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// reqwest based [`GitHubApi`] implementation.
///
/// Clients are looked up in the shared [`ClientCache`] so every account
/// reuses one authenticated client per API surface.
#[derive(Debug, Clone)]
pub struct GithubClient {
    cache: Arc<ClientCache>,
    base_override: Option<url::Url>,
}

impl GithubClient {
    pub fn new(cache: Arc<ClientCache>) -> Self {
        Self {
            cache,
            base_override: None,
        }
    }

    /// Route every request to `base` instead of the host derived from the
    /// account. GraphQL requests go to `{base}graphql`.
    ///
    /// # Parameters
    ///
    /// * `base` - Absolute base URL. A trailing slash is added when missing.
    pub fn with_api_base(cache: Arc<ClientCache>, base: &str) -> Result<Self, ApiError> {
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base = url::Url::parse(&normalized)
            .map_err(|e| ApiError::network(format!("Invalid API base {}: {}", base, e)))?;
        Ok(Self {
            cache,
            base_override: Some(base),
        })
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    fn rest_url(&self, account: &Account, path: &str) -> Result<url::Url, ApiError> {
        let base = match &self.base_override {
            Some(base) => base.clone(),
            None => api_base_url(&account.hostname)?,
        };
        base.join(path)
            .map_err(|e| ApiError::network(format!("Invalid API path {}: {}", path, e)))
    }

    fn graphql_endpoint(&self, account: &Account) -> Result<url::Url, ApiError> {
        match &self.base_override {
            Some(base) => base
                .join("graphql")
                .map_err(|e| ApiError::network(format!("Invalid GraphQL URL: {}", e))),
            None => graphql_url(&account.hostname),
        }
    }

    /// Send a request, retrying once when no response arrived or the host
    /// answered with a server error.
    async fn send(
        &self,
        build: impl Fn() -> RequestBuilder,
        context: &str,
    ) -> Result<Response, ApiError> {
        let response = match build().send().await {
            Ok(resp) if resp.status().is_server_error() => {
                tracing::debug!("{} returned {}, retrying once", context, resp.status());
                build().send().await?
            }
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                tracing::debug!("{} failed ({}), retrying once", context, e);
                build().send().await?
            }
            Err(e) => return Err(e.into()),
        };

        check_status(response).await
    }

    fn request(
        &self,
        account: &Account,
        kind: ApiKind,
        method: Method,
        url: url::Url,
    ) -> Result<impl Fn() -> RequestBuilder, ApiError> {
        let client: Client = self.cache.client_for(account, kind)?;
        Ok(move || client.request(method.clone(), url.clone()))
    }

    async fn list_page(
        &self,
        account: &Account,
        url: url::Url,
    ) -> Result<(Vec<RawNotification>, Option<String>), ApiError> {
        let build = self.request(account, ApiKind::Rest, Method::GET, url)?;
        let response = self.send(build, "List notifications").await?;

        let next = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page_url);

        let page: Vec<RawNotification> = response.json().await.map_err(ApiError::decode)?;
        Ok((page, next))
    }
}

/// Turn a non-success response into an [`ApiError`] carrying GitHub's
/// error message when the body has one.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = match response.text().await {
        Ok(text) => text,
        Err(_) => "Unknown error".to_string(),
    };
    let message = match serde_json::from_str::<ErrorBody>(&error_text) {
        Ok(body) => body.message,
        Err(_) => error_text,
    };

    Err(ApiError::http(status.as_u16(), message))
}

#[async_trait]
impl GitHubApi for GithubClient {
    async fn list_notifications(
        &self,
        account: &Account,
        params: ListParams,
    ) -> Result<Vec<RawNotification>, ApiError> {
        let mut url = self.rest_url(account, "notifications")?;
        url.query_pairs_mut()
            .append_pair("participating", &params.participating.to_string())
            .append_pair("all", &params.all.to_string())
            .append_pair("per_page", &PAGE_SIZE.to_string());

        let mut notifications = Vec::new();
        let mut next = Some(url);
        while let Some(page_url) = next.take() {
            let (page, next_link) = self.list_page(account, page_url).await?;
            notifications.extend(page);

            if !params.paginate {
                break;
            }
            next = match next_link {
                Some(link) => Some(url::Url::parse(&link).map_err(|e| {
                    ApiError::decode(format!("invalid next page link {}: {}", link, e))
                })?),
                None => None,
            };
        }

        tracing::debug!(
            "Fetched {} notifications for {}",
            notifications.len(),
            account.display_name()
        );
        Ok(notifications)
    }

    async fn mark_thread_as_read(&self, account: &Account, thread_id: &str) -> Result<(), ApiError> {
        let url = self.rest_url(account, &format!("notifications/threads/{}", urlencoding::encode(thread_id)))?;
        let build = self.request(account, ApiKind::Rest, Method::PATCH, url)?;
        self.send(build, "Mark thread as read").await?;
        Ok(())
    }

    async fn mark_thread_as_done(&self, account: &Account, thread_id: &str) -> Result<(), ApiError> {
        let url = self.rest_url(account, &format!("notifications/threads/{}", urlencoding::encode(thread_id)))?;
        let build = self.request(account, ApiKind::Rest, Method::DELETE, url)?;
        self.send(build, "Mark thread as done").await?;
        Ok(())
    }

    async fn ignore_thread_subscription(
        &self,
        account: &Account,
        thread_id: &str,
    ) -> Result<(), ApiError> {
        let url = self.rest_url(
            account,
            &format!("notifications/threads/{}/subscription", urlencoding::encode(thread_id)),
        )?;
        let build = self.request(account, ApiKind::Rest, Method::PUT, url)?;
        let body = serde_json::json!({ "ignored": true });
        self.send(|| build().json(&body), "Ignore thread subscription")
            .await?;
        Ok(())
    }

    async fn follow_url(&self, account: &Account, url: &str) -> Result<serde_json::Value, ApiError> {
        let url = url::Url::parse(url)
            .map_err(|e| ApiError::decode(format!("invalid URL {}: {}", url, e)))?;
        let build = self.request(account, ApiKind::Rest, Method::GET, url)?;
        let response = self.send(build, "Follow URL").await?;
        response.json().await.map_err(ApiError::decode)
    }

    async fn graphql_request_raw_string(
        &self,
        account: &Account,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQLResponse, ApiError> {
        let url = self.graphql_endpoint(account)?;
        let build = self.request(account, ApiKind::GraphQL, Method::POST, url)?;
        let payload = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self.send(|| build().json(&payload), "GraphQL request").await?;
        response.json().await.map_err(ApiError::decode)
    }

    async fn fetch_authenticated_user(&self, account: &Account) -> Result<AuthenticatedUser, ApiError> {
        let url = self.rest_url(account, "user")?;
        let build = self.request(account, ApiKind::Rest, Method::GET, url)?;
        let response = self.send(build, "Fetch authenticated user").await?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_string())
        };
        let enterprise_version = header("x-github-enterprise-version");
        let scopes = header("x-oauth-scopes")
            .map(|raw| {
                raw.split(',')
                    .map(|scope| scope.trim().to_string())
                    .filter(|scope| !scope.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let user: UserDetails = response.json().await.map_err(ApiError::decode)?;
        Ok(AuthenticatedUser {
            user,
            enterprise_version,
            scopes,
        })
    }
}
