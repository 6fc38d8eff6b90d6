//! Merged query builder.
//!
//! Batches the detail lookups of every discussion, issue and pull request
//! notification of an account into one GraphQL document. Each notification
//! becomes an aliased `nodeN: repository(...)` root field bound to
//! index-suffixed variables, and the plan remembers which notification
//! each alias came from so the flat response can be handed back.

pub mod models;
pub mod template;

use serde_json::{Map, Value};

use crate::account::Account;
use crate::errors::ApiError;
use crate::providers::GitHubApi;

use super::handlers::handler_for;
use super::{Notification, SubjectType, number_from_url};
use template::{MERGED_DETAILS_TEMPLATE, QueryTemplate};

pub use template::INDEX_SUFFIX;

/// Operation name of the composed document.
pub const MERGED_QUERY_NAME: &str = "FetchMergedNotifications";

/// Values shared by every node of a merged query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedVariables {
    pub last_comments: u32,
    pub last_threaded_comments: u32,
    pub last_replies: u32,
    pub last_reviews: u32,
    pub first_labels: u32,
    pub first_closing_issues: u32,
    pub include_is_answered: bool,
}

impl SharedVariables {
    pub fn new(include_is_answered: bool) -> Self {
        Self {
            last_comments: 1,
            last_threaded_comments: 10,
            last_replies: 10,
            last_reviews: 100,
            first_labels: 100,
            first_closing_issues: 100,
            include_is_answered,
        }
    }

    fn bindings(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("lastComments", Value::from(self.last_comments)),
            ("lastThreadedComments", Value::from(self.last_threaded_comments)),
            ("lastReplies", Value::from(self.last_replies)),
            ("lastReviews", Value::from(self.last_reviews)),
            ("firstLabels", Value::from(self.first_labels)),
            ("firstClosingIssues", Value::from(self.first_closing_issues)),
            ("includeIsAnswered", Value::from(self.include_is_answered)),
        ]
    }
}

/// One aliased lookup in a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub alias: String,
    pub index: usize,
    /// Caller supplied position of the originating notification.
    pub target: usize,
    /// Values keyed by template variable base name (without `INDEX`).
    pub bindings: Vec<(&'static str, Value)>,
}

/// Owner, name and number of a notification whose details can be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKey {
    pub owner: String,
    pub name: String,
    pub number: u64,
    pub subject_type: SubjectType,
}

/// Returns the lookup key when the notification's handler supports merged
/// enrichment and the thread has a repository and a numbered subject URL.
pub fn mergeable_node(notification: &Notification) -> Option<NodeKey> {
    if !handler_for(&notification.subject.subject_type).supports_merged_query_enrichment() {
        return None;
    }

    let repository = notification.repository.as_ref()?;
    let number = number_from_url(notification.subject.url.as_deref()?)?;
    Some(NodeKey {
        owner: repository.owner.login.clone(),
        name: repository.name.clone(),
        number,
        subject_type: notification.subject.subject_type.clone(),
    })
}

impl NodeKey {
    fn bindings(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("owner", Value::from(self.owner.clone())),
            ("name", Value::from(self.name.clone())),
            ("number", Value::from(self.number)),
            (
                "isDiscussionNotification",
                Value::from(self.subject_type == SubjectType::Discussion),
            ),
            (
                "isIssueNotification",
                Value::from(self.subject_type == SubjectType::Issue),
            ),
            (
                "isPullRequestNotification",
                Value::from(self.subject_type == SubjectType::PullRequest),
            ),
        ]
    }
}

/// Accumulates nodes with strictly increasing indexes.
#[derive(Debug, Clone)]
pub struct MergeQueryBuilder {
    template: &'static QueryTemplate,
    shared: SharedVariables,
    nodes: Vec<PlanNode>,
}

impl MergeQueryBuilder {
    pub fn new(shared: SharedVariables) -> Self {
        Self {
            template: &MERGED_DETAILS_TEMPLATE,
            shared,
            nodes: Vec::new(),
        }
    }

    /// Add `notification` if it is mergeable and return its alias.
    ///
    /// # Parameters
    ///
    /// * `target` - Position of the notification in the caller's list,
    ///   handed back by [`QueryPlan::redistribute`].
    pub fn add_notification(&mut self, target: usize, notification: &Notification) -> Option<String> {
        let key = mergeable_node(notification)?;
        Some(self.add_node(target, &key))
    }

    pub fn add_node(&mut self, target: usize, key: &NodeKey) -> String {
        let index = self.nodes.len();
        let alias = format!("node{}", index);
        self.nodes.push(PlanNode {
            alias: alias.clone(),
            index,
            target,
            bindings: key.bindings(),
        });
        alias
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finish the plan. No nodes means no request must be made, so this
    /// returns `None`.
    pub fn build(self) -> Option<QueryPlan> {
        if self.nodes.is_empty() {
            return None;
        }
        Some(QueryPlan {
            template: self.template,
            shared: self.shared,
            nodes: self.nodes,
        })
    }
}

/// A non-empty set of aliased lookups ready to be serialized.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    template: &'static QueryTemplate,
    shared: SharedVariables,
    nodes: Vec<PlanNode>,
}

impl QueryPlan {
    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.alias.as_str())
    }

    pub fn target_of(&self, alias: &str) -> Option<usize> {
        self.nodes.iter().find(|n| n.alias == alias).map(|n| n.target)
    }

    /// Serialize the plan into GraphQL document text.
    pub fn to_query_text(&self) -> String {
        let mut definitions: Vec<String> = self
            .nodes
            .iter()
            .flat_map(|n| self.template.render_indexed_definitions(n.index))
            .collect();
        definitions.extend(self.template.render_shared_definitions());

        let selections: Vec<String> = self
            .nodes
            .iter()
            .map(|n| self.template.render_node(&n.alias, n.index))
            .collect();

        format!(
            "query {}({}) {{\n  {}\n}}\n{}",
            MERGED_QUERY_NAME,
            definitions.join(", "),
            selections.join("\n  "),
            self.template.render_fragments()
        )
    }

    /// Variable values for [`QueryPlan::to_query_text`].
    pub fn variables(&self) -> Value {
        let mut variables = Map::new();
        for node in &self.nodes {
            for (base, value) in &node.bindings {
                variables.insert(format!("{}{}", base, node.index), value.clone());
            }
        }
        for (name, value) in self.shared.bindings() {
            variables.insert(name.to_string(), value);
        }
        Value::Object(variables)
    }

    /// Hand the response back to the originating notifications.
    ///
    /// Every node yields `(target, fragment)` where the fragment is the first
    /// non-null child of the aliased root field, or `None` when the alias is
    /// missing or resolved to nothing.
    pub fn redistribute(&self, data: &Value) -> Vec<(usize, Option<Value>)> {
        self.nodes
            .iter()
            .map(|node| {
                let fragment = data
                    .get(&node.alias)
                    .and_then(Value::as_object)
                    .and_then(|root| root.values().find(|v| !v.is_null()))
                    .cloned();
                (node.target, fragment)
            })
            .collect()
    }
}

/// Send a plan and return its `data`.
///
/// GraphQL errors alongside data are logged and the partial data is used;
/// errors without data fail the request.
pub async fn execute_plan(
    api: &dyn GitHubApi,
    account: &Account,
    plan: &QueryPlan,
) -> Result<Value, ApiError> {
    let response = api
        .graphql_request_raw_string(account, &plan.to_query_text(), plan.variables())
        .await?;

    let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
    match response.data {
        Some(data) if !data.is_null() => {
            if !messages.is_empty() {
                tracing::warn!(
                    "{} returned partial data with errors: {}",
                    MERGED_QUERY_NAME,
                    messages.join("; ")
                );
            }
            Ok(data)
        }
        _ => Err(ApiError::graphql(&messages)),
    }
}

/// Fetch the details of a single notification with the merged template.
///
/// Used when no merged response is available for a mergeable notification.
/// Returns `None` for notifications that cannot be looked up this way or
/// whose node resolved to nothing.
pub async fn fetch_node_details(
    api: &dyn GitHubApi,
    notification: &Notification,
    include_is_answered: bool,
) -> Result<Option<Value>, ApiError> {
    let mut builder = MergeQueryBuilder::new(SharedVariables::new(include_is_answered));
    if builder.add_notification(0, notification).is_none() {
        return Ok(None);
    }
    let Some(plan) = builder.build() else {
        return Ok(None);
    };

    let data = execute_plan(api, &notification.account, &plan).await?;
    Ok(plan
        .redistribute(&data)
        .into_iter()
        .next()
        .and_then(|(_, fragment)| fragment))
}
