//! Template of the per-notification detail lookup.
//!
//! The template is kept as data rather than query text. Variable names that
//! end in [`INDEX_SUFFIX`] are per-node and get the node index appended when
//! the template is instantiated; every other variable is shared by all
//! nodes of a merged query.

/// Suffix marking a per-node variable in the template.
pub const INDEX_SUFFIX: &str = "INDEX";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableDefinition {
    pub name: &'static str,
    pub graphql_type: &'static str,
}

impl VariableDefinition {
    pub fn is_indexed(&self) -> bool {
        self.name.ends_with(INDEX_SUFFIX)
    }

    /// Name with the `INDEX` suffix removed.
    pub fn base_name(&self) -> &'static str {
        self.name.strip_suffix(INDEX_SUFFIX).unwrap_or(self.name)
    }
}

/// Rewrite a template variable name for node `index`: `numberINDEX`
/// becomes `number3`. Shared names are returned unchanged.
pub fn indexed_name(name: &str, index: usize) -> String {
    match name.strip_suffix(INDEX_SUFFIX) {
        Some(base) => format!("{}{}", base, index),
        None => name.to_string(),
    }
}

/// A named fragment and its selection set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub name: &'static str,
    pub on_type: &'static str,
    pub body: &'static str,
}

/// One conditionally included child field of the root field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSelection {
    pub field: &'static str,
    pub arguments: &'static [(&'static str, &'static str)],
    pub include_if: &'static str,
    pub fragment: &'static str,
}

/// A root field lookup with conditionally included children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTemplate {
    pub root_field: &'static str,
    pub root_arguments: &'static [(&'static str, &'static str)],
    pub selections: &'static [NodeSelection],
    pub variables: &'static [VariableDefinition],
    pub fragments: &'static [Fragment],
}

impl QueryTemplate {
    pub fn indexed_variables(&self) -> impl Iterator<Item = &VariableDefinition> {
        self.variables.iter().filter(|v| v.is_indexed())
    }

    pub fn shared_variables(&self) -> impl Iterator<Item = &VariableDefinition> {
        self.variables.iter().filter(|v| !v.is_indexed())
    }

    /// Render the root field for node `index` under `alias`.
    pub fn render_node(&self, alias: &str, index: usize) -> String {
        let mut out = format!(
            "{}: {}({}) {{",
            alias,
            self.root_field,
            render_arguments(self.root_arguments, index)
        );
        for selection in self.selections {
            out.push_str(&format!(
                " {}({}) @include(if: ${}) {{ ...{} }}",
                selection.field,
                render_arguments(selection.arguments, index),
                indexed_name(selection.include_if, index),
                selection.fragment
            ));
        }
        out.push_str(" }");
        out
    }

    /// Variable definitions for node `index`.
    pub fn render_indexed_definitions(&self, index: usize) -> Vec<String> {
        self.indexed_variables()
            .map(|v| format!("${}: {}", indexed_name(v.name, index), v.graphql_type))
            .collect()
    }

    pub fn render_shared_definitions(&self) -> Vec<String> {
        self.shared_variables()
            .map(|v| format!("${}: {}", v.name, v.graphql_type))
            .collect()
    }

    pub fn render_fragments(&self) -> String {
        self.fragments
            .iter()
            .map(|f| format!("fragment {} on {} {}", f.name, f.on_type, f.body.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_arguments(arguments: &[(&str, &str)], index: usize) -> String {
    arguments
        .iter()
        .map(|(name, variable)| format!("{}: ${}", name, indexed_name(variable, index)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Repository lookup of a discussion, issue or pull request by number. The
/// `is*NotificationINDEX` flags pick which child resolves.
pub static MERGED_DETAILS_TEMPLATE: QueryTemplate = QueryTemplate {
    root_field: "repository",
    root_arguments: &[("owner", "ownerINDEX"), ("name", "nameINDEX")],
    selections: &[
        NodeSelection {
            field: "discussion",
            arguments: &[("number", "numberINDEX")],
            include_if: "isDiscussionNotificationINDEX",
            fragment: "DiscussionDetails",
        },
        NodeSelection {
            field: "issue",
            arguments: &[("number", "numberINDEX")],
            include_if: "isIssueNotificationINDEX",
            fragment: "IssueDetails",
        },
        NodeSelection {
            field: "pullRequest",
            arguments: &[("number", "numberINDEX")],
            include_if: "isPullRequestNotificationINDEX",
            fragment: "PullRequestDetails",
        },
    ],
    variables: &[
        VariableDefinition {
            name: "ownerINDEX",
            graphql_type: "String!",
        },
        VariableDefinition {
            name: "nameINDEX",
            graphql_type: "String!",
        },
        VariableDefinition {
            name: "numberINDEX",
            graphql_type: "Int!",
        },
        VariableDefinition {
            name: "isDiscussionNotificationINDEX",
            graphql_type: "Boolean!",
        },
        VariableDefinition {
            name: "isIssueNotificationINDEX",
            graphql_type: "Boolean!",
        },
        VariableDefinition {
            name: "isPullRequestNotificationINDEX",
            graphql_type: "Boolean!",
        },
        VariableDefinition {
            name: "lastComments",
            graphql_type: "Int",
        },
        VariableDefinition {
            name: "lastThreadedComments",
            graphql_type: "Int",
        },
        VariableDefinition {
            name: "lastReplies",
            graphql_type: "Int",
        },
        VariableDefinition {
            name: "lastReviews",
            graphql_type: "Int",
        },
        VariableDefinition {
            name: "firstLabels",
            graphql_type: "Int",
        },
        VariableDefinition {
            name: "firstClosingIssues",
            graphql_type: "Int",
        },
        VariableDefinition {
            name: "includeIsAnswered",
            graphql_type: "Boolean!",
        },
    ],
    fragments: &[
        Fragment {
            name: "AuthorFields",
            on_type: "Actor",
            body: "{ login url avatarUrl __typename }",
        },
        Fragment {
            name: "MilestoneFields",
            on_type: "Milestone",
            body: "{ state title }",
        },
        Fragment {
            name: "CommentFields",
            on_type: "DiscussionComment",
            body: "{ databaseId createdAt author { ...AuthorFields } url }",
        },
        Fragment {
            name: "DiscussionCommentFields",
            on_type: "DiscussionComment",
            body: r#"{
                ...CommentFields
                replies(last: $lastReplies) { totalCount nodes { ...CommentFields } }
            }"#,
        },
        Fragment {
            name: "DiscussionDetails",
            on_type: "Discussion",
            body: r#"{
                __typename
                number
                title
                stateReason
                isAnswered @include(if: $includeIsAnswered)
                url
                author { ...AuthorFields }
                comments(last: $lastThreadedComments) { totalCount nodes { ...DiscussionCommentFields } }
                labels(first: $firstLabels) { nodes { name } }
            }"#,
        },
        Fragment {
            name: "IssueDetails",
            on_type: "Issue",
            body: r#"{
                __typename
                number
                title
                url
                state
                stateReason
                milestone { ...MilestoneFields }
                author { ...AuthorFields }
                comments(last: $lastComments) { totalCount nodes { url author { ...AuthorFields } } }
                labels(first: $firstLabels) { nodes { name } }
            }"#,
        },
        Fragment {
            name: "PullRequestReviewFields",
            on_type: "PullRequestReview",
            body: "{ state author { login } }",
        },
        Fragment {
            name: "PullRequestDetails",
            on_type: "PullRequest",
            body: r#"{
                __typename
                number
                title
                url
                state
                merged
                isDraft
                isInMergeQueue
                milestone { ...MilestoneFields }
                author { ...AuthorFields }
                comments(last: $lastComments) { totalCount nodes { url author { ...AuthorFields } } }
                reviews(last: $lastReviews) { totalCount nodes { ...PullRequestReviewFields } }
                labels(first: $firstLabels) { nodes { name } }
                closingIssuesReferences(first: $firstClosingIssues) { nodes { number } }
            }"#,
        },
    ],
};
