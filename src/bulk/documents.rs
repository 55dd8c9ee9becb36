//! GraphQL documents for the bulk operation lifecycle.
//!
//! Caller-supplied query and mutation text travels as variables, never spliced into the
//! document, so quotes and triple quotes in it need no escaping.

use super::operation::BulkKind;

pub const RUN_QUERY: &str = r#"mutation RunBulkQuery($query: String!) {
  bulkOperationRunQuery(query: $query) {
    bulkOperation {
      id
      status
    }
    userErrors {
      field
      message
    }
  }
}"#;

pub const STAGED_UPLOADS_CREATE: &str = r#"mutation StageBulkMutationVariables {
  stagedUploadsCreate(input: {
    resource: BULK_MUTATION_VARIABLES,
    filename: "bulk_op_vars",
    mimeType: "text/jsonl",
    httpMethod: POST
  }) {
    userErrors {
      field
      message
    }
    stagedTargets {
      url
      resourceUrl
      parameters {
        name
        value
      }
    }
  }
}"#;

pub const RUN_MUTATION: &str = r#"mutation RunBulkMutation($mutation: String!, $stagedUploadPath: String!) {
  bulkOperationRunMutation(mutation: $mutation, stagedUploadPath: $stagedUploadPath) {
    bulkOperation {
      id
      url
      status
    }
    userErrors {
      field
      message
    }
  }
}"#;

/// Status query for the current operation of `kind`
pub fn current_bulk_operation(kind: BulkKind) -> String {
    format!(
        r#"query {{
  currentBulkOperation(type: {}) {{
    id
    status
    errorCode
    createdAt
    completedAt
    objectCount
    fileSize
    url
    partialDataUrl
  }}
}}"#,
        kind.as_str()
    )
}

/// Collapse whitespace runs to single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
