//! The submission flow: validate, classify, commit.

use crate::{
  classify::{self, Classifier},
  issue::{Issue, NewIssue},
  store::IssueStore,
  user::Actor,
};

/// Submit `draft` on behalf of `actor`, letting `classifier` decide its
/// category and severity.
///
/// Validation runs first so that invalid drafts never reach the classifier.
/// Classifier failures are absorbed by [`classify::assess`]; once a draft is
/// valid, only the store itself can make this fail.
pub async fn submit_classified<S, C>(
  store: &S,
  classifier: &C,
  actor: &Actor,
  mut draft: NewIssue,
) -> Result<Issue, S::Error>
where
  S: IssueStore,
  C: Classifier,
{
  draft.validate()?;

  let assessment = classify::assess(classifier, &draft.title, &draft.description).await;
  tracing::debug!(
    category = %assessment.category,
    severity = %assessment.severity,
    category_source = ?assessment.category_source,
    severity_source = ?assessment.severity_source,
    "submission assessed"
  );
  draft.category = assessment.category;
  draft.severity = assessment.severity;

  store.submit(actor, draft).await
}
