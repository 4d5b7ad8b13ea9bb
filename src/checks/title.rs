use anyhow::Result;
use async_trait::async_trait;

use crate::check::{Check, CheckContext, CheckOutput};

const TWO_WORD_RULE: &str = "The pull request title should contain at least 2 words";
const NO_ELLIPSIS_RULE: &str = "The pull request title should not end with an ellipsis";

/// Validates the shape of the pull request title: at least two words,
/// and no trailing ellipsis.
pub struct TitleCheck;

#[async_trait]
impl Check for TitleCheck {
    fn name(&self) -> &str {
        "Pull Request Title"
    }

    async fn run(&self, context: &CheckContext<'_>, output: &mut CheckOutput) -> Result<()> {
        let title = context.pull_request.title.as_deref();
        output
            .rule(TWO_WORD_RULE)
            .result(title.map_or(false, |t| t.split_whitespace().count() >= 2));
        output
            .rule(NO_ELLIPSIS_RULE)
            .result(title.map_or(false, |t| !t.ends_with("...")));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckContext;
    use crate::test_support::{test_context, FakeApi};

    async fn run_with_title(title: Option<&str>) -> CheckOutput {
        let api = FakeApi::new();
        let (config, repository, pull_request) = test_context(false, title, None);
        let context = CheckContext {
            config: &config,
            api: &api,
            installation_id: 1,
            repository: &repository,
            pull_request: &pull_request,
        };
        let mut output = CheckOutput::new(1, "Pull Request Title");
        TitleCheck.run(&context, &mut output).await.unwrap();
        output
    }

    #[tokio::test]
    async fn test_single_word_title_fails_word_rule() {
        let output = run_with_title(Some("Fix")).await;
        assert!(!output.passed());
        assert_eq!(output.title(), TWO_WORD_RULE);
    }

    #[tokio::test]
    async fn test_trailing_ellipsis_fails() {
        let output = run_with_title(Some("Fix the thing...")).await;
        assert!(!output.passed());
        assert_eq!(output.title(), NO_ELLIPSIS_RULE);
    }

    #[tokio::test]
    async fn test_valid_title_passes_both_rules() {
        let output = run_with_title(Some("Fix the thing")).await;
        assert!(output.passed());
    }

    #[tokio::test]
    async fn test_missing_title_fails_both_rules() {
        let output = run_with_title(None).await;
        assert!(!output.passed());
        assert_eq!(output.title(), "2 rules failed");
    }

    #[tokio::test]
    async fn test_whitespace_runs_count_as_single_separator() {
        let output = run_with_title(Some("  Fix   the   thing  ")).await;
        assert!(output.passed());
    }
}
