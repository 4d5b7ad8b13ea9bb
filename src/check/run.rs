//! Binds one check's execution to its GitHub check run: the run is
//! created in progress, the check populates its output, and the run is
//! completed with a conclusion derived from the output.

use anyhow::Result;
use tracing::info;

use crate::check::{Check, CheckContext, CheckOutput};
use crate::github::CheckConclusion;

/// Stand-in check run id used when dry-run suppresses creation.
const DRY_RUN_CHECK_RUN_ID: u64 = 42;

struct CheckRun<'a> {
    context: &'a CheckContext<'a>,
    check: &'a dyn Check,
    id: u64,
}

impl<'a> CheckRun<'a> {
    async fn create(context: &'a CheckContext<'a>, check: &'a dyn Check) -> Result<CheckRun<'a>> {
        if context.config.dry_run {
            info!(
                "PR #{} - Creating check run '{}' (dry-run)",
                context.pull_request.number,
                check.name()
            );
            return Ok(CheckRun {
                context,
                check,
                id: DRY_RUN_CHECK_RUN_ID,
            });
        }

        let id = context
            .api
            .create_check_run(
                context.installation_id,
                &context.repository.owner.login,
                &context.repository.name,
                check.name(),
                &context.pull_request.head.sha,
            )
            .await?;

        Ok(CheckRun { context, check, id })
    }

    async fn run(self) -> Result<CheckOutput> {
        let mut output = CheckOutput::new(self.id, self.check.name());
        self.check.run(self.context, &mut output).await?;

        let conclusion = if output.passed() {
            CheckConclusion::Success
        } else {
            CheckConclusion::Failure
        };

        if self.context.config.dry_run {
            info!(
                "PR #{} - Check run '{}' concluded '{}' (dry-run)",
                self.context.pull_request.number,
                self.check.name(),
                conclusion
            );
        } else {
            self.context
                .api
                .complete_check_run(
                    self.context.installation_id,
                    &self.context.repository.owner.login,
                    &self.context.repository.name,
                    self.id,
                    conclusion,
                    &output.title(),
                    &output.contents(),
                )
                .await?;
        }

        Ok(output)
    }
}

/// Execute a check against the pull request, mirroring its lifecycle to
/// a GitHub check run (or to the log in dry-run).
pub async fn run_check(context: &CheckContext<'_>, check: &dyn Check) -> Result<CheckOutput> {
    let run = CheckRun::create(context, check).await?;
    run.run().await
}
