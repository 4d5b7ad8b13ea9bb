//! Drives one pull request event end to end: filter out stale or
//! irrelevant references, execute every registered check, and reconcile
//! the bot's summary comment from the collected outputs.

use anyhow::Result;
use tracing::info;

use crate::check::{run_check, CheckContext, CheckOutput};
use crate::checks::all_checks;
use crate::comment::reconcile_bot_comment;
use crate::config::Config;
use crate::github::PullRequestApi;
use crate::webhook::{PullRequest, Repository};

const COMMENT_INTRO_PASSED: &str = "Thanks for your pull request!\n\n\
    This pull request appears to follow the contribution rules. :+1:\n";
const COMMENT_INTRO_FAILED: &str = "Thanks for your pull request!\n\n\
    This pull request does not follow the contribution rules. Could you please review?\n";
const COMMENT_FOOTER: &str = "\n\n---\n\n:robot: This is an auto-generated message.";

pub async fn process_pull_request(
    config: &Config,
    api: &dyn PullRequestApi,
    installation_id: u64,
    repository: &Repository,
    pull_request: &PullRequest,
) -> Result<()> {
    info!("Event received for pull request {}.", pull_request.number);

    if !should_check(repository, pull_request) {
        info!(
            "PR #{} - Skipping closed or unrelated pull request reference",
            pull_request.number
        );
        return Ok(());
    }

    let context = CheckContext {
        config,
        api,
        installation_id,
        repository,
        pull_request,
    };

    let mut outputs: Vec<CheckOutput> = Vec::new();
    for check in all_checks(config) {
        outputs.push(run_check(&context, check.as_ref()).await?);
    }

    let passed = outputs.iter().all(CheckOutput::passed);

    // Avoid noisy comments if the pull request has been closed meanwhile;
    // the check runs published above still stand.
    if pull_request.is_closed() {
        return Ok(());
    }

    let mut message = String::from(if passed {
        COMMENT_INTRO_PASSED
    } else {
        COMMENT_INTRO_FAILED
    });
    for output in &outputs {
        output.append_failing_rules(&mut message);
    }
    message.push_str(COMMENT_FOOTER);

    reconcile_bot_comment(&context, &message).await
}

/// GitHub sometimes mentions pull requests in a payload that are not
/// related to the delivered event, such as very old pull requests on a
/// branch that just got updated, or pull requests on other repositories.
/// Skip those so we never comment on them.
fn should_check(repository: &Repository, pull_request: &PullRequest) -> bool {
    !pull_request.is_closed()
        && pull_request.base.repo.as_ref().map(|repo| repo.id) == Some(repository.id)
}
