//! The check framework: a check is a named unit of pull request policy
//! logic that records zero or more rule outcomes into a [`CheckOutput`].
//!
//! Checks are stateless across events; anything they compute lives for a
//! single invocation. Each registered check is executed through
//! [`run_check`], which mirrors its progress to a GitHub check run.

pub mod output;
pub mod run;

pub use output::{CheckOutput, CheckRule};
pub use run::run_check;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::github::{Comment, PullRequestApi, PullRequestCommit};
use crate::webhook::{PullRequest, Repository};

/// Everything a check may consult while it runs: the immutable process
/// configuration, the GitHub collaborator, and the event's view of the
/// pull request.
pub struct CheckContext<'a> {
    pub config: &'a Config,
    pub api: &'a dyn PullRequestApi,
    pub installation_id: u64,
    pub repository: &'a Repository,
    pub pull_request: &'a PullRequest,
}

impl CheckContext<'_> {
    pub async fn list_commits(&self) -> Result<Vec<PullRequestCommit>> {
        self.api
            .list_commits(
                self.installation_id,
                &self.repository.owner.login,
                &self.repository.name,
                self.pull_request.number,
            )
            .await
    }

    pub async fn list_comments(&self) -> Result<Vec<Comment>> {
        self.api
            .list_comments(
                self.installation_id,
                &self.repository.owner.login,
                &self.repository.name,
                self.pull_request.number,
            )
            .await
    }
}

/// A named unit of pull request policy logic.
///
/// `run` appends any number of rules to `output`. It fails only when a
/// collaborator could not supply data it needs (commits, comments); such
/// a failure aborts the whole event.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, context: &CheckContext<'_>, output: &mut CheckOutput) -> Result<()>;
}
