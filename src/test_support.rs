//! In-memory stand-ins for the GitHub collaborator, so the event
//! pipeline can be exercised without any network.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::config::{compile_issue_key_pattern, Config};
use crate::github::{
    CheckConclusion, Comment, CommentUser, CommitDetail, PullRequestApi, PullRequestCommit,
};
use crate::webhook::{PullRequest, PullRequestRef, RefRepository, Repository, User};

pub fn test_config(dry_run: bool) -> Config {
    Config {
        github_app_id: 1,
        github_private_key: "irrelevant".to_string(),
        github_webhook_secret: "topsecret".to_string(),
        port: 0,
        dry_run,
        jira_url: "https://issues.example.org/browse/".to_string(),
        bot_user_name: "prwarden".to_string(),
        issue_key_pattern: compile_issue_key_pattern(r"DBZ-\d+").unwrap(),
    }
}

pub fn test_repository() -> Repository {
    Repository {
        id: 100,
        name: "test-repo".to_string(),
        full_name: "octo/test-repo".to_string(),
        owner: User {
            id: 1,
            login: "octo".to_string(),
        },
    }
}

pub fn test_pull_request(title: Option<&str>, body: Option<&str>) -> PullRequest {
    PullRequest {
        number: 7,
        title: title.map(str::to_string),
        body: body.map(str::to_string),
        state: "open".to_string(),
        head: PullRequestRef {
            sha: "abc123".to_string(),
            ref_name: "feature".to_string(),
            repo: Some(RefRepository { id: 100 }),
        },
        base: PullRequestRef {
            sha: "def456".to_string(),
            ref_name: "main".to_string(),
            repo: Some(RefRepository { id: 100 }),
        },
    }
}

pub fn test_context(
    dry_run: bool,
    title: Option<&str>,
    body: Option<&str>,
) -> (Config, Repository, PullRequest) {
    (
        test_config(dry_run),
        test_repository(),
        test_pull_request(title, body),
    )
}

#[derive(Debug)]
pub struct CompletedCheckRun {
    pub conclusion: CheckConclusion,
    pub title: String,
    pub summary: String,
}

#[derive(Debug)]
pub struct RecordedCheckRun {
    pub id: u64,
    pub name: String,
    pub head_sha: String,
    pub completed: Option<CompletedCheckRun>,
}

/// Records every mutation; listing failures can be injected to test
/// error propagation.
pub struct FakeApi {
    pub commits: Vec<PullRequestCommit>,
    pub comments: Mutex<Vec<Comment>>,
    pub check_runs: Mutex<Vec<RecordedCheckRun>>,
    pub fail_listing_commits: bool,
    next_comment_id: AtomicU64,
    next_check_run_id: AtomicU64,
}

impl FakeApi {
    pub fn new() -> Self {
        FakeApi {
            commits: Vec::new(),
            comments: Mutex::new(Vec::new()),
            check_runs: Mutex::new(Vec::new()),
            fail_listing_commits: false,
            next_comment_id: AtomicU64::new(1),
            next_check_run_id: AtomicU64::new(1000),
        }
    }

    /// A fake whose pull request has one commit per message, with
    /// generated shas c0, c1, ...
    pub fn with_commits(messages: &[&str]) -> Self {
        let mut api = FakeApi::new();
        api.commits = messages
            .iter()
            .enumerate()
            .map(|(i, message)| PullRequestCommit {
                sha: format!("c{}", i),
                commit: CommitDetail {
                    message: message.to_string(),
                },
            })
            .collect();
        api
    }
}

#[async_trait]
impl PullRequestApi for FakeApi {
    async fn list_commits(
        &self,
        _installation_id: u64,
        _repo_owner: &str,
        _repo_name: &str,
        _pr_number: u64,
    ) -> Result<Vec<PullRequestCommit>> {
        if self.fail_listing_commits {
            return Err(anyhow!("simulated commit listing failure"));
        }
        Ok(self.commits.clone())
    }

    async fn list_comments(
        &self,
        _installation_id: u64,
        _repo_owner: &str,
        _repo_name: &str,
        _pr_number: u64,
    ) -> Result<Vec<Comment>> {
        Ok(self.comments.lock().await.clone())
    }

    async fn create_comment(
        &self,
        _installation_id: u64,
        _repo_owner: &str,
        _repo_name: &str,
        _pr_number: u64,
        body: &str,
    ) -> Result<Comment> {
        let comment = Comment {
            id: self.next_comment_id.fetch_add(1, Ordering::SeqCst),
            body: body.to_string(),
            user: CommentUser {
                login: "prwarden[bot]".to_string(),
            },
        };
        self.comments.lock().await.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(
        &self,
        _installation_id: u64,
        _repo_owner: &str,
        _repo_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment> {
        let mut comments = self.comments.lock().await;
        let comment = comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| anyhow!("no comment with id {}", comment_id))?;
        comment.body = body.to_string();
        Ok(comment.clone())
    }

    async fn create_check_run(
        &self,
        _installation_id: u64,
        _repo_owner: &str,
        _repo_name: &str,
        name: &str,
        head_sha: &str,
    ) -> Result<u64> {
        let id = self.next_check_run_id.fetch_add(1, Ordering::SeqCst);
        self.check_runs.lock().await.push(RecordedCheckRun {
            id,
            name: name.to_string(),
            head_sha: head_sha.to_string(),
            completed: None,
        });
        Ok(id)
    }

    async fn complete_check_run(
        &self,
        _installation_id: u64,
        _repo_owner: &str,
        _repo_name: &str,
        check_run_id: u64,
        conclusion: CheckConclusion,
        title: &str,
        summary: &str,
    ) -> Result<()> {
        let mut check_runs = self.check_runs.lock().await;
        let check_run = check_runs
            .iter_mut()
            .find(|run| run.id == check_run_id)
            .ok_or_else(|| anyhow!("no check run with id {}", check_run_id))?;
        check_run.completed = Some(CompletedCheckRun {
            conclusion,
            title: title.to_string(),
            summary: summary.to_string(),
        });
        Ok(())
    }
}
