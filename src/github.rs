use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Debug, Deserialize, Clone)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    pub user: CommentUser,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommentUser {
    pub login: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PullRequestCommit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommitDetail {
    pub message: String,
}

/// Conclusion reported to GitHub when a check run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckConclusion {
    Success,
    Failure,
}

impl CheckConclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckConclusion::Success => "success",
            CheckConclusion::Failure => "failure",
        }
    }
}

impl fmt::Display for CheckConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The GitHub operations the event pipeline needs.
///
/// Checks and the comment reconciler go through this trait so the
/// pipeline can be exercised against an in-memory double in tests.
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// List the pull request's commits in order.
    async fn list_commits(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestCommit>>;

    /// List the pull request's issue comments in order.
    async fn list_comments(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Comment>>;

    async fn create_comment(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<Comment>;

    async fn update_comment(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment>;

    /// Create a check run in the in-progress state, returning its id.
    async fn create_check_run(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        name: &str,
        head_sha: &str,
    ) -> Result<u64>;

    /// Complete a previously created check run with a conclusion and output text.
    async fn complete_check_run(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        check_run_id: u64,
        conclusion: CheckConclusion,
        title: &str,
        summary: &str,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    app_id: u64,
    private_key: String,
    token_cache: Arc<RwLock<HashMap<u64, (String, SystemTime)>>>,
}

#[derive(Debug, Serialize)]
struct GitHubAppClaims {
    iss: u64,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    token: String,
    expires_at: String,
}

#[derive(Debug, Serialize)]
struct CreateCommentRequest {
    body: String,
}

#[derive(Debug, Serialize)]
struct UpdateCommentRequest {
    body: String,
}

#[derive(Debug, Serialize)]
struct CreateCheckRunRequest {
    name: String,
    head_sha: String,
    status: &'static str,
    started_at: String,
}

#[derive(Debug, Serialize)]
struct CompleteCheckRunRequest {
    status: &'static str,
    conclusion: &'static str,
    completed_at: String,
    output: CheckRunOutputBody,
}

#[derive(Debug, Serialize)]
struct CheckRunOutputBody {
    title: String,
    summary: String,
}

#[derive(Debug, Deserialize)]
struct CheckRunResponse {
    id: u64,
}

impl GitHubClient {
    pub fn new(app_id: u64, private_key: String) -> Self {
        let client = Client::builder()
            .user_agent(concat!("prwarden/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            app_id,
            private_key,
            token_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn generate_jwt(&self) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("Failed to get current time")?
            .as_secs();

        let claims = GitHubAppClaims {
            iss: self.app_id,
            iat: now - 60,  // Issued 60 seconds ago to account for clock skew
            exp: now + 600, // Expires in 10 minutes
        };

        let header = Header::new(Algorithm::RS256);
        let encoding_key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .context("Failed to parse private key")?;

        encode(&header, &claims, &encoding_key).context("Failed to encode JWT")
    }

    async fn get_installation_token(&self, installation_id: u64) -> Result<String> {
        // Reuse a cached token while it has more than 5 minutes left
        {
            let cache = self.token_cache.read().await;
            if let Some((token, expires_at)) = cache.get(&installation_id) {
                if expires_at
                    .duration_since(SystemTime::now())
                    .unwrap_or_default()
                    .as_secs()
                    > 300
                {
                    return Ok(token.clone());
                }
            }
        }

        let jwt = self.generate_jwt()?;
        let url = format!(
            "https://api.github.com/app/installations/{}/access_tokens",
            installation_id
        );

        info!("Requesting new installation access token");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", jwt))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .context("Failed to send installation token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!(
                "GitHub App token request failed: {} - {}",
                status, error_text
            );
            return Err(anyhow!(
                "GitHub App token request failed: {} - {}",
                status,
                error_text
            ));
        }

        let token_response: InstallationTokenResponse = response
            .json()
            .await
            .context("Failed to parse installation token response")?;

        let expires_at = chrono::DateTime::parse_from_rfc3339(&token_response.expires_at)
            .context("Failed to parse token expiration")?
            .with_timezone(&Utc);

        let expires_at_system =
            UNIX_EPOCH + std::time::Duration::from_secs(expires_at.timestamp() as u64);

        {
            let mut cache = self.token_cache.write().await;
            cache.insert(
                installation_id,
                (token_response.token.clone(), expires_at_system),
            );
        }

        Ok(token_response.token)
    }

    /// Fetch all pages of a JSON list endpoint, 100 entries at a time.
    async fn get_paginated<T: serde::de::DeserializeOwned>(
        &self,
        installation_id: u64,
        base_url: &str,
        what: &str,
    ) -> Result<Vec<T>> {
        let mut all = Vec::new();
        let mut page = 1;
        let per_page = 100;

        loop {
            let url = format!("{}?page={}&per_page={}", base_url, page, per_page);

            let token = self.get_installation_token(installation_id).await?;
            let response = self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", token))
                .header("Accept", "application/vnd.github.v3+json")
                .send()
                .await
                .with_context(|| format!("Failed to send {} request", what))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                error!(
                    "GitHub API error fetching {}: {} - {}",
                    what, status, error_text
                );
                return Err(anyhow!(
                    "GitHub API error fetching {}: {} - {}",
                    what,
                    status,
                    error_text
                ));
            }

            let entries: Vec<T> = response
                .json()
                .await
                .with_context(|| format!("Failed to parse {} response", what))?;
            let count = entries.len();
            all.extend(entries);

            // A short page means we've reached the end
            if count < per_page {
                break;
            }
            page += 1;
        }

        Ok(all)
    }
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    async fn list_commits(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestCommit>> {
        info!(
            "Fetching commits for PR #{} in {}/{}",
            pr_number, repo_owner, repo_name
        );

        let url = format!(
            "https://api.github.com/repos/{}/{}/pulls/{}/commits",
            repo_owner, repo_name, pr_number
        );
        self.get_paginated(installation_id, &url, "PR commits")
            .await
    }

    async fn list_comments(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Comment>> {
        info!(
            "Fetching comments for PR #{} in {}/{}",
            pr_number, repo_owner, repo_name
        );

        let url = format!(
            "https://api.github.com/repos/{}/{}/issues/{}/comments",
            repo_owner, repo_name, pr_number
        );
        self.get_paginated(installation_id, &url, "PR comments")
            .await
    }

    async fn create_comment(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<Comment> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/issues/{}/comments",
            repo_owner, repo_name, pr_number
        );

        info!(
            "Posting comment to PR #{} in {}/{}",
            pr_number, repo_owner, repo_name
        );

        let token = self.get_installation_token(installation_id).await?;
        let request_body = CreateCommentRequest {
            body: body.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(&request_body)?)
            .send()
            .await
            .context("Failed to send PR comment request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!(
                "GitHub API error creating comment: {} - {}",
                status, error_text
            );
            return Err(anyhow!(
                "GitHub API error creating comment: {} - {}",
                status,
                error_text
            ));
        }

        let comment: Comment = response
            .json()
            .await
            .context("Failed to parse comment response")?;
        info!("Successfully posted comment with ID: {}", comment.id);

        Ok(comment)
    }

    async fn update_comment(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/issues/comments/{}",
            repo_owner, repo_name, comment_id
        );

        info!(
            "Updating comment {} in {}/{}",
            comment_id, repo_owner, repo_name
        );

        let token = self.get_installation_token(installation_id).await?;
        let request_body = UpdateCommentRequest {
            body: body.to_string(),
        };

        let response = self
            .client
            .patch(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(&request_body)?)
            .send()
            .await
            .context("Failed to send update comment request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!(
                "GitHub API error updating comment: {} - {}",
                status, error_text
            );
            return Err(anyhow!(
                "GitHub API error updating comment: {} - {}",
                status,
                error_text
            ));
        }

        let comment: Comment = response
            .json()
            .await
            .context("Failed to parse updated comment response")?;
        info!("Successfully updated comment with ID: {}", comment.id);

        Ok(comment)
    }

    async fn create_check_run(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        name: &str,
        head_sha: &str,
    ) -> Result<u64> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/check-runs",
            repo_owner, repo_name
        );

        info!(
            "Creating check run '{}' for {} in {}/{}",
            name, head_sha, repo_owner, repo_name
        );

        let token = self.get_installation_token(installation_id).await?;
        let request_body = CreateCheckRunRequest {
            name: name.to_string(),
            head_sha: head_sha.to_string(),
            status: "in_progress",
            started_at: Utc::now().to_rfc3339(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(&request_body)?)
            .send()
            .await
            .context("Failed to send create check run request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!(
                "GitHub API error creating check run: {} - {}",
                status, error_text
            );
            return Err(anyhow!(
                "GitHub API error creating check run: {} - {}",
                status,
                error_text
            ));
        }

        let check_run: CheckRunResponse = response
            .json()
            .await
            .context("Failed to parse check run response")?;
        info!("Successfully created check run with ID: {}", check_run.id);

        Ok(check_run.id)
    }

    async fn complete_check_run(
        &self,
        installation_id: u64,
        repo_owner: &str,
        repo_name: &str,
        check_run_id: u64,
        conclusion: CheckConclusion,
        title: &str,
        summary: &str,
    ) -> Result<()> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/check-runs/{}",
            repo_owner, repo_name, check_run_id
        );

        info!(
            "Completing check run {} in {}/{} with conclusion '{}'",
            check_run_id, repo_owner, repo_name, conclusion
        );

        let token = self.get_installation_token(installation_id).await?;
        let request_body = CompleteCheckRunRequest {
            status: "completed",
            conclusion: conclusion.as_str(),
            completed_at: Utc::now().to_rfc3339(),
            output: CheckRunOutputBody {
                title: title.to_string(),
                summary: summary.to_string(),
            },
        };

        let response = self
            .client
            .patch(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(&request_body)?)
            .send()
            .await
            .context("Failed to send complete check run request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!(
                "GitHub API error completing check run: {} - {}",
                status, error_text
            );
            return Err(anyhow!(
                "GitHub API error completing check run: {} - {}",
                status,
                error_text
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_conclusion_as_str() {
        assert_eq!(CheckConclusion::Success.as_str(), "success");
        assert_eq!(CheckConclusion::Failure.as_str(), "failure");
    }

    #[test]
    fn test_commit_deserialization() {
        let payload = json!([
            {
                "sha": "abc123",
                "commit": {
                    "message": "DBZ-100 fix a bug",
                    "author": { "name": "someone" }
                }
            }
        ]);

        let commits: Vec<PullRequestCommit> = serde_json::from_value(payload).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "abc123");
        assert_eq!(commits[0].commit.message, "DBZ-100 fix a bug");
    }

    #[test]
    fn test_create_check_run_request_serialization() {
        let request = CreateCheckRunRequest {
            name: "JIRA".to_string(),
            head_sha: "abc123".to_string(),
            status: "in_progress",
            started_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["name"], "JIRA");
        assert_eq!(value["head_sha"], "abc123");
        assert_eq!(value["status"], "in_progress");
    }
}
