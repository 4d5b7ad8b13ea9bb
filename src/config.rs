use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::env;

#[derive(Clone)]
pub struct Config {
    pub github_app_id: u64,
    pub github_private_key: String,
    pub github_webhook_secret: String,
    pub port: u16,
    /// When set, no GitHub mutation occurs; intended changes are logged instead.
    pub dry_run: bool,
    /// Base issue-tracker URL; the issue key is appended to form a link.
    pub jira_url: String,
    /// Substring used to recognise the bot's own comments by author login.
    pub bot_user_name: String,
    pub issue_key_pattern: Regex,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let github_app_id = env::var("GITHUB_APP_ID")
            .context("GITHUB_APP_ID environment variable is required")?
            .parse::<u64>()
            .context("GITHUB_APP_ID must be a valid number")?;

        let github_private_key = env::var("GITHUB_PRIVATE_KEY")
            .context("GITHUB_PRIVATE_KEY environment variable is required")?
            .replace("\\n", "\n");

        let github_webhook_secret = env::var("GITHUB_WEBHOOK_SECRET")
            .context("GITHUB_WEBHOOK_SECRET environment variable is required")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let dry_run = env::var("DRY_RUN")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let jira_url =
            env::var("JIRA_URL").context("JIRA_URL environment variable is required")?;

        let bot_user_name =
            env::var("BOT_USER_NAME").context("BOT_USER_NAME environment variable is required")?;

        let issue_key_pattern = compile_issue_key_pattern(
            &env::var("ISSUE_KEY_PATTERN")
                .context("ISSUE_KEY_PATTERN environment variable is required")?,
        )?;

        Ok(Config {
            github_app_id,
            github_private_key,
            github_webhook_secret,
            port,
            dry_run,
            jira_url,
            bot_user_name,
            issue_key_pattern,
        })
    }
}

/// Compile the issue-key pattern the way commit messages are matched:
/// case-insensitively, with `.` also matching newlines.
///
/// An invalid pattern is a startup failure; it never reaches event handling.
pub fn compile_issue_key_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .with_context(|| format!("ISSUE_KEY_PATTERN is not a valid regex: {}", pattern))
}
