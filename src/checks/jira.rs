//! Jira-specific rules for a pull request:
//!
//! - list every issue addressed by the commit history, with links
//! - require every addressed issue to appear in the PR title

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use crate::check::{Check, CheckContext, CheckOutput};
use crate::config::Config;
use crate::webhook::PullRequest;

pub struct JiraIssueCheck {
    issue_key_pattern: Regex,
    jira_url: String,
}

impl JiraIssueCheck {
    pub fn new(config: &Config) -> Self {
        JiraIssueCheck {
            issue_key_pattern: config.issue_key_pattern.clone(),
            jira_url: config.jira_url.clone(),
        }
    }

    fn jira_url(&self, issue_key: &str) -> String {
        format!("{}{}", self.jira_url, issue_key)
    }

    /// Markdown link to the issue followed by the plain URL, so the link
    /// survives contexts that strip Markdown.
    fn jira_link(&self, issue_key: &str) -> String {
        let url = self.jira_url(issue_key);
        format!("[{}]({}) - {}", issue_key, url, url)
    }

    fn issues_addressed(&self, output: &mut CheckOutput, issue_keys: &[String]) {
        let rule = output.rule("Jira issues addressed in this pull request");
        rule.icon(":large_blue_diamond:");
        if issue_keys.is_empty() {
            // Passed, but stays hidden when only failures are rendered
            rule.passed();
        } else {
            rule.passed_with(issue_keys.iter().map(|key| self.jira_link(key)));
            rule.always();
        }
    }

    fn issues_not_mentioned(&self, output: &mut CheckOutput, not_mentioned: &[String]) {
        let rule = output.rule("All issues addressed should be included in PR title");
        if not_mentioned.is_empty() {
            rule.passed();
        } else {
            rule.failed_with(
                not_mentioned
                    .iter()
                    .map(|key| format!("Issue not mentioned: {}", self.jira_link(key))),
            );
        }
    }

    // Disabled: a CI workflow enforces the commit-message prefix today,
    // so this rule is kept but never emitted into the output.
    #[allow(dead_code)]
    fn commit_prefix_rule(output: &mut CheckOutput, commits_without_key: &[String]) {
        let rule = output.rule("All commit messages should start with DBZ-XXXX issue key");
        if commits_without_key.is_empty() {
            rule.passed();
        } else {
            rule.failed_with(
                commits_without_key
                    .iter()
                    .map(|sha| format!("Offending commit {}", sha)),
            );
        }
    }
}

/// The issue keys that the PR text fails to mention, decided per key:
/// a non-null title that lacks the key flags it immediately; otherwise
/// the body is consulted (a null body cannot flag anything).
fn issue_keys_not_mentioned(pull_request: &PullRequest, issue_keys: &[String]) -> Vec<String> {
    let title = pull_request.title.as_deref();
    let body = pull_request.body.as_deref();
    issue_keys
        .iter()
        .filter(|key| {
            if let Some(title) = title {
                if !title.contains(key.as_str()) {
                    return true;
                }
            }
            match body {
                Some(body) => !body.contains(key.as_str()),
                None => false,
            }
        })
        .cloned()
        .collect()
}

#[async_trait]
impl Check for JiraIssueCheck {
    fn name(&self) -> &str {
        "JIRA"
    }

    async fn run(&self, context: &CheckContext<'_>, output: &mut CheckOutput) -> Result<()> {
        // Scan the commit history for issue keys. A key only counts when
        // the message starts with it; other commits feed the disabled
        // commit-prefix rule.
        let mut issue_keys: Vec<String> = Vec::new();
        let mut commits_without_key: Vec<String> = Vec::new();
        for entry in context.list_commits().await? {
            match self.issue_key_pattern.find(&entry.commit.message) {
                Some(found) if found.start() == 0 => {
                    let key = found.as_str().to_string();
                    if !issue_keys.contains(&key) {
                        issue_keys.push(key);
                    }
                }
                _ => {
                    if !commits_without_key.contains(&entry.sha) {
                        commits_without_key.push(entry.sha);
                    }
                }
            }
        }

        self.issues_addressed(output, &issue_keys);
        let not_mentioned = issue_keys_not_mentioned(context.pull_request, &issue_keys);
        self.issues_not_mentioned(output, &not_mentioned);

        Ok(())
    }
}
