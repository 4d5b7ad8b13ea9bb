//! Keeps the bot's summary comment on a pull request unique: the first
//! existing comment authored by the bot is updated in place, otherwise a
//! new one is created.

use anyhow::Result;
use tracing::info;

use crate::check::CheckContext;

pub async fn reconcile_bot_comment(context: &CheckContext<'_>, body: &str) -> Result<()> {
    let pr_number = context.pull_request.number;
    let existing = find_existing_comment(context).await?;

    if context.config.dry_run {
        info!("PR #{} - Would publish comment:\n{}", pr_number, body);
        return Ok(());
    }

    match existing {
        Some(comment_id) => {
            info!(
                "PR #{} - Updating existing bot comment {}",
                pr_number, comment_id
            );
            context
                .api
                .update_comment(
                    context.installation_id,
                    &context.repository.owner.login,
                    &context.repository.name,
                    comment_id,
                    body,
                )
                .await?;
        }
        None => {
            info!("PR #{} - No bot comment yet, creating one", pr_number);
            context
                .api
                .create_comment(
                    context.installation_id,
                    &context.repository.owner.login,
                    &context.repository.name,
                    pr_number,
                    body,
                )
                .await?;
        }
    }

    Ok(())
}

/// The first comment whose author login contains the configured bot name
/// is considered the bot's comment.
async fn find_existing_comment(context: &CheckContext<'_>) -> Result<Option<u64>> {
    let comments = context.list_comments().await?;
    Ok(comments
        .iter()
        .find(|comment| comment.user.login.contains(&context.config.bot_user_name))
        .map(|comment| comment.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{Comment, CommentUser};
    use crate::test_support::{test_context, FakeApi};

    fn foreign_comment(id: u64, login: &str, body: &str) -> Comment {
        Comment {
            id,
            body: body.to_string(),
            user: CommentUser {
                login: login.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_creates_comment_when_none_exists() {
        let api = FakeApi::new();
        let (config, repository, pull_request) = test_context(false, Some("Fix the thing"), None);
        let context = CheckContext {
            config: &config,
            api: &api,
            installation_id: 1,
            repository: &repository,
            pull_request: &pull_request,
        };

        reconcile_bot_comment(&context, "hello").await.unwrap();

        let comments = api.comments.lock().await;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "hello");
    }

    #[tokio::test]
    async fn test_updates_existing_bot_comment() {
        let api = FakeApi::new();
        api.comments
            .lock()
            .await
            .push(foreign_comment(5, "prwarden[bot]", "old body"));
        let (config, repository, pull_request) = test_context(false, Some("Fix the thing"), None);
        let context = CheckContext {
            config: &config,
            api: &api,
            installation_id: 1,
            repository: &repository,
            pull_request: &pull_request,
        };

        reconcile_bot_comment(&context, "new body").await.unwrap();

        let comments = api.comments.lock().await;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, 5);
        assert_eq!(comments[0].body, "new body");
    }

    #[tokio::test]
    async fn test_ignores_other_users_comments() {
        let api = FakeApi::new();
        api.comments
            .lock()
            .await
            .push(foreign_comment(9, "some-human", "unrelated"));
        let (config, repository, pull_request) = test_context(false, Some("Fix the thing"), None);
        let context = CheckContext {
            config: &config,
            api: &api,
            installation_id: 1,
            repository: &repository,
            pull_request: &pull_request,
        };

        reconcile_bot_comment(&context, "report").await.unwrap();

        let comments = api.comments.lock().await;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].body, "report");
    }

    #[tokio::test]
    async fn test_dry_run_leaves_comments_untouched() {
        let api = FakeApi::new();
        api.comments
            .lock()
            .await
            .push(foreign_comment(5, "prwarden[bot]", "old body"));
        let (config, repository, pull_request) = test_context(true, Some("Fix the thing"), None);
        let context = CheckContext {
            config: &config,
            api: &api,
            installation_id: 1,
            repository: &repository,
            pull_request: &pull_request,
        };

        reconcile_bot_comment(&context, "new body").await.unwrap();

        let comments = api.comments.lock().await;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "old body");
    }
}
