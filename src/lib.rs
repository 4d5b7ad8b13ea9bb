pub mod check;
pub mod checks;
pub mod comment;
pub mod config;
pub mod github;
pub mod handler;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use config::Config;
use github::GitHubClient;

pub struct AppState {
    pub config: Config,
    pub github: Arc<GitHubClient>,
}
