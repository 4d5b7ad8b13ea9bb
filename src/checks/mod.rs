//! The checks the bot applies to every pull request event.

mod jira;
mod title;

pub use jira::JiraIssueCheck;
pub use title::TitleCheck;

use crate::check::Check;
use crate::config::Config;

/// All registered checks; they execute in this order.
pub fn all_checks(config: &Config) -> Vec<Box<dyn Check>> {
    vec![Box::new(JiraIssueCheck::new(config)), Box::new(TitleCheck)]
}
