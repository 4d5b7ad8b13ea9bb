//! Rule accumulation and rendering for a single check execution.
//!
//! A check appends [`CheckRule`] entries to a [`CheckOutput`] as it runs.
//! Once the check returns, the output is treated as immutable: the overall
//! verdict, title, and both rendered forms are pure functions of the
//! accumulated rules.

/// One rule outcome shown in the pull request comment: a description,
/// optional explanatory comments and icon, and whether the rule passed.
#[derive(Debug)]
pub struct CheckRule {
    description: String,
    comments: Vec<String>,
    passed: bool,
    always_included: bool,
    icon: Option<String>,
}

impl CheckRule {
    fn new(description: impl Into<String>) -> Self {
        CheckRule {
            description: description.into(),
            comments: Vec::new(),
            passed: false,
            always_included: false,
            icon: None,
        }
    }

    /// Override the icon shown for this rule.
    pub fn icon(&mut self, icon: &str) {
        self.icon = Some(icon.to_string());
    }

    /// Include this rule in the output even when only failures are shown.
    pub fn always(&mut self) {
        self.always_included = true;
    }

    /// Mark the rule as passed or failed without any comments.
    pub fn result(&mut self, passed: bool) {
        self.passed = passed;
    }

    /// Mark the rule as passed, dropping any comments gathered so far.
    pub fn passed(&mut self) {
        self.passed = true;
        self.comments.clear();
    }

    /// Mark the rule as passed with one comment line per entry.
    pub fn passed_with<I>(&mut self, comments: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.passed = true;
        self.comments.extend(comments.into_iter().map(Into::into));
    }

    /// Mark the rule as failed with one comment line per entry.
    pub fn failed_with<I>(&mut self, comments: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.passed = false;
        self.comments.extend(comments.into_iter().map(Into::into));
    }
}

/// The accumulated outcome of one check's execution against one pull request.
#[derive(Debug)]
pub struct CheckOutput {
    /// Identifier of the external check run this output belongs to.
    pub id: u64,
    pub name: String,
    rules: Vec<CheckRule>,
}

impl CheckOutput {
    pub(crate) fn new(id: u64, name: impl Into<String>) -> Self {
        CheckOutput {
            id,
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Append a fresh rule with the given description and return it for
    /// the check to fill in.
    pub fn rule(&mut self, description: impl Into<String>) -> &mut CheckRule {
        let index = self.rules.len();
        self.rules.push(CheckRule::new(description));
        &mut self.rules[index]
    }

    /// Whether every rule passed; a single failure fails the whole check.
    /// An output with no rules passes.
    pub fn passed(&self) -> bool {
        self.rules.iter().all(|rule| rule.passed)
    }

    /// Title summarising the outcome: "All rules passed", the single
    /// failing rule's description, or the number of failing rules.
    pub fn title(&self) -> String {
        let failing: Vec<&CheckRule> = self.rules.iter().filter(|rule| !rule.passed).collect();
        match failing.len() {
            0 => "All rules passed".to_string(),
            1 => failing[0].description.clone(),
            n => format!("{} rules failed", n),
        }
    }

    /// Render every rule, passed or not.
    pub fn contents(&self) -> String {
        let mut out = String::new();
        self.append_rules(&mut out, true);
        out
    }

    /// Append failing rules to `out`, plus any passed rule that flagged
    /// itself as always included.
    pub fn append_failing_rules(&self, out: &mut String) {
        self.append_rules(out, false);
    }

    fn append_rules(&self, out: &mut String, include_passed: bool) {
        for rule in &self.rules {
            if rule.passed && !include_passed && !rule.always_included {
                continue;
            }

            // Prefer the rule's own icon over the pass/fail defaults
            let icon = match &rule.icon {
                Some(icon) => icon.as_str(),
                None => {
                    if rule.passed {
                        "\u{2714}"
                    } else {
                        "\u{274c}"
                    }
                }
            };

            out.push('\n');
            out.push_str(icon);
            out.push('\u{a0}');
            out.push_str(&rule.description);

            // Each comment goes on its own indented connector line
            for comment in &rule.comments {
                out.push_str("\n\u{a0}\u{a0}\u{a0}\u{a0}\u{21b3}\u{a0}");
                out.push_str(comment);
            }
        }
    }
}
