use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, RunCostError};

const TOKEN_PATTERN: &str = r"^(gh[pousr]_[A-Za-z0-9]{36}|github_pat_[A-Za-z0-9_]{82})$";
const REPO_PATTERN: &str = r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$";
const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '<', '>', '(', ')', '{', '}', '\\', '\'', '"', '*', '?', '!',
];

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("token pattern is valid"));
static REPO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(REPO_PATTERN).expect("repo pattern is valid"));

/// Checks a GitHub token against known token shapes and returns it trimmed.
pub fn validate_token(token: Option<&str>) -> Result<String> {
    let token = token.map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(RunCostError::Validation(
            "Invalid GitHub token: token is empty".to_string(),
        ));
    }

    if token
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || SHELL_METACHARACTERS.contains(&c))
    {
        return Err(RunCostError::Validation(
            "GitHub token contains forbidden characters".to_string(),
        ));
    }

    if !TOKEN_RE.is_match(token) {
        return Err(RunCostError::Validation(
            "Invalid GitHub token: unrecognized token format".to_string(),
        ));
    }

    Ok(token.to_string())
}

/// Checks that a repository is a plain `owner/name` pair.
pub fn validate_repo(repo: &str) -> Result<&str> {
    let traversal = repo.split('/').any(|segment| segment == "." || segment == "..");
    if traversal || !REPO_RE.is_match(repo) {
        return Err(RunCostError::Validation(format!(
            "Invalid repo format: '{repo}' (expected owner/repo)"
        )));
    }

    Ok(repo)
}
