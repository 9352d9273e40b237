#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MgitError {
    #[error("git is required but was not found in PATH")]
    GitNotFound,

    #[error("'{0}' is not a git repository (no .git entry)")]
    NotAGitRepo(PathBuf),

    #[error("repository already registered: {0}")]
    AlreadyRegistered(PathBuf),

    #[error("no registered repository matches '{0}'")]
    RepoNotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },

    #[error("{0}")]
    Other(String),
}
