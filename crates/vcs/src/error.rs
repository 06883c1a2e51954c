use std::path::Path;
use thiserror::Error;

/// Errors that can occur while extracting patches
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("{0} executable not found or not runnable")]
    ToolNotFound(String),

    #[error("`{command}` failed: {message}")]
    ExternalTool { command: String, message: String },

    #[error("Unparseable output from `{command}`: {reason}")]
    UnparseableOutput { command: String, reason: String },

    #[error("Cannot normalize path {path}: {reason}")]
    PathNormalization { path: String, reason: String },

    #[error("{0}: no such file, but status reports it as added")]
    MissingFile(String),

    #[error("{0}: binary content cannot be diffed")]
    BinaryFile(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl VcsError {
    /// Create a RepositoryNotFound error from a path
    pub fn repo_not_found(path: &Path) -> Self {
        Self::RepositoryNotFound(path.display().to_string())
    }

    pub fn external_tool(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn unparseable(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnparseableOutput {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn path_normalization(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathNormalization {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for failures of the external VCS binary itself
    pub fn is_external_tool(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound(_) | Self::ExternalTool { .. } | Self::UnparseableOutput { .. }
        )
    }

    /// Message suitable for showing to the person running the tool.
    ///
    /// Known VCS failure messages are translated into actionable hints; all
    /// other errors fall back to their `Display` text.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        let lower = message.to_ascii_lowercase();

        if lower.contains("not a git repository") {
            "This command can only be run in a git repository.".to_string()
        } else if lower.contains("connect to server failed") {
            "Unable to reach the Perforce server. Check P4PORT and your network connection."
                .to_string()
        } else if lower.contains("perforce password (p4passwd) invalid or unset")
            || lower.contains("your session has expired")
        {
            "Your Perforce session is not valid. Please run `p4 login`.".to_string()
        } else if lower.contains("client '") && lower.contains("unknown") {
            "The Perforce client workspace is unknown. Check P4CLIENT or the `client` setting."
                .to_string()
        } else {
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_tool_category() {
        assert!(VcsError::ToolNotFound("p4".into()).is_external_tool());
        assert!(VcsError::external_tool("git status", "boom").is_external_tool());
        assert!(VcsError::unparseable("p4 where", "empty").is_external_tool());
        assert!(!VcsError::MissingFile("a.txt".into()).is_external_tool());
    }

    #[test]
    fn test_user_message_for_git() {
        let err = VcsError::external_tool(
            "git status",
            "fatal: not a git repository (or any of the parent directories): .git",
        );
        assert_eq!(
            err.user_message(),
            "This command can only be run in a git repository."
        );
    }

    #[test]
    fn test_user_message_for_p4_login() {
        let err = VcsError::external_tool(
            "p4 -ztag status",
            "Perforce password (P4PASSWD) invalid or unset.",
        );
        assert!(err.user_message().contains("p4 login"));
    }

    #[test]
    fn test_user_message_falls_back_to_display() {
        let err = VcsError::MissingFile("/ws/new.txt".into());
        assert_eq!(err.user_message(), err.to_string());
    }
}
