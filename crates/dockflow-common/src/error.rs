use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockflowError {
    #[error("Failed to read input {path}: {reason}")]
    InputRead { path: PathBuf, reason: String },

    #[error("Stage '{stage}' cannot start: input '{role}' not found at {path}")]
    MissingInput {
        stage: String,
        role: String,
        path: PathBuf,
    },

    #[error("Command `{command}` failed (exit code {exit_code:?}): {stderr}")]
    StageExecution {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Command `{command}` timed out after {after:?}")]
    StageTimeout { command: String, after: Duration },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to fetch input '{reference}': {reason}")]
    Fetch { reference: String, reason: String },

    #[error("Upload failed for: {}", .failed_files.join(", "))]
    Upload { failed_files: Vec<String> },

    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

impl DockflowError {
    /// True when the error was caused by the caller's request rather than the pipeline.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, DockflowError::InvalidParameter(_))
    }
}

pub type Result<T> = std::result::Result<T, DockflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_execution_message_carries_stderr() {
        let err = DockflowError::StageExecution {
            command: "vina --ligand l.pdbqt".to_string(),
            exit_code: Some(2),
            stderr: "could not open receptor".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("vina --ligand l.pdbqt"));
        assert!(msg.contains("Some(2)"));
        assert!(msg.contains("could not open receptor"));
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_limits() {
        let err = DockflowError::StageTimeout {
            command: "scrub.py".to_string(),
            after: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "Command `scrub.py` timed out after 90s");

        let err = DockflowError::StageTimeout {
            command: "vina".to_string(),
            after: Duration::from_millis(200),
        };
        assert_eq!(err.to_string(), "Command `vina` timed out after 200ms");
    }

    #[test]
    fn test_only_invalid_parameter_is_caller_error() {
        assert!(DockflowError::InvalidParameter("x".into()).is_caller_error());
        assert!(!DockflowError::Upload { failed_files: vec!["a.pdb".into()] }.is_caller_error());
    }
}
