//! Typed error hierarchy for the novelsmith orchestrator.
//!
//! Four enums cover the failure classes the engine distinguishes:
//! - `GenerationError`: a backend call failed or returned something unusable
//! - `ValidationError`: a run was started with missing or invalid parameters
//! - `PersistenceError`: saving or loading the project document failed
//! - `OrchestratorError`: conditions that end a run other than a stop request

use std::path::PathBuf;
use thiserror::Error;

/// A generation backend call that produced no usable text.
///
/// Always carries a human-readable reason so the review surface can show it.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Request to {provider} failed: {reason}")]
    Transport { provider: String, reason: String },

    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} returned an invalid response format")]
    InvalidResponse { provider: String },

    #[error("No API key configured for {provider}")]
    MissingApiKey { provider: String },
}

impl GenerationError {
    /// The reason string shown to a reviewer in error mode.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Parameters rejected before a run starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Novel title is required")]
    MissingTitle,

    #[error("Initial concept is required")]
    MissingConcept,

    #[error("No API key set for provider '{provider}'. Set {env_var} or add it to novel.toml")]
    MissingApiKey { provider: String, env_var: String },

    #[error("Unknown length class '{0}'. Valid values: short, medium, long, infinite")]
    UnknownLength(String),

    #[error("Unknown provider '{0}'. Valid values: gemini, deepseek")]
    UnknownProvider(String),
}

/// Failures reading or writing the persisted project document.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to write project document at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read project document at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Project document at {path} is not valid: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize project document: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("No saved project found in {0}")]
    NotFound(PathBuf),
}

/// Conditions that end a run without an explicit stop request.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Review surface disconnected while task '{task}' was awaiting a decision")]
    ReviewChannelClosed { task: String },

    #[error("Another run holds the project lock at {path}")]
    ProjectLocked { path: PathBuf },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_reason_is_human_readable() {
        let err = GenerationError::Api {
            provider: "gemini".into(),
            status: 429,
            message: "Resource has been exhausted".into(),
        };
        let reason = err.reason();
        assert!(reason.contains("gemini"));
        assert!(reason.contains("429"));
        assert!(reason.contains("Resource has been exhausted"));
    }

    #[test]
    fn invalid_response_names_provider() {
        let err = GenerationError::InvalidResponse {
            provider: "deepseek".into(),
        };
        assert_eq!(err.to_string(), "deepseek returned an invalid response format");
    }

    #[test]
    fn validation_error_missing_key_mentions_env_var() {
        let err = ValidationError::MissingApiKey {
            provider: "gemini".into(),
            env_var: "GEMINI_API_KEY".into(),
        };
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn persistence_error_carries_path() {
        let path = PathBuf::from("/novels/.novelsmith/project.json");
        let err = PersistenceError::Read {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        match &err {
            PersistenceError::Read { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected Read"),
        }
    }

    #[test]
    fn orchestrator_error_converts_from_anyhow() {
        let err: OrchestratorError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, OrchestratorError::Other(_)));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&GenerationError::MissingApiKey {
            provider: "gemini".into(),
        });
        assert_std_error(&ValidationError::MissingTitle);
        assert_std_error(&PersistenceError::NotFound(PathBuf::from(".")));
        assert_std_error(&OrchestratorError::ReviewChannelClosed {
            task: "write".into(),
        });
    }
}
