//! # Errors
//!
//! Failure taxonomy shared by every command handler. Each kind carries a short
//! message that is safe to show in chat and a diagnostic that only goes to the logs.

use thiserror::Error;

/// Failure reported by the platform client (send, edit, role change, ...).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("platform request failed: {0}")]
    Request(String),
    #[error("platform object not found: {0}")]
    NotFound(String),
    #[error("malformed platform identifier: {0}")]
    InvalidId(String),
}

#[derive(Debug, Error)]
pub enum BotError {
    /// User-supplied arguments failed validation.
    #[error("invalid input: {detail}")]
    InvalidInput { message: String, detail: String },

    /// The invoker (or the bot itself) lacks a required capability.
    #[error("permission denied: {detail}")]
    PermissionDenied { message: String, detail: String },

    /// The handler's own logic faulted.
    #[error("command `{command}` failed")]
    ExecutionFailure {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    /// The platform client reported a failure.
    #[error(transparent)]
    RemoteServiceFailure(#[from] PlatformError),

    /// Startup-time configuration problem. Always fatal.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl BotError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::InvalidInput {
            detail: message.clone(),
            message,
        }
    }

    pub fn invalid_input_with(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn execution(command: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::ExecutionFailure {
            command: command.into(),
            source: source.into(),
        }
    }

    /// Message shown to the user in chat.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { message, .. } => format!("⚠️ {message}"),
            Self::PermissionDenied { message, .. } => format!("🚫 {message}"),
            Self::ExecutionFailure { command, .. } => {
                crate::strings::messages::execution_failed(command)
            }
            Self::RemoteServiceFailure(_) => crate::strings::messages::REMOTE_FAILURE.to_string(),
            Self::ConfigurationError(_) => crate::strings::messages::CONFIGURATION_FAILURE.to_string(),
        }
    }

    /// Failures the user caused are routine; everything else deserves a full error chain in the logs.
    pub fn is_unexpected(&self) -> bool {
        !matches!(
            self,
            Self::InvalidInput { .. } | Self::PermissionDenied { .. }
        )
    }

    /// Tags a bare execution failure with the command it escaped from.
    pub fn in_command(self, name: &str) -> Self {
        match self {
            Self::ExecutionFailure { command, source } if command.is_empty() => {
                Self::ExecutionFailure {
                    command: name.to_string(),
                    source,
                }
            }
            other => other,
        }
    }
}

impl From<anyhow::Error> for BotError {
    fn from(source: anyhow::Error) -> Self {
        match source.downcast::<PlatformError>() {
            Ok(platform) => Self::RemoteServiceFailure(platform),
            Err(source) => Self::ExecutionFailure {
                command: String::new(),
                source,
            },
        }
    }
}
