use thiserror::Error;

use crate::service::LifecycleState;

#[derive(Debug, Error)]
pub enum Error {
    /// Content is not a well-formed sequence of console elements.
    #[error("invalid console message: {message}")]
    Validation { message: String },

    #[error("unsupported console event type `{event_type}`")]
    UnsupportedEvent { event_type: String },

    #[error("unsupported console target `{target}`")]
    UnsupportedTarget { target: String },

    #[error("console service unavailable: foreground task has exited")]
    ServiceUnavailable,

    #[error("console failed to start: {message}")]
    Startup { message: String },

    #[error("unknown console api `{api}`")]
    UnknownApi { api: String },

    #[error("{kind} `{key}` registered twice")]
    DuplicateRegistration { kind: &'static str, key: String },

    #[error("invalid lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn startup(message: impl std::fmt::Display) -> Self {
        Self::Startup {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unsupported_target(target: impl std::fmt::Display) -> Self {
        Self::UnsupportedTarget {
            target: target.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
