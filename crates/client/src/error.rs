//! Error types for the upload client.

/// Step of an upload in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Resolving the local byte source, before any request.
    Prepare,
    /// `POST <base>/objects`. Nothing was transferred.
    Negotiate,
    /// `PUT` to the upload link. The object is not stored.
    Transfer,
    /// `POST` to the verify link. The bytes were sent.
    Verify,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Prepare => "prepare",
            Stage::Negotiate => "negotiate",
            Stage::Transfer => "transfer",
            Stage::Verify => "verify",
        }
    }

    /// Returns true when the object bytes reached the upload link.
    pub fn bytes_transferred(self) -> bool {
        matches!(self, Stage::Verify)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed upload step, ready to show to a user.
///
/// `status` is the HTTP status, or 0 when the failure was not an HTTP
/// response (network, decoding, cancellation, local precondition).
/// `fatal` marks defects in this client's own request construction and is
/// never set by an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ClassifiedError {
    status: u16,
    message: String,
    fatal: bool,
    stage: Stage,
    url: String,
}

impl ClassifiedError {
    pub(crate) fn new(
        stage: Stage,
        url: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            fatal: false,
            stage,
            url: url.into(),
        }
    }

    /// Builds an error for a violated local contract.
    pub fn fatal(stage: Stage, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fatal: true,
            ..Self::new(stage, url, 0, message)
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// URL of the step that failed (or the local path for `Prepare`).
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Errors from constructing a [`TransferClient`](crate::TransferClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("config error: {0}")]
    Config(#[from] lfs_config::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from building an [`ErrorClassifier`](crate::ErrorClassifier) table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("template for status {status} must contain exactly one %s, got {template:?}")]
pub struct TemplateError {
    pub status: u16,
    pub template: String,
}
