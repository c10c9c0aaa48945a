//! Maps failed steps to user-facing [`ClassifiedError`]s.
//!
//! The status table is an explicit value: build it once (usually the
//! default), wrap it in an `Arc`, and share it with every client.

use std::collections::HashMap;
use std::error::Error as StdError;

use lfs_protocol::ProtocolError;
use lfs_transfer::TransferError;

use crate::error::{ClassifiedError, Stage, TemplateError};

const PLACEHOLDER: &str = "%s";

/// Used when a status has no entry in the table.
const FALLBACK_TEMPLATE: &str = "Invalid status for %s: %d";

/// Status → message template. Each template names the URL once via `%s`.
pub struct ErrorClassifier {
    templates: HashMap<u16, String>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        let auth = "Authorization error: %s\nCheck that you have proper access to the repository";
        let templates = [
            (400, "Client error: %s"),
            (401, auth),
            (403, auth),
            (
                404,
                "Repository or object not found: %s\nCheck that it exists and that you have proper access to it",
            ),
            (422, "Unprocessable entity: %s\nThe server rejected the object metadata"),
            (429, "Rate limit exceeded: %s\nTry again later"),
            (500, "Server error: %s"),
            (503, "Service unavailable: %s\nTry again later"),
        ]
        .into_iter()
        .map(|(status, tpl)| (status, tpl.to_string()))
        .collect();

        Self { templates }
    }
}

impl ErrorClassifier {
    /// Creates a classifier with an empty table; every status uses the fallback.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Adds or replaces the template for `status`.
    pub fn with_template(
        mut self,
        status: u16,
        template: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let template = template.into();
        if template.matches(PLACEHOLDER).count() != 1 {
            return Err(TemplateError { status, template });
        }
        self.templates.insert(status, template);
        Ok(self)
    }

    /// Template registered for `status`, if any.
    pub fn template(&self, status: u16) -> Option<&str> {
        self.templates.get(&status).map(String::as_str)
    }

    /// Message for an unexpected HTTP status at `url`.
    pub fn message_for(&self, status: u16, url: &str) -> String {
        match self.templates.get(&status) {
            Some(tpl) => tpl.replacen(PLACEHOLDER, url, 1),
            None => {
                let message = FALLBACK_TEMPLATE.replacen(PLACEHOLDER, url, 1);
                message.replacen("%d", &status.to_string(), 1)
            }
        }
    }

    /// Classifies an unexpected HTTP status.
    pub fn status_error(&self, stage: Stage, status: u16, url: &str) -> ClassifiedError {
        ClassifiedError::new(stage, url, status, self.message_for(status, url))
    }

    /// Classifies a failure inside the HTTP transport.
    pub fn transport_error(
        &self,
        stage: Stage,
        err: &reqwest::Error,
        url: &str,
    ) -> ClassifiedError {
        if err.is_timeout() {
            return self.timed_out(stage, url);
        }
        let cause = root_cause(err);
        let message = if err.is_connect() {
            format!("Unable to connect to {url}: {cause}")
        } else if err.is_body() || err.is_request() {
            format!("Error sending request to {url}: {cause}")
        } else if err.is_decode() {
            format!("Error reading response from {url}: {cause}")
        } else {
            format!("HTTP error for {url}: {cause}")
        };
        ClassifiedError::new(stage, url, 0, message)
    }

    /// Classifies a step that ran past its deadline or stopped making progress.
    pub fn timed_out(&self, stage: Stage, url: &str) -> ClassifiedError {
        ClassifiedError::new(stage, url, 0, format!("Request to {url} timed out"))
    }

    /// Classifies a structurally invalid object API response.
    pub fn protocol_error(&self, stage: Stage, err: &ProtocolError, url: &str) -> ClassifiedError {
        let message = format!("Invalid response from {url}: {err}");
        ClassifiedError::new(stage, url, 0, message)
    }

    /// Classifies a header the server asked us to send that HTTP cannot carry.
    pub fn invalid_header(&self, stage: Stage, name: &str, url: &str) -> ClassifiedError {
        let message = format!("Invalid header {name:?} in link for {url}");
        ClassifiedError::new(stage, url, 0, message)
    }

    /// Classifies a failure to read the local byte source.
    pub fn source_error(
        &self,
        stage: Stage,
        err: &TransferError,
        location: &str,
    ) -> ClassifiedError {
        let message = format!("Unable to read object from {location}: {err}");
        ClassifiedError::new(stage, location, 0, message)
    }

    /// Classifies an upload abandoned by cancellation.
    pub fn cancelled(&self, stage: Stage, url: &str) -> ClassifiedError {
        let message = format!("Upload cancelled during {stage}: {url}");
        ClassifiedError::new(stage, url, 0, message)
    }
}

impl std::fmt::Debug for ErrorClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut statuses: Vec<_> = self.templates.keys().copied().collect();
        statuses.sort_unstable();
        f.debug_struct("ErrorClassifier")
            .field("statuses", &statuses)
            .finish()
    }
}

/// Innermost error message, which is usually the one worth showing.
fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
